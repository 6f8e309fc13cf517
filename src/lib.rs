// SPDX-License-Identifier: MIT OR Apache-2.0

//! semdex - Semantic document search library
//!
//! Shared modules for the semdex CLI tool: chunked embedding, a SQLite
//! vector store, index loading and cosine top-k search.

pub mod config;
pub mod embedding;
pub mod errors;
pub mod indexer;
pub mod output;
pub mod records;
pub mod search;
pub mod store;
