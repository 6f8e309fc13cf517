// SPDX-License-Identifier: MIT OR Apache-2.0

//! Output and color utilities for consistent terminal formatting
//!
//! Provides shared color functions respecting NO_COLOR environment variable,
//! plus the plain-text result block format used for `--output` files.

use colored::Colorize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use crate::search::SearchResult;

/// Check if colors should be used (respects NO_COLOR env var)
pub fn use_colors() -> bool {
    std::env::var("NO_COLOR").is_err()
}

/// Colorize similarity score: green when strong, yellow when weak
pub fn colorize_score(score: f32, use_color: bool) -> String {
    let text = format!("{:.4}", score);
    if !use_color {
        return text;
    }
    if score >= 0.8 {
        text.green().to_string()
    } else {
        text.yellow().to_string()
    }
}

/// Colorize document title (bold)
pub fn colorize_title(text: &str, use_color: bool) -> String {
    if use_color {
        text.bold().to_string()
    } else {
        text.to_string()
    }
}

/// Colorize link (cyan)
pub fn colorize_link(text: &str, use_color: bool) -> String {
    if use_color {
        text.cyan().to_string()
    } else {
        text.to_string()
    }
}

/// Colorize secondary text such as ids and previews (dimmed)
pub fn colorize_dim(text: &str, use_color: bool) -> String {
    if use_color {
        text.dimmed().to_string()
    } else {
        text.to_string()
    }
}

/// First `max_chars` chars of `text` on one line, with an ellipsis when cut.
pub fn preview(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max_chars {
        return flat;
    }
    let mut cut: String = flat.chars().take(max_chars).collect();
    cut.push('…');
    cut
}

/// Renders one result as a `Similarity/Title/Link` block.
pub fn result_block(result: &SearchResult) -> String {
    format!(
        "Similarity: {}\nTitle: {}\nLink: {}\n\n",
        result.score, result.title, result.link
    )
}

/// Appends result blocks to `path`, creating the file if needed.
pub fn append_results(path: &Path, results: &[SearchResult]) -> std::io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    for result in results {
        file.write_all(result_block(result).as_bytes())?;
    }
    file.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn result(title: &str, score: f32) -> SearchResult {
        SearchResult {
            id: "0".to_string(),
            score,
            title: title.to_string(),
            link: format!("https://example.com/#{}", title.to_lowercase()),
            text: String::new(),
        }
    }

    #[test]
    fn block_format() {
        assert_eq!(
            result_block(&result("TextMatcher", 0.75)),
            "Similarity: 0.75\nTitle: TextMatcher\nLink: https://example.com/#textmatcher\n\n"
        );
    }

    #[test]
    fn append_keeps_existing_content() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results.txt");

        append_results(&path, &[result("A", 0.5)]).unwrap();
        append_results(&path, &[result("B", 0.25)]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Similarity: 0.5\nTitle: A\n"));
        assert!(content.contains("Title: B\n"));
        assert_eq!(content.matches("Similarity:").count(), 2);
    }

    #[test]
    fn preview_flattens_and_truncates() {
        assert_eq!(preview("a\n  b", 10), "a b");
        assert_eq!(preview("héllo world", 5), "héllo…");
    }

    #[test]
    fn no_color_is_plain() {
        assert_eq!(colorize_score(0.91234, false), "0.9123");
        assert_eq!(colorize_title("x", false), "x");
    }
}
