//! Terminal formatting for the tree renderer.
//!
//! Colors go through the `colored` crate, which already honors `NO_COLOR`
//! and non-TTY output; `--no-color` flips its global override in `main`.

use crate::model::Status;
use crate::storage::TrackKind;
use colored::Colorize;

/// Tree-drawing glyphs.
pub const TREE_BRANCH: &str = "├──";
pub const TREE_LAST: &str = "└──";
pub const TREE_PIPE: &str = "│  ";
pub const TREE_SPACE: &str = "   ";

const DEFAULT_WIDTH: usize = 80;
const MIN_WIDTH: usize = 40;

/// One-glyph status marker.
#[must_use]
pub const fn status_icon(status: Status) -> &'static str {
    match status {
        Status::Planned => "○",
        Status::InProgress => "●",
        Status::Done => "✓",
        Status::Blocked => "⚠",
        Status::Superseded => "✗",
        Status::OnHold => "⏸",
    }
}

/// Colored `icon status` pair.
#[must_use]
pub fn color_status(status: Status) -> String {
    let label = format!("{} {status}", status_icon(status));
    match status {
        Status::Planned => label.as_str().cyan().to_string(),
        Status::InProgress => label.as_str().yellow().to_string(),
        Status::Done => label.as_str().green().to_string(),
        Status::Blocked => label.as_str().red().to_string(),
        Status::Superseded => label.as_str().dimmed().to_string(),
        Status::OnHold => label.as_str().magenta().to_string(),
    }
}

/// Colored kind label for the `[kind]` prefix.
#[must_use]
pub fn color_kind(kind: TrackKind) -> String {
    match kind {
        TrackKind::Super => kind.as_str().magenta().bold().to_string(),
        TrackKind::Feature => kind.as_str().blue().to_string(),
        TrackKind::Task => kind.as_str().to_string(),
    }
}

/// Effective terminal width for wrapping.
///
/// `COLUMNS` is the portable signal available without a TTY probe; piped
/// output falls back to 80 columns.
#[must_use]
pub fn terminal_width() -> usize {
    std::env::var("COLUMNS")
        .ok()
        .and_then(|columns| columns.parse::<usize>().ok())
        .map_or(DEFAULT_WIDTH, |width| width.max(MIN_WIDTH))
}

/// Wrap text at word boundaries to fit `max_width` columns.
///
/// Whitespace runs are normalized to single spaces; words longer than the
/// width are broken into chunks.
#[must_use]
pub fn wrap_text(text: &str, max_width: usize) -> Vec<String> {
    if max_width == 0 {
        return vec![text.to_string()];
    }

    let words: Vec<&str> = text.split_whitespace().collect();
    let normalized = words.join(" ");
    if normalized.chars().count() <= max_width {
        return vec![normalized];
    }

    let mut lines = Vec::new();
    let mut current = String::new();

    for word in words {
        let word_len = word.chars().count();

        if word_len > max_width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let chars: Vec<char> = word.chars().collect();
            for chunk in chars.chunks(max_width) {
                lines.push(chunk.iter().collect());
            }
            continue;
        }

        if current.is_empty() {
            current = word.to_string();
        } else if current.chars().count() + 1 + word_len <= max_width {
            current.push(' ');
            current.push_str(word);
        } else {
            lines.push(std::mem::take(&mut current));
            current = word.to_string();
        }
    }

    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Options for [`format_label`].
#[derive(Debug, Clone, Default)]
pub struct LabelOptions {
    pub label_width: usize,
    /// Total width available including the label column; 0 disables wrap.
    pub max_width: usize,
    /// Prefix repeated on continuation lines (tree pipes/spaces).
    pub continuation_indent: String,
}

/// Format a dimmed, padded label followed by a wrapped value.
#[must_use]
pub fn format_label(label: &str, value: &str, options: &LabelOptions) -> String {
    let label_width = if options.label_width == 0 { 8 } else { options.label_width };
    let padded = format!("{label:<label_width$}");
    let padded = padded.as_str().dimmed().to_string();

    if options.max_width == 0 {
        return format!("{padded} {value}");
    }

    let available = options.max_width.saturating_sub(label_width + 1);
    if available == 0 {
        return format!("{padded} {value}");
    }

    let lines = wrap_text(value, available);
    if lines.len() == 1 {
        return format!("{padded} {}", lines[0]);
    }

    let continuation_padding = " ".repeat(label_width + 1);
    lines
        .iter()
        .enumerate()
        .map(|(index, line)| {
            if index == 0 {
                format!("{padded} {line}")
            } else {
                format!("{}{continuation_padding}{line}", options.continuation_indent)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_short_text_is_single_line() {
        assert_eq!(wrap_text("hello world", 40), vec!["hello world"]);
    }

    #[test]
    fn test_wrap_normalizes_whitespace() {
        assert_eq!(wrap_text("hello    world", 40), vec!["hello world"]);
    }

    #[test]
    fn test_wrap_breaks_at_word_boundaries() {
        let lines = wrap_text("the quick brown fox jumps over the lazy dog", 15);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line.chars().count() <= 15);
        }
        assert_eq!(
            lines.join(" "),
            "the quick brown fox jumps over the lazy dog"
        );
    }

    #[test]
    fn test_wrap_chunks_overlong_words() {
        let lines = wrap_text("abcdefghijklmnop", 5);
        assert_eq!(lines, vec!["abcde", "fghij", "klmno", "p"]);
    }

    #[test]
    fn test_wrap_empty_text() {
        assert_eq!(wrap_text("", 10), vec![""]);
    }

    #[test]
    fn test_format_label_pads_label() {
        colored::control::set_override(false);
        let options = LabelOptions { label_width: 8, ..LabelOptions::default() };
        assert_eq!(format_label("next:", "ship it", &options), "next:    ship it");
    }

    #[test]
    fn test_format_label_wraps_with_continuation_indent() {
        colored::control::set_override(false);
        let options = LabelOptions {
            label_width: 8,
            max_width: 24,
            continuation_indent: "│  ".to_string(),
        };
        let output = format_label("summary:", "one two three four five six", &options);
        let lines: Vec<&str> = output.lines().collect();
        assert!(lines.len() > 1);
        assert!(lines[0].starts_with("summary: "));
        assert!(lines[1].starts_with("│  "));
    }

    #[test]
    fn test_status_icons_are_distinct() {
        let icons: std::collections::HashSet<&str> = [
            Status::Planned,
            Status::InProgress,
            Status::Done,
            Status::Blocked,
            Status::Superseded,
            Status::OnHold,
        ]
        .into_iter()
        .map(status_icon)
        .collect();
        assert_eq!(icons.len(), 6);
    }
}
