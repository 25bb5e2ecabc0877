//! Markdown-lite rendering of final answers for the terminal.

use colored::Colorize;

/// Minimal markdown renderer for terminal output.
/// Not a full parser. Handles the patterns small models actually emit:
/// headings, bullets, **bold**, `inline code` and fenced code blocks.
pub fn render_markdown_lite(text: &str) -> String {
    let mut output = String::new();
    let mut in_code_block = false;

    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            if in_code_block {
                in_code_block = false;
                output.push('\n');
            } else {
                in_code_block = true;
                let lang = line.trim_start().trim_start_matches('`');
                if !lang.is_empty() {
                    output.push_str(&format!("  {}\n", lang.dimmed()));
                }
            }
            continue;
        }

        if in_code_block {
            output.push_str(&format!("  {}\n", line.dimmed()));
            continue;
        }

        let trimmed = line.trim_start();
        if trimmed.starts_with('#') {
            let title = trimmed.trim_start_matches('#').trim();
            output.push_str(&render_inline(title).bold().underline().to_string());
        } else if let Some(item) = trimmed
            .strip_prefix("- ")
            .or_else(|| trimmed.strip_prefix("* "))
        {
            let indent = &line[..line.len() - trimmed.len()];
            output.push_str(&format!("{indent}{} {}", "•".cyan(), render_inline(item)));
        } else {
            output.push_str(&render_inline(line));
        }
        output.push('\n');
    }

    if output.ends_with('\n') {
        output.pop();
    }
    output
}

/// Handle **bold** and `inline code` within a single line.
fn render_inline(line: &str) -> String {
    let mut result = String::new();
    let chars: Vec<char> = line.chars().collect();
    let len = chars.len();
    let mut i = 0;

    while i < len {
        if i + 1 < len && chars[i] == '*' && chars[i + 1] == '*' {
            if let Some(end) = find_closing(&chars, i + 2, &['*', '*']) {
                let bold_text: String = chars[i + 2..end].iter().collect();
                result.push_str(&bold_text.bold().to_string());
                i = end + 2;
                continue;
            }
        }

        if chars[i] == '`' {
            if let Some(end) = find_closing(&chars, i + 1, &['`']) {
                let code_text: String = chars[i + 1..end].iter().collect();
                result.push_str(&code_text.yellow().to_string());
                i = end + 1;
                continue;
            }
        }

        result.push(chars[i]);
        i += 1;
    }

    result
}

fn find_closing(chars: &[char], start: usize, pat: &[char]) -> Option<usize> {
    if chars.len() < pat.len() {
        return None;
    }
    (start..=chars.len() - pat.len()).find(|&i| chars[i..i + pat.len()] == *pat)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(text: &str) -> String {
        colored::control::set_override(false);
        render_markdown_lite(text)
    }

    #[test]
    fn strips_markup_when_color_is_off() {
        let out = plain("## Findings\n- **Rust** uses `cargo`\nplain line");
        assert_eq!(out, "Findings\n• Rust uses cargo\nplain line");
    }

    #[test]
    fn code_blocks_are_indented() {
        let out = plain("```rust\nfn main() {}\n```\nafter");
        assert_eq!(out, "  rust\n  fn main() {}\n\nafter");
    }

    #[test]
    fn unclosed_markers_are_left_alone() {
        assert_eq!(plain("a ** b and `c"), "a ** b and `c");
        assert_eq!(plain("*"), "*");
    }
}
