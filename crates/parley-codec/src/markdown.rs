// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Light markdown to inline-HTML conversion and legacy redactor tag cleanup.

/// Converts legacy redactor HTML (`<strong data-...>` / `<em data-...>`)
/// into plain `<b>` / `<i>` tags and strips the wrapping `<p>`.
pub fn normalize_redactor_html(text: &str) -> String {
    let mut out = text
        .replace(
            "<strong data-verified=\"redactor\" data-redactor-tag=\"strong\">",
            "<b>",
        )
        .replace("</strong>", "</b>")
        .replace("<em data-verified=\"redactor\" data-redactor-tag=\"em\">", "<i>")
        .replace("</em>", "</i>")
        .replace("</p>", "");
    if let Some(stripped) = out.strip_prefix("<p>") {
        out = stripped.to_string();
    }
    out.trim_matches(['\u{200B}', ' ', '\r', '\n']).to_string()
}

/// Converts one line of light markdown to inline HTML: `**bold**`,
/// `*italic*`. Applied per line so an unbalanced marker cannot leak tags
/// across lines.
pub fn convert_markdown_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let chars: Vec<char> = line.chars().collect();
    let mut i = 0;
    let mut bold_open = false;
    let mut italic_open = false;
    while i < chars.len() {
        if chars[i] == '*' {
            if chars.get(i + 1) == Some(&'*') {
                i += 1;
                out.push_str(if bold_open { "</b>" } else { "<b>" });
                bold_open = !bold_open;
            } else {
                out.push_str(if italic_open { "</i>" } else { "<i>" });
                italic_open = !italic_open;
            }
        } else {
            out.push(chars[i]);
        }
        i += 1;
    }
    out
}

/// Converts multi-line markdown: each line independently, newlines becoming
/// `<br>`.
pub fn convert_markdown(text: &str) -> String {
    text.lines()
        .map(convert_markdown_line)
        .collect::<Vec<_>>()
        .join("<br>")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bold_and_italic_with_line_break() {
        assert_eq!(
            convert_markdown("**bold** and *italic*\nnext line"),
            "<b>bold</b> and <i>italic</i><br>next line"
        );
    }

    #[test]
    fn unbalanced_marker_does_not_leak_across_lines() {
        let out = convert_markdown("**open\nplain");
        assert_eq!(out, "<b>open<br>plain");
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(convert_markdown_line("hello world"), "hello world");
    }

    #[test]
    fn redactor_tags_become_plain_html() {
        let input = "<p><strong data-verified=\"redactor\" data-redactor-tag=\"strong\">hi</strong></p>";
        assert_eq!(normalize_redactor_html(input), "<b>hi</b>");
    }

    #[test]
    fn redactor_cleanup_trims_zero_width_space() {
        assert_eq!(normalize_redactor_html("\u{200B} hi \r\n"), "hi");
    }
}
