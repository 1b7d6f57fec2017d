// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Auto-linking of markdown links, bare URLs, emails, and phone numbers.
//!
//! Matches are collected by descending priority (markdown link, bare URL,
//! email, phone); a lower-priority pattern is only matched inside text
//! regions not already claimed, so matches never overlap.

use regex::Regex;
use std::ops::Range;
use std::sync::LazyLock;

static MD_LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[[^\[\]()]+\]\((?:https?://|www\.)[^\s)]+\)").expect("md link regex")
});
static BARE_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:https?://|www\.)[^\s<>()]+").expect("bare url regex"));
static EMAIL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9][A-Za-z0-9.-]*\.[A-Za-z]{2,}").expect("email regex")
});
static PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\+?\d[\d\s().-]{5,}\d").expect("phone regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LinkKind {
    MdLink,
    Url,
    Email,
    Phone,
}

/// Rewrites one line, wrapping each linkable region in an `<a>` tag.
pub fn autolink_line(line: &str) -> String {
    let mut claimed: Vec<(Range<usize>, LinkKind)> = Vec::new();

    for (regex, kind) in [
        (&*MD_LINK, LinkKind::MdLink),
        (&*BARE_URL, LinkKind::Url),
        (&*EMAIL, LinkKind::Email),
        (&*PHONE, LinkKind::Phone),
    ] {
        for gap in free_ranges(&claimed, line.len()) {
            for m in regex.find_iter(&line[gap.clone()]) {
                let range = gap.start + m.start()..gap.start + m.end();
                claimed.push((range, kind));
            }
        }
        claimed.sort_by_key(|(range, _)| range.start);
    }

    let mut out = String::with_capacity(line.len());
    let mut cursor = 0;
    for (range, kind) in &claimed {
        out.push_str(&line[cursor..range.start]);
        out.push_str(&render_link(&line[range.clone()], *kind));
        cursor = range.end;
    }
    out.push_str(&line[cursor..]);
    out
}

fn render_link(part: &str, kind: LinkKind) -> String {
    match kind {
        LinkKind::MdLink => {
            // [title](url) — both sides non-empty by construction.
            let inner = part.trim_start_matches('[').trim_end_matches(')');
            match inner.split_once("](") {
                Some((title, url)) => make_html_url(url, title),
                None => part.to_string(),
            }
        }
        LinkKind::Url => make_html_url(part, part),
        LinkKind::Email => make_html_url(&format!("mailto:{part}"), part),
        LinkKind::Phone => make_html_url(&format!("tel:{part}"), part),
    }
}

fn make_html_url(url: &str, title: &str) -> String {
    format!("<a href=\"{url}\">{title}</a>")
}

/// Ranges of `0..len` not covered by any claimed range. `claimed` must be
/// sorted by start and non-overlapping.
fn free_ranges(claimed: &[(Range<usize>, LinkKind)], len: usize) -> Vec<Range<usize>> {
    let mut free = Vec::new();
    let mut cursor = 0;
    for (range, _) in claimed {
        if cursor < range.start {
            free.push(cursor..range.start);
        }
        cursor = range.end;
    }
    if cursor < len {
        free.push(cursor..len);
    }
    free
}
