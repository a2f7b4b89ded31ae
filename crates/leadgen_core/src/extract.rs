use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::normalize_url_for_dedupe;

/// Optional scheme, a dotted hostname ending in an alphabetic TLD, optional port and path.
static WEBSITE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(https?://)?[\da-z.-]+\.[a-z]{2,24}(:\d{1,5})?(/[\w.~%?=&#+:/-]*)?$")
        .expect("website pattern compiles")
});

const TEXT_SEPARATORS: [char; 3] = ['\n', ',', ';'];

pub fn is_website_candidate(candidate: &str) -> bool {
    WEBSITE_PATTERN.is_match(candidate.trim())
}

/// Split pasted text on newlines, commas and semicolons and keep the pieces that
/// look like website addresses, first occurrence wins.
pub fn extract_urls_from_text(raw: &str) -> Vec<String> {
    collect_unique(raw.split(TEXT_SEPARATORS))
}

/// Keep every spreadsheet cell that looks like a website address.
pub fn extract_urls_from_cells<I, S>(cells: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    collect_unique(cells)
}

fn collect_unique<I, S>(candidates: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut urls = Vec::new();
    for candidate in candidates {
        let trimmed = candidate.as_ref().trim();
        if trimmed.is_empty() || !is_website_candidate(trimmed) {
            continue;
        }
        if seen.insert(normalize_url_for_dedupe(trimmed)) {
            urls.push(trimmed.to_string());
        }
    }
    urls
}
