// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Domain detection in user messages
//!
//! Finds the first URL-like token in a chat message so its page can be
//! scraped and prepended to the prompt.

use regex::Regex;
use std::sync::OnceLock;

/// Optional scheme, optional `www.`, one label, a dot, a 2+ letter TLD,
/// optional path. Group 1 is the hostname.
const DOMAIN_PATTERN: &str =
    r"\b(?:https?://)?(?:www\.)?([a-zA-Z0-9-]+\.[a-zA-Z]{2,})(?:/[^\s]*)?\b";

fn domain_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(DOMAIN_PATTERN).expect("domain pattern is a valid regex"))
}

/// Extract the first hostname referenced in `text`
///
/// Scheme, `www.` and path are dropped: `https://www.example.com/page`
/// yields `example.com`. Only the first match is returned; later URLs in
/// the same message are ignored.
///
/// # Arguments
/// * `text` - Free-form user message
///
/// # Returns
/// The `label.tld` hostname, or None when nothing URL-like is present
pub fn detect_domain(text: &str) -> Option<&str> {
    domain_regex()
        .captures(text)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
}
