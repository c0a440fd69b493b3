//! crates/drug_discovery_core/src/parsing.rs
//!
//! Turns loosely-structured generative output into renderable data: numbered
//! sections with dash bullets, or the JSON object embedded in a reply.

use crate::domain::Section;
use regex::Regex;
use serde::de::DeserializeOwned;
use std::sync::OnceLock;

/// Shown in place of a report when nothing could be parsed out of the reply.
pub const NO_DETAILS_SENTINEL: &str = "No detailed information available";

fn heading_regex() -> &'static Regex {
    static HEADING: OnceLock<Regex> = OnceLock::new();
    HEADING.get_or_init(|| Regex::new(r"\d+\.\s[A-Za-z\s]+:").expect("valid heading pattern"))
}

fn json_block_regex() -> &'static Regex {
    static BLOCK: OnceLock<Regex> = OnceLock::new();
    BLOCK.get_or_init(|| Regex::new(r"\{[\s\S]*\}").expect("valid JSON block pattern"))
}

//=========================================================================================
// Plain-Text Sections
//=========================================================================================

/// Splits `text` into sections at every numbered heading (`1. Some Heading:`).
///
/// Text before the first heading is ignored. Each body line is trimmed and loses
/// one leading `-`; blank lines are skipped, and sections left without bullets
/// are dropped.
pub fn parse_sections(text: &str) -> Vec<Section> {
    let headings: Vec<_> = heading_regex().find_iter(text).collect();

    headings
        .iter()
        .enumerate()
        .filter_map(|(i, heading)| {
            let body_end = headings.get(i + 1).map_or(text.len(), |next| next.start());
            let body = &text[heading.end()..body_end];

            let bullet_points: Vec<String> = body
                .lines()
                .map(|line| {
                    let line = line.trim();
                    line.strip_prefix('-').unwrap_or(line).trim().to_string()
                })
                .filter(|line| !line.is_empty())
                .collect();

            if bullet_points.is_empty() {
                None
            } else {
                Some(Section {
                    title: heading.as_str().trim().to_string(),
                    bullet_points,
                })
            }
        })
        .collect()
}

/// The displayable outcome of parsing a plain-text report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    Sections(Vec<Section>),
    /// Nothing parseable came back; render [`NO_DETAILS_SENTINEL`].
    Unavailable,
}

impl Report {
    pub fn sections(&self) -> &[Section] {
        match self {
            Report::Sections(sections) => sections,
            Report::Unavailable => &[],
        }
    }
}

/// Parses a plain-text reply, falling back to [`Report::Unavailable`] instead of failing.
pub fn parse_report(text: &str) -> Report {
    let sections = parse_sections(text);
    if sections.is_empty() {
        Report::Unavailable
    } else {
        Report::Sections(sections)
    }
}

//=========================================================================================
// Embedded JSON
//=========================================================================================

#[derive(Debug, thiserror::Error)]
pub enum ExtractError {
    #[error("No valid JSON found")]
    NoJsonBlock,
    #[error("No valid JSON found: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Pulls the span from the first `{` to the last `}` out of `text` and deserializes it.
///
/// Fails when there is no such span or it does not parse as `T`.
pub fn extract_json<T: DeserializeOwned>(text: &str) -> Result<T, ExtractError> {
    let block = json_block_regex()
        .find(text)
        .ok_or(ExtractError::NoJsonBlock)?;
    Ok(serde_json::from_str(block.as_str())?)
}
