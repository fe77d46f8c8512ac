//! Student name and unit extraction from feedback filenames.
//!
//! Filenames follow no single convention ("Jane Doe - Unit 2.3 Feedback",
//! "Sam Lee - Primary Feedback Sheet", "1.2 - Ana Ruiz Feedback", ...). The
//! filename rules are tried in order and the first applicable one decides;
//! when it yields nothing usable the document's own `Student:` label is used.
//! Extracted names are a best guess: two people with the same name merge.

use crate::docx::DocxContent;
use crate::models::ParseResult;
use regex::Regex;
use std::sync::LazyLock;

const UNIT_SEPARATORS: &[&str] = &["- Unit ", " - Primary Feedback", " Feedback_"];
const SHEET_SUFFIXES: &[&str] = &["Feedback", "Sheet"];
const SHEET_WORDS: &[&str] = &["Feedback", "Sheet", "Primary"];
const DENIED_NAMES: &[&str] = &["copy of", "unit", "clearing class"];
// Form labels that look like names to the mention patterns
const LABEL_WORDS: &[&str] = &["Student", "Name", "Topic", "Motion", "Teacher", "Unit"];
const MAX_NAME_TOKENS: usize = 3;
const MIN_NAME_CHARS: usize = 2;
pub const UNKNOWN_UNIT: &str = "unknown";

static UNIT_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.\d+").expect("unit number pattern is valid"));
static UNIT_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+\.\d+\s*-?\s*").expect("unit prefix pattern is valid"));
static UNIT_TAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*-\s*Unit.*").expect("unit tail pattern is valid"));
static MENTION_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    const WORDS: &str = r"[A-Z][a-z]+(?:[ \t]+[A-Z][a-z]+)*";
    [
        format!(r"Student:[ \t]*({WORDS})"),
        format!(r"(?m)^({WORDS}):[ \t]*"),
        format!(r"Name:[ \t]*({WORDS})"),
        format!(r"(?m)^({WORDS})[ \t]*-[ \t]*Unit"),
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("mention pattern is valid"))
    .collect()
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    Student {
        name: String,
        unit: String,
        rule: &'static str,
    },
    Excluded(String),
}

struct NameRule {
    name: &'static str,
    apply: fn(&str) -> ParseResult<String>,
}

const NAME_RULES: &[NameRule] = &[
    NameRule {
        name: "separator",
        apply: split_at_separator,
    },
    NameRule {
        name: "suffix",
        apply: strip_sheet_suffix,
    },
    NameRule {
        name: "whole-stem",
        apply: whole_stem,
    },
];

fn split_at_separator(stem: &str) -> ParseResult<String> {
    UNIT_SEPARATORS
        .iter()
        .find_map(|sep| stem.split_once(sep))
        .map(|(left, _)| left.trim().to_string())
        .into()
}

fn strip_sheet_suffix(stem: &str) -> ParseResult<String> {
    if !ends_with_sheet_suffix(stem) {
        return ParseResult::NoMatch;
    }
    let name = remove_sheet_words(stem);
    let name = UNIT_TAIL.replace(&name, "");
    let name = UNIT_PREFIX.replace(name.trim(), "");
    ParseResult::Matched(name.trim().to_string())
}

fn whole_stem(stem: &str) -> ParseResult<String> {
    let stem = stem.trim();
    let lower = stem.to_lowercase();
    if starts_with_word(&lower, "unit")
        || starts_with_word(&lower, "copy")
        || UNIT_PREFIX.is_match(stem)
    {
        return ParseResult::NoMatch;
    }
    ParseResult::Matched(stem.to_string())
}

/// `word` followed by a non-letter or nothing, so "unity" is not "unit".
fn starts_with_word(lower: &str, word: &str) -> bool {
    lower
        .strip_prefix(word)
        .is_some_and(|rest| rest.chars().next().map_or(true, |c| !c.is_alphabetic()))
}

fn ends_with_sheet_suffix(stem: &str) -> bool {
    let stem = stem.trim_end();
    SHEET_SUFFIXES.iter().any(|suffix| stem.ends_with(suffix))
}

/// Repeats until nothing changes, since a removal can join the text around
/// it into a new sheet word ("FeedSheetback" -> "Feedback").
fn remove_sheet_words(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let next = SHEET_WORDS
            .iter()
            .fold(current.clone(), |acc, word| acc.replace(word, ""));
        if next == current {
            return current;
        }
        current = next;
    }
}

fn clean_name(raw: &str, strip_sheet_words: bool) -> String {
    let mut name = raw.replace(['(', ')'], "");
    if strip_sheet_words {
        name = remove_sheet_words(&name);
    }
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Checks a cleaned candidate against the denylist and size limits.
fn validate_name(name: &str) -> Result<(), String> {
    let lower = name.to_lowercase();
    if name.chars().count() < MIN_NAME_CHARS {
        return Err(format!("name {name:?} is too short"));
    }
    if name.chars().all(|c| c.is_ascii_digit() || c == '.') {
        return Err(format!("name {name:?} is numeric"));
    }
    if DENIED_NAMES.contains(&lower.as_str())
        || lower.starts_with("copy of")
        || starts_with_word(&lower, "unit")
    {
        return Err(format!("name {name:?} is denylisted"));
    }
    if name.split_whitespace().count() > MAX_NAME_TOKENS {
        return Err(format!("name {name:?} has more than {MAX_NAME_TOKENS} words"));
    }
    Ok(())
}

/// Unit label from the enclosing unit folder, else from a `1.2`-style number
/// in the filename.
pub fn unit_label(stem: &str, unit_folder: Option<&str>) -> String {
    unit_folder
        .map(str::trim)
        .filter(|folder| !folder.is_empty())
        .map(str::to_string)
        .or_else(|| UNIT_NUMBER.find(stem).map(|m| m.as_str().to_string()))
        .unwrap_or_else(|| UNKNOWN_UNIT.to_string())
}

pub fn extract(stem: &str, unit_folder: Option<&str>, content: Option<&DocxContent>) -> Extraction {
    let strip_sheet_words = ends_with_sheet_suffix(stem);
    let mut rejection = None;

    let from_filename = NAME_RULES
        .iter()
        .find_map(|rule| (rule.apply)(stem).matched().map(|raw| (rule.name, raw)));

    if let Some((rule, raw)) = from_filename {
        let name = clean_name(&raw, strip_sheet_words);
        match validate_name(&name) {
            Ok(()) => {
                return Extraction::Student {
                    name,
                    unit: unit_label(stem, unit_folder),
                    rule,
                }
            }
            Err(reason) => rejection = Some(reason),
        }
    }

    if let Some(raw) = content.and_then(DocxContent::labeled_student_name) {
        let name = clean_name(&raw, strip_sheet_words);
        match validate_name(&name) {
            Ok(()) => {
                return Extraction::Student {
                    name,
                    unit: unit_label(stem, unit_folder),
                    rule: "document-label",
                }
            }
            Err(reason) => rejection = rejection.or(Some(reason)),
        }
    }

    Extraction::Excluded(
        rejection.unwrap_or_else(|| "no name in filename or document".to_string()),
    )
}

/// Names mentioned inside group feedback text, in order of first appearance.
pub fn mentioned_names(text: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for pattern in MENTION_PATTERNS.iter() {
        for caps in pattern.captures_iter(text) {
            let Some(found) = caps.get(1) else { continue };
            let name = clean_name(found.as_str(), false);
            let is_label = name
                .split_whitespace()
                .next()
                .is_some_and(|first| LABEL_WORDS.contains(&first));
            if is_label || validate_name(&name).is_err() || names.contains(&name) {
                continue;
            }
            names.push(name);
        }
    }
    names
}
