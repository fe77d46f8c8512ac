//! Keyword-based theme detection for feedback text.
//!
//! Matching is a case-insensitive substring test with no negation handling:
//! "not improved" and "clearly improved" both count as improvement.

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

const MAX_KEY_QUOTES: usize = 3;
const MAX_COMMENT_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    Confidence,
    Participation,
    Improvement,
    Challenges,
    SpeakingSkills,
    Listening,
    Teamwork,
    Creativity,
}

// "questions" on its own is deliberately absent from participation.
const TAXONOMY: &[(Theme, &[&str])] = &[
    (Theme::Confidence, &["confidence", "confident", "self-assured"]),
    (
        Theme::Participation,
        &["participation", "participate", "engaged", "involvement", "asking questions"],
    ),
    (
        Theme::Improvement,
        &["improvement", "improved", "better", "progress", "growth"],
    ),
    (
        Theme::Challenges,
        &["challenge", "difficult", "struggle", "need to work on"],
    ),
    (
        Theme::SpeakingSkills,
        &["speaking", "voice", "volume", "clarity", "pronunciation"],
    ),
    (Theme::Listening, &["listening", "attention", "focus"]),
    (
        Theme::Teamwork,
        &["teamwork", "collaboration", "group work", "cooperation"],
    ),
    (
        Theme::Creativity,
        &["creative", "imagination", "original", "innovative"],
    ),
];

const STRENGTH_WORDS: &[&str] = &["great", "good", "excellent", "well done", "nice"];
const GROWTH_WORDS: &[&str] = &["needs", "try to", "should", "improve", "work on"];
const SKILLS: &[&str] = &[
    "volume",
    "clarity",
    "argument",
    "rebuttal",
    "evidence",
    "signposting",
    "hook",
];

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Confidence => "confidence",
            Theme::Participation => "participation",
            Theme::Improvement => "improvement",
            Theme::Challenges => "challenges",
            Theme::SpeakingSkills => "speaking_skills",
            Theme::Listening => "listening",
            Theme::Teamwork => "teamwork",
            Theme::Creativity => "creativity",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn classify(text: &str) -> BTreeSet<Theme> {
    let lower = text.to_lowercase();
    TAXONOMY
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|keyword| lower.contains(keyword)))
        .map(|(theme, _)| *theme)
        .collect()
}

/// The first few non-empty period-delimited sentences, each ending in `.`.
pub fn key_quotes(text: &str) -> Vec<String> {
    text.split('.')
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
        .take(MAX_KEY_QUOTES)
        .map(|sentence| format!("{sentence}."))
        .collect()
}

/// Strengths, growth areas and named skills picked out of teacher comments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnitInsights {
    pub strengths: Vec<String>,
    pub growth_areas: Vec<String>,
    pub skills: BTreeSet<String>,
}

impl UnitInsights {
    pub fn from_comments<S: AsRef<str>>(comments: &[S]) -> Self {
        let mut insights = UnitInsights::default();

        for comment in comments {
            let comment = comment.as_ref();
            let lower = comment.to_lowercase();

            if STRENGTH_WORDS.iter().any(|word| lower.contains(word)) {
                insights.strengths.push(truncate(comment, MAX_COMMENT_CHARS));
            }
            if GROWTH_WORDS.iter().any(|word| lower.contains(word)) {
                insights.growth_areas.push(truncate(comment, MAX_COMMENT_CHARS));
            }
            for skill in SKILLS.iter().filter(|skill| lower.contains(*skill)) {
                insights.skills.insert(skill.to_string());
            }
        }

        insights
    }

    pub fn is_empty(&self) -> bool {
        self.strengths.is_empty() && self.growth_areas.is_empty() && self.skills.is_empty()
    }
}

pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let head: String = text.chars().take(max_chars).collect();
        format!("{head}...")
    } else {
        text.to_string()
    }
}
