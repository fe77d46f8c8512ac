//! Course folder names look like `Day - Time - Code - Level`. The rules below
//! are tried in order and grow more lenient; the first one that matches wins.

use crate::models::{CourseInfo, ParseResult};
use regex::Regex;
use std::sync::LazyLock;

const SEGMENT_SEPARATOR: &str = " - ";

struct CourseRule {
    name: &'static str,
    pattern: Regex,
}

static COURSE_RULES: LazyLock<Vec<CourseRule>> = LazyLock::new(|| {
    [
        (
            "exact",
            r"(\w+)\s*-\s*([\d\s.:_-]+)\s*-\s*([A-Z0-9]+)\s*-\s*(.*)",
        ),
        // Time ranges written as "1.5 - 3 PM" keep the PM in the time field
        (
            "pm-time",
            r"(\w+)\s*-\s*([\d\s.:_-]+PM)\s*-\s*([A-Z0-9-]+)\s*-\s*(.*)",
        ),
        (
            "generic",
            r"(\w+)\s*-\s*([\d\s.:_-]+)\s*-\s*([A-Z0-9-]+)\s*/?\s*(.*)",
        ),
    ]
    .into_iter()
    .map(|(name, pattern)| CourseRule {
        name,
        pattern: Regex::new(pattern).expect("course rule pattern is valid"),
    })
    .collect()
});

/// Parse a course folder name into its schedule, code and level.
pub fn resolve_course(folder_name: &str) -> ParseResult<CourseInfo> {
    if folder_name.split(SEGMENT_SEPARATOR).count() < 3 {
        return ParseResult::NoMatch;
    }

    for rule in COURSE_RULES.iter() {
        if let Some(caps) = rule.pattern.captures(folder_name) {
            let group = |i: usize| {
                caps.get(i)
                    .map(|m| m.as_str().trim().to_string())
                    .unwrap_or_default()
            };
            tracing::debug!(folder = folder_name, rule = rule.name, "course folder matched");
            return ParseResult::Matched(CourseInfo {
                day: group(1),
                time: group(2),
                course_code: group(3),
                level: group(4),
            });
        }
    }

    ParseResult::NoMatch
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(name: &str) -> CourseInfo {
        resolve_course(name)
            .matched()
            .unwrap_or_else(|| panic!("expected {name:?} to resolve"))
    }

    #[test]
    fn canonical_folder_name() {
        let info = course("Thursday - 6 - 7.5 - 02IPDEC2401 - PSD I");
        assert_eq!(info.day, "Thursday");
        assert_eq!(info.time, "6 - 7.5");
        assert_eq!(info.course_code, "02IPDEC2401");
        assert_eq!(info.level, "PSD I");
        assert_eq!(info.full_schedule(), "Thursday 6 - 7.5");
    }

    #[test]
    fn pm_is_kept_in_time_field() {
        let info = course("Saturday - 1.5 - 3 PM - 02IPDEC2404 - PSD I");
        assert_eq!(
            info,
            CourseInfo {
                day: "Saturday".to_string(),
                time: "1.5 - 3 PM".to_string(),
                course_code: "02IPDEC2404".to_string(),
                level: "PSD I".to_string(),
            }
        );
        assert_eq!(info.full_schedule(), "Saturday 1.5 - 3 PM");
    }

    #[test]
    fn underscore_times_and_double_spaces() {
        let info = course("Saturday - 3_00 - 4_30 -  01IPDED2404 - PSD I");
        assert_eq!(info.time, "3_00 - 4_30");
        assert_eq!(info.course_code, "01IPDED2404");
        assert_eq!(info.level, "PSD I");
    }

    #[test]
    fn generic_rule_accepts_missing_level() {
        let info = course("Monday - 5 - 03IPDEC2405");
        assert_eq!(info.day, "Monday");
        assert_eq!(info.time, "5");
        assert_eq!(info.course_code, "03IPDEC2405");
        assert_eq!(info.level, "");
    }

    #[test]
    fn fewer_than_three_segments_never_match() {
        for name in ["Saturday", "Saturday - 02IPDEC2404", "Monday - 5-6", "Unit 1.1"] {
            assert_eq!(resolve_course(name), ParseResult::NoMatch, "{name}");
        }
    }

    #[test]
    fn three_segments_without_a_schedule_do_not_match() {
        assert_eq!(
            resolve_course("Clearing Class - Notes - Misc"),
            ParseResult::NoMatch
        );
    }
}
