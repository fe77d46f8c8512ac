use crate::aggregator::{AnalysisReport, CourseSummary};
use crate::models::{Config, CourseAssignment, SkipReason};
use crate::themes::truncate;
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

const RULE_WIDTH: usize = 80;
const QUOTE_PREVIEW_CHARS: usize = 100;
const TIMELINE_UNITS: usize = 6;

#[derive(Debug, Serialize)]
struct JsonExport<'a> {
    students: Vec<&'a str>,
    course_mapping: &'a BTreeMap<String, CourseAssignment>,
    course_codes: Vec<&'a str>,
    student_progression_summary: BTreeMap<String, usize>,
    skip_summary: BTreeMap<SkipReason, usize>,
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn display_level(course: &CourseSummary) -> String {
    format!("{} {}", title_case(&course.division), course.info.level)
        .trim()
        .to_string()
}

/// Human-readable console report. Not meant to be parsed.
pub fn render(report: &AnalysisReport, config: &Config) -> String {
    let min_units = config.progression_min_units;
    let mut content = String::new();
    let rule = "=".repeat(RULE_WIDTH);

    content.push_str(&format!("{rule}\n"));
    content.push_str("COMPREHENSIVE STUDENT FEEDBACK ANALYSIS REPORT\n");
    content.push_str(&format!("{rule}\n"));

    // 1
    content.push_str("\n1. OVERVIEW\n");
    content.push_str(&format!(
        "   Total unique students found: {}\n",
        report.students().len()
    ));
    content.push_str(&format!(
        "   Total course codes: {}\n",
        report.course_codes().len()
    ));
    content.push_str(&format!(
        "   Course codes: {}\n",
        report.course_codes().join(", ")
    ));
    content.push_str(&format!(
        "   Feedback files analysed: {}\n",
        report.total_units()
    ));
    content.push_str(&format!("   Items skipped: {}\n", report.skips.len()));

    // 2
    content.push_str("\n2. COURSE-STUDENT MAPPING\n");
    for course in &report.courses {
        content.push_str(&format!("\n   Course: {}\n", course.info.course_code));
        content.push_str(&format!("   Schedule: {}\n", course.info.full_schedule()));
        content.push_str(&format!("   Level: {}\n", display_level(course)));
        content.push_str(&format!("   Students ({}):\n", course.students.len()));
        for name in &course.students {
            content.push_str(&format!("     - {name}\n"));
        }
    }

    // 3
    content.push_str("\n3. STUDENT PROGRESSION\n");
    let top = report.top_progressions(min_units, config.detailed_student_limit);
    if top.is_empty() {
        content.push_str(&format!(
            "   No student has feedback for {min_units} or more units\n"
        ));
    }
    for record in top {
        content.push_str(&format!("\n   Student: {}\n", record.name));
        content.push_str(&format!("   Course: {}\n", record.course_code));
        content.push_str(&format!("   Total Units: {}\n", record.units.len()));
        content.push_str("   Progression Timeline:\n");
        for unit in record.units.iter().take(TIMELINE_UNITS) {
            content.push_str(&format!("     Unit {}:\n", unit.unit_label));
            content.push_str(&format!(
                "       Content length: {} characters\n",
                unit.content_length()
            ));
            if let Some(topic) = &unit.topic {
                content.push_str(&format!("       Topic: {topic}\n"));
            }
            if let Some(quote) = unit.key_quotes.first() {
                content.push_str(&format!(
                    "       Key feedback: {}\n",
                    truncate(quote, QUOTE_PREVIEW_CHARS)
                ));
            }
            if !unit.themes.is_empty() {
                let themes: Vec<&str> = unit.themes.iter().map(|t| t.as_str()).collect();
                content.push_str(&format!("       Themes: {}\n", themes.join(", ")));
            }
            if unit.insights.is_empty() {
                continue;
            }
            if let Some(strength) = unit.insights.strengths.first() {
                content.push_str(&format!("       Strengths: {strength}\n"));
            }
            if let Some(area) = unit.insights.growth_areas.first() {
                content.push_str(&format!("       Growth areas: {area}\n"));
            }
            if !unit.insights.skills.is_empty() {
                let skills: Vec<&str> = unit.insights.skills.iter().map(String::as_str).collect();
                content.push_str(&format!("       Skills focus: {}\n", skills.join(", ")));
            }
        }
    }

    // 4
    content.push_str("\n4. STATISTICAL SUMMARY\n");
    content.push_str("   Students by first letter:\n");
    for (letter, count) in report.letter_counts() {
        content.push_str(&format!("     {letter}: {count}\n"));
    }
    if let Some(stats) = report.unit_stats() {
        content.push_str(&format!(
            "\n   Students with progression data: {}\n",
            stats.records
        ));
        content.push_str(&format!(
            "   Average units per student: {:.1}\n",
            stats.average
        ));
        content.push_str(&format!("   Max units for one student: {}\n", stats.max));
        content.push_str(&format!("   Min units for one student: {}\n", stats.min));
        content.push_str(&format!(
            "   Students with 3+ units: {}\n",
            stats.with_three_or_more
        ));
    }

    // 5
    content.push_str("\n5. SKIPPED ITEMS\n");
    for (reason, count) in report.skip_counts() {
        content.push_str(&format!("   {reason}: {count}\n"));
    }
    for skip in &report.skips {
        content.push_str(&format!(
            "     - {} ({}): {}\n",
            skip.path.display(),
            skip.reason,
            skip.detail
        ));
    }

    // 6
    if !report.name_collisions.is_empty() {
        content.push_str("\n6. POSSIBLE NAME COLLISIONS\n");
        for collision in &report.name_collisions {
            content.push_str(&format!(
                "     - {} in {} unit {}: {} files\n",
                collision.name, collision.course_code, collision.unit_label, collision.files
            ));
        }
    }

    content
}

pub fn to_json(report: &AnalysisReport) -> Result<String> {
    let export = JsonExport {
        students: report.students(),
        course_mapping: &report.course_mapping,
        course_codes: report.course_codes(),
        student_progression_summary: report.progression_summary(),
        skip_summary: report.skip_counts(),
    };
    let mut json = serde_json::to_string_pretty(&export)?;
    json.push('\n');
    Ok(json)
}

pub fn write_json(report: &AnalysisReport, path: &Path) -> Result<()> {
    let json = to_json(report)?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// One row per unit feedback file.
pub fn write_unit_csv(report: &AnalysisReport, path: &Path) -> Result<()> {
    use csv::Writer;

    let courses: BTreeMap<&str, &CourseSummary> = report
        .courses
        .iter()
        .map(|course| (course.info.course_code.as_str(), course))
        .collect();

    let mut writer = Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    writer.write_record([
        "Course_Code",
        "Schedule",
        "Level",
        "Student",
        "Unit",
        "Themes",
        "Topic",
        "Key_Quote",
        "Content_Length",
        "Source_Path",
    ])?;

    for record in &report.progressions {
        let (schedule, level) = courses
            .get(record.course_code.as_str())
            .map(|course| (course.info.full_schedule(), display_level(course)))
            .unwrap_or_default();

        for unit in &record.units {
            let themes: Vec<&str> = unit.themes.iter().map(|t| t.as_str()).collect();
            writer.write_record([
                record.course_code.as_str(),
                schedule.as_str(),
                level.as_str(),
                record.name.as_str(),
                unit.unit_label.as_str(),
                themes.join(";").as_str(),
                unit.topic.as_deref().unwrap_or(""),
                unit.key_quotes.first().map(String::as_str).unwrap_or(""),
                unit.content_length().to_string().as_str(),
                unit.source_path.display().to_string().as_str(),
            ])?;
        }
    }

    writer.flush()?;
    Ok(())
}
