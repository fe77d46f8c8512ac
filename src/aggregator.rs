use crate::models::{
    CourseAssignment, CourseInfo, SkipReason, SkipRecord, StudentRecord, UnitFeedback,
};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tracing::warn;

#[derive(Debug, Clone)]
struct RegisteredCourse {
    info: CourseInfo,
    division: String,
}

/// Accumulates everything one scan discovers. Built fresh per run and
/// consumed by [`Aggregator::finalize`].
#[derive(Debug, Default)]
pub struct Aggregator {
    courses: BTreeMap<String, RegisteredCourse>,
    // (student name, course code) -> record; same-named students merge here
    records: BTreeMap<(String, String), StudentRecord>,
    mentions: BTreeMap<String, BTreeSet<String>>,
    course_mapping: BTreeMap<String, CourseAssignment>,
    skips: Vec<SkipRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseSummary {
    pub info: CourseInfo,
    pub division: String,
    pub students: Vec<String>,
}

/// A student with more than one feedback file for the same unit, which is
/// usually two different people sharing an extracted name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameCollision {
    pub name: String,
    pub course_code: String,
    pub unit_label: String,
    pub files: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnitStats {
    pub records: usize,
    pub average: f64,
    pub max: usize,
    pub min: usize,
    pub with_three_or_more: usize,
}

#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub courses: Vec<CourseSummary>,
    pub progressions: Vec<StudentRecord>,
    pub course_mapping: BTreeMap<String, CourseAssignment>,
    pub skips: Vec<SkipRecord>,
    pub name_collisions: Vec<NameCollision>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_course(&mut self, info: &CourseInfo, division: &str) {
        if let Some(existing) = self.courses.get(&info.course_code) {
            if existing.info != *info {
                warn!(
                    course_code = %info.course_code,
                    kept = %existing.info.full_schedule(),
                    ignored = %info.full_schedule(),
                    "course code appears in two folders"
                );
            }
            return;
        }
        self.courses.insert(
            info.course_code.clone(),
            RegisteredCourse {
                info: info.clone(),
                division: division.to_string(),
            },
        );
    }

    fn assign(&mut self, name: &str, info: &CourseInfo, division: &str) {
        self.register_course(info, division);
        // Last course seen wins for students enrolled in more than one
        self.course_mapping.insert(
            name.to_string(),
            CourseAssignment {
                course_code: info.course_code.clone(),
                schedule: info.full_schedule(),
                level: info.level.clone(),
                division: division.to_string(),
            },
        );
    }

    pub fn record_unit(
        &mut self,
        info: &CourseInfo,
        division: &str,
        name: &str,
        unit: UnitFeedback,
    ) {
        self.assign(name, info, division);
        self.records
            .entry((name.to_string(), info.course_code.clone()))
            .or_insert_with(|| StudentRecord {
                name: name.to_string(),
                course_code: info.course_code.clone(),
                units: Vec::new(),
            })
            .units
            .push(unit);
    }

    /// A student named inside group feedback, without feedback of their own.
    pub fn record_mention(&mut self, info: &CourseInfo, division: &str, name: &str) {
        self.assign(name, info, division);
        self.mentions
            .entry(info.course_code.clone())
            .or_default()
            .insert(name.to_string());
    }

    pub fn skip(
        &mut self,
        path: impl Into<PathBuf>,
        reason: SkipReason,
        detail: impl Into<String>,
    ) {
        let record = SkipRecord {
            path: path.into(),
            reason,
            detail: detail.into(),
        };
        warn!(path = %record.path.display(), %reason, detail = %record.detail, "skipped");
        self.skips.push(record);
    }

    pub fn skip_count(&self) -> usize {
        self.skips.len()
    }

    pub fn finalize(self) -> AnalysisReport {
        let mut roster: BTreeMap<String, BTreeSet<String>> = self.mentions;
        for (name, course_code) in self.records.keys() {
            roster
                .entry(course_code.clone())
                .or_default()
                .insert(name.clone());
        }

        let courses = self
            .courses
            .into_values()
            .map(|course| CourseSummary {
                students: roster
                    .remove(&course.info.course_code)
                    .map(|names| names.into_iter().collect())
                    .unwrap_or_default(),
                info: course.info,
                division: course.division,
            })
            .collect();

        let mut name_collisions = Vec::new();
        let progressions = self
            .records
            .into_values()
            .map(|mut record| {
                // Plain string order, so "1.10" sorts before "1.2"
                record.units.sort_by(|a, b| a.unit_label.cmp(&b.unit_label));

                let mut per_unit: BTreeMap<&str, usize> = BTreeMap::new();
                for unit in &record.units {
                    *per_unit.entry(unit.unit_label.as_str()).or_insert(0) += 1;
                }
                name_collisions.extend(per_unit.into_iter().filter(|(_, n)| *n > 1).map(
                    |(unit_label, files)| NameCollision {
                        name: record.name.clone(),
                        course_code: record.course_code.clone(),
                        unit_label: unit_label.to_string(),
                        files,
                    },
                ));

                record
            })
            .collect();

        AnalysisReport {
            courses,
            progressions,
            course_mapping: self.course_mapping,
            skips: self.skips,
            name_collisions,
        }
    }
}

impl AnalysisReport {
    /// Every distinct student name, sorted.
    pub fn students(&self) -> Vec<&str> {
        self.course_mapping.keys().map(String::as_str).collect()
    }

    pub fn course_codes(&self) -> Vec<&str> {
        self.courses
            .iter()
            .map(|course| course.info.course_code.as_str())
            .collect()
    }

    pub fn progression_summary(&self) -> BTreeMap<String, usize> {
        self.progressions
            .iter()
            .map(|record| (record.summary_key(), record.units.len()))
            .collect()
    }

    /// Skip counts for every category, including empty ones.
    pub fn skip_counts(&self) -> BTreeMap<SkipReason, usize> {
        let mut counts: BTreeMap<SkipReason, usize> = [
            SkipReason::UnparseableFolder,
            SkipReason::UnreadableDirectory,
            SkipReason::UnreadableDocument,
            SkipReason::UnextractableName,
        ]
        .into_iter()
        .map(|reason| (reason, 0))
        .collect();
        for skip in &self.skips {
            *counts.entry(skip.reason).or_insert(0) += 1;
        }
        counts
    }

    /// Students with the most units first; ties keep name order.
    pub fn top_progressions(&self, min_units: usize, limit: usize) -> Vec<&StudentRecord> {
        let mut candidates: Vec<&StudentRecord> = self
            .progressions
            .iter()
            .filter(|record| record.units.len() >= min_units)
            .collect();
        candidates.sort_by(|a, b| b.units.len().cmp(&a.units.len()));
        candidates.truncate(limit);
        candidates
    }

    pub fn letter_counts(&self) -> BTreeMap<char, usize> {
        let mut counts = BTreeMap::new();
        for name in self.course_mapping.keys() {
            if let Some(first) = name.chars().next() {
                *counts.entry(first).or_insert(0) += 1;
            }
        }
        counts
    }

    pub fn unit_stats(&self) -> Option<UnitStats> {
        let counts: Vec<usize> = self.progressions.iter().map(|r| r.units.len()).collect();
        let max = *counts.iter().max()?;
        let min = *counts.iter().min()?;
        Some(UnitStats {
            records: counts.len(),
            average: counts.iter().sum::<usize>() as f64 / counts.len() as f64,
            max,
            min,
            with_three_or_more: counts.iter().filter(|&&n| n >= 3).count(),
        })
    }

    pub fn total_units(&self) -> usize {
        self.progressions.iter().map(|r| r.units.len()).sum()
    }
}
