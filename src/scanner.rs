//! Walks `data/<division>/<course folder>/[<unit folder>/]*.docx` and feeds
//! every feedback sheet through extraction and classification.

use crate::aggregator::Aggregator;
use crate::course::resolve_course;
use crate::docx::DocumentSource;
use crate::extractor::{extract, mentioned_names, Extraction};
use crate::models::{CourseInfo, ParseResult, SkipReason, UnitFeedback};
use crate::themes::{classify, key_quotes, UnitInsights};
use anyhow::{bail, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const LOCK_FILE_PREFIX: &str = "~$";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanStats {
    pub courses: usize,
    pub files: usize,
}

pub struct FeedbackScanner<R: DocumentSource> {
    reader: R,
    scan_group_mentions: bool,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn is_feedback_file(path: &Path) -> bool {
    let is_docx = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("docx"));
    is_docx && path.is_file() && !file_name(path).starts_with(LOCK_FILE_PREFIX)
}

/// Directory entries sorted by path, so every run visits files in the same order.
fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in
        fs::read_dir(dir).with_context(|| format!("Failed to read directory {}", dir.display()))?
    {
        paths.push(entry?.path());
    }
    paths.sort();
    Ok(paths)
}

/// Like [`sorted_entries`], but an unreadable directory becomes a skip so the
/// rest of the tree is still scanned.
fn readable_entries(dir: &Path, aggregator: &mut Aggregator) -> Option<Vec<PathBuf>> {
    match sorted_entries(dir) {
        Ok(paths) => Some(paths),
        Err(e) => {
            aggregator.skip(dir, SkipReason::UnreadableDirectory, format!("{e:#}"));
            None
        }
    }
}

impl<R: DocumentSource> FeedbackScanner<R> {
    pub fn new(reader: R, scan_group_mentions: bool) -> Self {
        Self {
            reader,
            scan_group_mentions,
        }
    }

    pub fn scan(
        &self,
        data_dir: &Path,
        divisions: &[String],
        aggregator: &mut Aggregator,
    ) -> Result<ScanStats> {
        if !data_dir.is_dir() {
            bail!("Data directory {} not found", data_dir.display());
        }
        fs::read_dir(data_dir)
            .with_context(|| format!("Failed to read data directory {}", data_dir.display()))?;
        let mut stats = ScanStats::default();

        for division in divisions {
            let division_dir = data_dir.join(division);
            if !division_dir.is_dir() {
                warn!(division = %division, path = %division_dir.display(), "division folder not found");
                continue;
            }

            let Some(course_dirs) = readable_entries(&division_dir, aggregator) else {
                continue;
            };
            for course_dir in course_dirs.into_iter().filter(|path| path.is_dir()) {
                let folder = file_name(&course_dir);
                match resolve_course(&folder) {
                    ParseResult::Matched(info) => {
                        aggregator.register_course(&info, division);
                        stats.courses += 1;
                        stats.files += self.scan_course(&course_dir, &info, division, aggregator);
                    }
                    ParseResult::NoMatch => aggregator.skip(
                        course_dir,
                        SkipReason::UnparseableFolder,
                        format!("folder name {folder:?} matches no course pattern"),
                    ),
                }
            }
        }

        info!(
            courses = stats.courses,
            files = stats.files,
            skipped = aggregator.skip_count(),
            "scan finished"
        );
        Ok(stats)
    }

    /// Unit subfolders first, then sheets lying directly in the course folder.
    fn scan_course(
        &self,
        course_dir: &Path,
        info: &CourseInfo,
        division: &str,
        aggregator: &mut Aggregator,
    ) -> usize {
        let Some(entries) = readable_entries(course_dir, aggregator) else {
            return 0;
        };
        let mut files = 0;

        for unit_dir in entries.iter().filter(|path| path.is_dir()) {
            let unit_folder = file_name(unit_dir);
            let Some(unit_entries) = readable_entries(unit_dir, aggregator) else {
                continue;
            };
            for path in unit_entries.iter().filter(|path| is_feedback_file(path)) {
                self.process_file(path, info, division, Some(&unit_folder), aggregator);
                files += 1;
            }
        }

        for path in entries.iter().filter(|path| is_feedback_file(path)) {
            self.process_file(path, info, division, None, aggregator);
            files += 1;
        }

        debug!(course_code = %info.course_code, files, "course scanned");
        files
    }

    fn process_file(
        &self,
        path: &Path,
        info: &CourseInfo,
        division: &str,
        unit_folder: Option<&str>,
        aggregator: &mut Aggregator,
    ) {
        debug!(path = %path.display(), "reading feedback sheet");

        let content = match self.reader.read(path) {
            Ok(content) => content,
            Err(e) => {
                aggregator.skip(path, SkipReason::UnreadableDocument, e.to_string());
                return;
            }
        };

        let stem = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        match extract(&stem, unit_folder, Some(&content)) {
            Extraction::Student { name, unit, rule } => {
                debug!(%name, %unit, rule, "student extracted");
                let text = content.text();
                let feedback = UnitFeedback {
                    unit_label: unit,
                    source_path: path.to_path_buf(),
                    themes: classify(&text),
                    key_quotes: key_quotes(&text),
                    topic: content.topic(),
                    insights: UnitInsights::from_comments(&content.feedback_comments()),
                    raw_text: text,
                };
                aggregator.record_unit(info, division, &name, feedback);
            }
            Extraction::Excluded(reason) => {
                if self.scan_group_mentions {
                    let names = mentioned_names(&content.text());
                    if !names.is_empty() {
                        debug!(path = %path.display(), mentions = names.len(), "group feedback");
                        for name in names {
                            aggregator.record_mention(info, division, &name);
                        }
                        return;
                    }
                }
                aggregator.skip(path, SkipReason::UnextractableName, reason);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::docx::fixtures::write_docx;
    use crate::docx::{DocxContent, DocxReader};
    use crate::error::DocxError;
    use crate::report::to_json;
    use tempfile::TempDir;

    const PRIMARY_COURSE: &str = "Saturday - 1.5 - 3 PM - 02IPDEC2404 - PSD I";
    const SECONDARY_COURSE: &str = "Thursday - 6 - 7.5 - 01IPDED2404 - PSD II";

    fn divisions() -> Vec<String> {
        vec!["primary".to_string(), "secondary".to_string()]
    }

    fn build_tree() -> TempDir {
        let tmp = TempDir::new().unwrap();
        let primary = tmp.path().join("primary").join(PRIMARY_COURSE);
        let secondary = tmp.path().join("secondary").join(SECONDARY_COURSE);

        write_docx(
            &primary.join("1.1").join("Jane Doe - Unit 1.1 Feedback.docx"),
            &["Great improvement in confidence. Needs more volume."],
            &[vec![vec!["Topic: School uniforms"]]],
        );
        write_docx(
            &primary.join("1.2").join("Jane Doe - Unit 1.2 Feedback.docx"),
            &["Good teamwork in the debate."],
            &[],
        );
        fs::write(primary.join("1.2").join("~$ne Doe - Unit 1.2 Feedback.docx"), b"lock").unwrap();
        fs::write(primary.join("1.2").join("notes.txt"), b"not a sheet").unwrap();
        write_docx(
            &primary.join("Sam Lee - Primary Feedback Sheet.docx"),
            &["Clear voice."],
            &[],
        );
        write_docx(&primary.join("Copy of 1.2.docx"), &["Attended."], &[]);
        fs::write(primary.join("broken.docx"), b"not a zip").unwrap();
        fs::create_dir_all(tmp.path().join("primary").join("Notes")).unwrap();
        write_docx(
            &secondary.join("Ana Ruiz Feedback.docx"),
            &["Creative rebuttal."],
            &[],
        );

        tmp
    }

    fn run(root: &Path, scan_group_mentions: bool) -> (ScanStats, crate::aggregator::AnalysisReport) {
        let scanner = FeedbackScanner::new(DocxReader::new(true), scan_group_mentions);
        let mut aggregator = Aggregator::new();
        let stats = scanner.scan(root, &divisions(), &mut aggregator).unwrap();
        (stats, aggregator.finalize())
    }

    #[test]
    fn scans_generated_tree() {
        let tmp = build_tree();
        let (stats, report) = run(tmp.path(), false);

        assert_eq!(stats, ScanStats { courses: 2, files: 6 });
        assert_eq!(report.students(), vec!["Ana Ruiz", "Jane Doe", "Sam Lee"]);
        assert_eq!(report.course_codes(), vec!["01IPDED2404", "02IPDEC2404"]);

        let counts = report.skip_counts();
        assert_eq!(counts[&SkipReason::UnparseableFolder], 1);
        assert_eq!(counts[&SkipReason::UnreadableDocument], 1);
        assert_eq!(counts[&SkipReason::UnextractableName], 1);

        let summary = report.progression_summary();
        assert_eq!(summary["Jane Doe_02IPDEC2404"], 2);
        assert_eq!(summary["Sam Lee_02IPDEC2404"], 1);

        let jane = &report.progressions[1];
        assert_eq!(jane.name, "Jane Doe");
        assert_eq!(jane.units[0].unit_label, "1.1");
        assert_eq!(jane.units[0].topic.as_deref(), Some("School uniforms"));
        assert!(jane.units[0].themes.contains(&crate::themes::Theme::Confidence));

        let sam = &report.progressions[2];
        assert_eq!(sam.units[0].unit_label, "unknown");
    }

    #[test]
    fn json_is_identical_across_runs() {
        let tmp = build_tree();
        let first = to_json(&run(tmp.path(), false).1).unwrap();
        let second = to_json(&run(tmp.path(), false).1).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn group_feedback_adds_mentions_when_enabled() {
        let tmp = TempDir::new().unwrap();
        let course = tmp.path().join("primary").join(PRIMARY_COURSE);
        write_docx(
            &course.join("Unit 2 Group.docx"),
            &["Student: Mia Wong", "Leo Park: confident opener"],
            &[],
        );

        let (_, report) = run(tmp.path(), false);
        assert_eq!(report.skip_counts()[&SkipReason::UnextractableName], 1);
        assert!(report.students().is_empty());

        let (_, report) = run(tmp.path(), true);
        assert_eq!(report.skip_counts()[&SkipReason::UnextractableName], 0);
        assert_eq!(report.courses[0].students, vec!["Leo Park", "Mia Wong"]);
        assert!(report.progressions.is_empty());
    }

    #[test]
    fn missing_division_is_not_fatal() {
        let tmp = build_tree();
        let scanner = FeedbackScanner::new(DocxReader::new(true), false);
        let mut aggregator = Aggregator::new();
        let stats = scanner
            .scan(tmp.path(), &["adult".to_string()], &mut aggregator)
            .unwrap();
        assert_eq!(stats, ScanStats::default());
    }

    #[test]
    fn missing_data_directory_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let scanner = FeedbackScanner::new(DocxReader::new(true), false);
        let mut aggregator = Aggregator::new();
        assert!(scanner
            .scan(&tmp.path().join("gone"), &divisions(), &mut aggregator)
            .is_err());
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_unit_folder_is_skipped_and_siblings_survive() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let course = tmp.path().join("primary").join(PRIMARY_COURSE);
        write_docx(
            &course.join("1.1").join("Jane Doe - Unit 1.1 Feedback.docx"),
            &["Good start."],
            &[],
        );
        write_docx(
            &course.join("1.2").join("Jane Doe - Unit 1.2 Feedback.docx"),
            &["Better."],
            &[],
        );
        let locked = course.join("1.2");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits do not stop a privileged user
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let (stats, report) = run(tmp.path(), false);
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(stats.files, 1);
        assert_eq!(report.progression_summary()["Jane Doe_02IPDEC2404"], 1);
        let counts = report.skip_counts();
        assert_eq!(counts[&SkipReason::UnreadableDirectory], 1);
        assert_eq!(report.skips[0].path, locked);
    }

    struct Unreadable;

    impl DocumentSource for Unreadable {
        fn read(&self, _path: &Path) -> Result<DocxContent, DocxError> {
            Err(DocxError::MissingPart("word/document.xml"))
        }
    }

    #[test]
    fn unreadable_sheets_are_skipped_not_recorded() {
        let tmp = build_tree();
        let scanner = FeedbackScanner::new(Unreadable, false);
        let mut aggregator = Aggregator::new();
        scanner.scan(tmp.path(), &divisions(), &mut aggregator).unwrap();

        let report = aggregator.finalize();
        assert!(report.progressions.is_empty());
        assert_eq!(report.skip_counts()[&SkipReason::UnreadableDocument], 6);
        assert_eq!(report.courses.len(), 2);
    }
}
