use crate::themes::{Theme, UnitInsights};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use anyhow::Context;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_directory: String,
    // First-level folders under the data directory, scanned in this order
    pub divisions: Vec<String>,
    pub output_directory: String,
    pub json_file: String,
    pub csv_export: bool,
    pub include_tables: bool,
    pub scan_group_mentions: bool,
    pub progression_min_units: usize,
    pub detailed_student_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_directory: "data".to_string(),
            divisions: vec!["primary".to_string(), "secondary".to_string()],
            output_directory: "output".to_string(),
            json_file: "feedback_analysis_results.json".to_string(),
            csv_export: true,
            include_tables: true,
            scan_group_mentions: false,
            progression_min_units: 2,
            detailed_student_limit: 3,
        }
    }
}

impl Config {
    pub fn load_from_file(file_path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(file_path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save_to_file(&self, file_path: &str) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(file_path, content)?;
        Ok(())
    }

    /// Loads `file_path`, or writes the defaults there when it does not exist.
    /// The flag is true when the file was created.
    pub fn load_or_create(file_path: &str) -> anyhow::Result<(Self, bool)> {
        if Path::new(file_path).exists() {
            let config = Self::load_from_file(file_path)
                .with_context(|| format!("Failed to load {file_path}"))?;
            return Ok((config, false));
        }
        let config = Self::default();
        config
            .save_to_file(file_path)
            .with_context(|| format!("Failed to write {file_path}"))?;
        Ok((config, true))
    }

    /// Command-line directories take precedence over the file.
    pub fn apply_overrides(&mut self, data_dir: Option<&str>, output_dir: Option<&str>) {
        if let Some(data_dir) = data_dir {
            self.data_directory = data_dir.to_string();
        }
        if let Some(output_dir) = output_dir {
            self.output_directory = output_dir.to_string();
        }
    }
}

/// Outcome of an ordered rule chain: the first rule that matches decides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseResult<T> {
    Matched(T),
    NoMatch,
}

impl<T> ParseResult<T> {
    pub fn matched(self) -> Option<T> {
        match self {
            ParseResult::Matched(value) => Some(value),
            ParseResult::NoMatch => None,
        }
    }
}

impl<T> From<Option<T>> for ParseResult<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => ParseResult::Matched(value),
            None => ParseResult::NoMatch,
        }
    }
}

/// Schedule and code parsed from a course folder name such as
/// `Saturday - 1.5 - 3 PM - 02IPDEC2404 - PSD I`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseInfo {
    pub day: String,
    pub time: String,
    pub course_code: String,
    pub level: String,
}

impl CourseInfo {
    pub fn full_schedule(&self) -> String {
        format!("{} {}", self.day, self.time)
    }
}

/// Where a course sits in the course mapping of the JSON export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseAssignment {
    pub course_code: String,
    pub schedule: String,
    pub level: String,
    pub division: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnitFeedback {
    pub unit_label: String,
    pub raw_text: String,
    pub source_path: PathBuf,
    pub themes: BTreeSet<Theme>,
    pub key_quotes: Vec<String>,
    pub topic: Option<String>,
    pub insights: UnitInsights,
}

impl UnitFeedback {
    pub fn content_length(&self) -> usize {
        self.raw_text.chars().count()
    }
}

/// All feedback found for one extracted name within one course.
#[derive(Debug, Clone, Serialize)]
pub struct StudentRecord {
    pub name: String,
    pub course_code: String,
    pub units: Vec<UnitFeedback>,
}

impl StudentRecord {
    /// Key used by the progression summary, `"{name}_{course_code}"`.
    pub fn summary_key(&self) -> String {
        format!("{}_{}", self.name, self.course_code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    UnparseableFolder,
    UnreadableDirectory,
    UnreadableDocument,
    UnextractableName,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::UnparseableFolder => "unparseable_folder",
            SkipReason::UnreadableDirectory => "unreadable_directory",
            SkipReason::UnreadableDocument => "unreadable_document",
            SkipReason::UnextractableName => "unextractable_name",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkipRecord {
    pub path: PathBuf,
    pub reason: SkipReason,
    pub detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_schedule_joins_day_and_time() {
        let info = CourseInfo {
            day: "Thursday".to_string(),
            time: "6 - 7.5".to_string(),
            course_code: "02IPDEC2401".to_string(),
            level: "PSD I".to_string(),
        };
        assert_eq!(info.full_schedule(), "Thursday 6 - 7.5");
    }

    #[test]
    fn config_survives_toml_round_trip() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        let path = path.to_str().unwrap();

        let mut config = Config::default();
        config.scan_group_mentions = true;
        config.divisions = vec!["primary".to_string()];
        config.save_to_file(path).unwrap();

        let loaded = Config::load_from_file(path).unwrap();
        assert!(loaded.scan_group_mentions);
        assert_eq!(loaded.divisions, vec!["primary".to_string()]);
        assert_eq!(loaded.json_file, "feedback_analysis_results.json");
    }

    #[test]
    fn missing_config_is_created_with_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        let path = path.to_str().unwrap();

        let (config, created) = Config::load_or_create(path).unwrap();
        assert!(created);
        assert_eq!(config.data_directory, "data");
        assert!(std::path::Path::new(path).exists());

        let (_, created) = Config::load_or_create(path).unwrap();
        assert!(!created);
    }

    #[test]
    fn existing_config_is_loaded_and_partial_files_use_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "data_directory = \"feedback\"\ncsv_export = false\n").unwrap();

        let (config, created) = Config::load_or_create(path.to_str().unwrap()).unwrap();
        assert!(!created);
        assert_eq!(config.data_directory, "feedback");
        assert!(!config.csv_export);
        assert_eq!(config.divisions, vec!["primary", "secondary"]);
    }

    #[test]
    fn malformed_config_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "csv_export = \"sometimes\"").unwrap();
        assert!(Config::load_or_create(path.to_str().unwrap()).is_err());
    }

    #[test]
    fn command_line_overrides_directories() {
        let mut config = Config::default();
        config.apply_overrides(Some("/srv/feedback"), None);
        assert_eq!(config.data_directory, "/srv/feedback");
        assert_eq!(config.output_directory, "output");

        config.apply_overrides(None, Some("reports"));
        assert_eq!(config.data_directory, "/srv/feedback");
        assert_eq!(config.output_directory, "reports");
    }

    #[test]
    fn parse_result_from_option() {
        assert_eq!(ParseResult::from(Some(3)), ParseResult::Matched(3));
        assert_eq!(ParseResult::<u8>::from(None), ParseResult::NoMatch);
    }
}
