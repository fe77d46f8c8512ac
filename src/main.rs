mod aggregator;
mod course;
mod docx;
mod error;
mod extractor;
mod models;
mod report;
mod scanner;
mod themes;

use aggregator::Aggregator;
use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use docx::DocxReader;
use models::Config;
use scanner::FeedbackScanner;
use std::fs;
use std::path::Path;
use tracing::{info, Level};

const UNIT_CSV_FILE: &str = "unit_feedback.csv";

fn main() -> Result<()> {
    let matches = Command::new("feedback-analyzer")
        .version("1.0")
        .about("Analyzes student feedback sheets across courses and units")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file path")
                .default_value("config.toml"),
        )
        .arg(
            Arg::new("data-dir")
                .short('d')
                .long("data-dir")
                .value_name("DIR")
                .help("Feedback data directory (overrides config)"),
        )
        .arg(
            Arg::new("output-dir")
                .short('o')
                .long("output-dir")
                .value_name("DIR")
                .help("Output directory (overrides config)"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log every processed file")
                .action(ArgAction::SetTrue),
        )
        .get_matches();

    let level = if matches.get_flag("verbose") {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config_file = matches
        .get_one::<String>("config")
        .map(String::as_str)
        .unwrap_or("config.toml");

    let (mut config, created) = Config::load_or_create(config_file)?;
    if created {
        println!("📝 Created default configuration file: {}", config_file);
    } else {
        println!("📋 Loaded configuration from: {}", config_file);
    }
    config.apply_overrides(
        matches.get_one::<String>("data-dir").map(String::as_str),
        matches.get_one::<String>("output-dir").map(String::as_str),
    );

    let output_dir = config.output_directory.as_str();
    fs::create_dir_all(output_dir)
        .with_context(|| format!("Failed to create output directory {output_dir}"))?;
    clean_output_directory(output_dir, &config)?;

    println!("📂 Reading feedback sheets from: {}", config.data_directory);
    println!("🏫 Divisions: {}", config.divisions.join(", "));
    println!("📄 Output directory: {} (cleaned)", output_dir);

    let scanner = FeedbackScanner::new(
        DocxReader::new(config.include_tables),
        config.scan_group_mentions,
    );
    let mut aggregator = Aggregator::new();
    let stats = scanner.scan(
        Path::new(&config.data_directory),
        &config.divisions,
        &mut aggregator,
    )?;

    println!(
        "   ✅ Processed {} feedback files in {} courses",
        stats.files, stats.courses
    );
    if aggregator.skip_count() > 0 {
        println!("   ⚠️  Skipped {} items", aggregator.skip_count());
    }

    let report = aggregator.finalize();
    println!("\n{}", report::render(&report, &config));

    let json_path = Path::new(output_dir).join(&config.json_file);
    report::write_json(&report, &json_path)?;
    println!("💾 Results saved to: {}", json_path.display());

    if config.csv_export {
        let csv_path = Path::new(output_dir).join(UNIT_CSV_FILE);
        report::write_unit_csv(&report, &csv_path)?;
        println!("📊 Unit feedback table saved to: {}", csv_path.display());
    }

    info!(
        students = report.students().len(),
        courses = report.courses.len(),
        "analysis complete"
    );
    println!("\n✅ Analysis complete!");
    Ok(())
}

fn clean_output_directory(output_dir: &str, config: &Config) -> Result<()> {
    let output_path = Path::new(output_dir);

    if !output_path.exists() {
        return Ok(());
    }

    let artifacts = [config.json_file.as_str(), UNIT_CSV_FILE];
    for artifact in artifacts {
        let artifact_path = output_path.join(artifact);
        if artifact_path.is_file() {
            fs::remove_file(&artifact_path)
                .with_context(|| format!("Failed to remove {}", artifact_path.display()))?;
            println!("   🗑️  Removed previous result: {}", artifact);
        }
    }

    Ok(())
}
