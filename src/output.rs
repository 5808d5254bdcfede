use anyhow::{Context, Result};
use chrono::Local;
use console::style;
use csv::WriterBuilder;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::to_string_pretty;
use std::fs;
use std::path::{Path, PathBuf};

use crate::analysis::{MendelianReport, ViolationTally};
use crate::types::*;

lazy_static! {
    static ref TSV_SUFFIX: Regex = Regex::new(r"\.tsv(\.gz)?$").expect("valid regex");
}

pub const VIOLATIONS_SUFFIX: &str = "mendelian_violations.tsv";
pub const NON_TRIO_SUFFIX: &str = "non_trio_rows.tsv";

/// Output prefix for a calls table: its path without a trailing `.tsv` or `.tsv.gz`
pub fn default_output_prefix(calls_path: &Path) -> PathBuf {
    let path = calls_path.to_string_lossy();
    PathBuf::from(TSV_SUFFIX.replace(&path, "").into_owned())
}

/// Violation count of one locus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocusCount {
    pub locus: String,
    pub count: usize,
    pub percent_of_trio_rows: f64,
}

/// Machine-readable summary of a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub generated_at: String,
    pub calls_table: String,
    pub fam_file: String,
    pub total_rows: usize,
    pub trio_rows: usize,
    pub trio_count: usize,
    pub non_trio_rows: usize,
    pub exact_violations: Vec<LocusCount>,
    pub ci_violations: Vec<LocusCount>,
}

impl RunSummary {
    pub fn new(
        calls_table: &Path,
        fam_file: &Path,
        total_rows: usize,
        trio_count: usize,
        non_trio_rows: usize,
        report: &MendelianReport,
    ) -> Self {
        Self {
            generated_at: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            calls_table: calls_table.display().to_string(),
            fam_file: fam_file.display().to_string(),
            total_rows,
            trio_rows: report.trio_rows(),
            trio_count,
            non_trio_rows,
            exact_violations: locus_counts(&report.exact, report.trio_rows()),
            ci_violations: locus_counts(&report.ci, report.trio_rows()),
        }
    }
}

fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * count as f64 / total as f64
    }
}

pub fn locus_counts(tally: &ViolationTally, trio_rows: usize) -> Vec<LocusCount> {
    tally
        .counts_by_frequency()
        .into_iter()
        .map(|(locus, count)| LocusCount {
            locus: locus.to_string(),
            count,
            percent_of_trio_rows: percent(count, trio_rows),
        })
        .collect()
}

/// Per-locus summary lines, most frequent first, followed by the sorted diagnostics
pub fn summary_lines(tally: &ViolationTally, trio_rows: usize) -> Vec<String> {
    let mut lines: Vec<String> = tally
        .counts_by_frequency()
        .into_iter()
        .map(|(locus, count)| {
            format!(
                "{:5}  ({:.0}%) {}",
                count,
                percent(count, trio_rows),
                locus
            )
        })
        .collect();

    lines.extend(tally.sorted_details().into_iter().map(str::to_string));
    lines
}

/// Writes the violation and non-trio tables next to the input
pub struct ReportGenerator {
    prefix: PathBuf,
    include_read_support: bool,
}

impl ReportGenerator {
    pub fn new(prefix: &Path, include_read_support: bool) -> Self {
        Self {
            prefix: prefix.to_path_buf(),
            include_read_support,
        }
    }

    fn output_path(&self, suffix: &str) -> PathBuf {
        PathBuf::from(format!("{}.{}", self.prefix.display(), suffix))
    }

    pub fn violations_path(&self) -> PathBuf {
        self.output_path(VIOLATIONS_SUFFIX)
    }

    pub fn non_trio_path(&self) -> PathBuf {
        self.output_path(NON_TRIO_SUFFIX)
    }

    fn ensure_parent_dir(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create output directory {}", parent.display())
                })?;
            }
        }
        Ok(())
    }

    /// Write one row per evaluated trio-locus. Returns the number of rows written.
    pub fn write_violations(&self, results: &[ViolationResult]) -> Result<usize> {
        let path = self.violations_path();
        Self::ensure_parent_dir(&path)?;

        let mut wtr = WriterBuilder::new()
            .delimiter(b'\t')
            .from_path(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;

        wtr.write_record(ViolationResult::header(self.include_read_support))?;
        for result in results {
            wtr.write_record(result.to_record(self.include_read_support))?;
        }

        wtr.flush()?;
        Ok(results.len())
    }

    /// Write the calls that couldn't be placed in a complete trio
    pub fn write_non_trio(&self, records: &[&GenotypeRecord]) -> Result<usize> {
        let path = self.non_trio_path();
        Self::ensure_parent_dir(&path)?;

        let mut wtr = WriterBuilder::new()
            .delimiter(b'\t')
            .from_path(&path)
            .with_context(|| format!("Failed to create {}", path.display()))?;

        wtr.write_record(GenotypeRecord::header(self.include_read_support))?;
        for record in records {
            wtr.write_record(record.to_record(self.include_read_support))?;
        }

        wtr.flush()?;
        Ok(records.len())
    }

    pub fn write_json_summary(&self, path: &Path, summary: &RunSummary) -> Result<()> {
        Self::ensure_parent_dir(path)?;
        let json_content =
            to_string_pretty(summary).with_context(|| "Failed to serialize summary to JSON")?;

        fs::write(path, json_content)
            .with_context(|| format!("Failed to write JSON summary to {}", path.display()))?;

        Ok(())
    }
}

/// Print the per-locus tables and diagnostics for exact and CI violations
pub fn print_summary(report: &MendelianReport) {
    let sections = [
        ("Mendelian violations (exact genotypes)", &report.exact),
        ("Mendelian violations (confidence intervals)", &report.ci),
    ];

    for (title, tally) in sections {
        println!();
        println!(
            "{} {}",
            style(title).bold().cyan(),
            style(format!("{} of {} trio rows", tally.total(), report.trio_rows())).dim()
        );
        for line in summary_lines(tally, report.trio_rows()) {
            println!("{}", line);
        }
    }
}
