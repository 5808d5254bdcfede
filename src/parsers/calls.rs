use csv::ReaderBuilder;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{error, info};

use crate::error::TrioError;
use crate::parsers::open_file;
use crate::types::{GenotypeRecord, ReadSupport};

/// Columns every calls table must have
pub const BASIC_INPUT_COLUMNS: [&str; 11] = [
    "SampleId",
    "LocusId",
    "VariantId",
    "Filename",
    "Genotype",
    "GenotypeConfidenceInterval",
    "ReferenceRegion",
    "RepeatUnit",
    "Sex",
    "Num Repeats: Allele 2",
    "Coverage",
];

/// Read support columns, used only when all of them are present
pub const READ_SUPPORT_COLUMNS: [&str; 6] = [
    "NumSpanningReads",
    "NumFlankingReads",
    "NumInrepeatReads",
    "NumAllelesSupportedBySpanningReads",
    "NumAllelesSupportedByFlankingReads",
    "NumAllelesSupportedByInrepeatReads",
];

#[derive(Debug, Deserialize)]
struct CallsRow {
    #[serde(rename = "SampleId")]
    sample_id: String,
    #[serde(rename = "LocusId")]
    locus_id: String,
    #[serde(rename = "VariantId")]
    variant_id: String,
    #[serde(rename = "Filename")]
    filename: String,
    #[serde(rename = "Genotype")]
    genotype: String,
    #[serde(rename = "GenotypeConfidenceInterval")]
    genotype_ci: String,
    #[serde(rename = "ReferenceRegion")]
    reference_region: String,
    #[serde(rename = "RepeatUnit")]
    repeat_unit: String,
    #[serde(rename = "Sex")]
    sex: String,
    #[serde(rename = "Num Repeats: Allele 2")]
    num_repeats_allele2: String,
    #[serde(rename = "Coverage")]
    coverage: String,

    #[serde(rename = "NumSpanningReads", default)]
    num_spanning_reads: Option<u64>,
    #[serde(rename = "NumFlankingReads", default)]
    num_flanking_reads: Option<u64>,
    #[serde(rename = "NumInrepeatReads", default)]
    num_inrepeat_reads: Option<u64>,
    #[serde(rename = "NumAllelesSupportedBySpanningReads", default)]
    num_alleles_supported_by_spanning_reads: Option<u64>,
    #[serde(rename = "NumAllelesSupportedByFlankingReads", default)]
    num_alleles_supported_by_flanking_reads: Option<u64>,
    #[serde(rename = "NumAllelesSupportedByInrepeatReads", default)]
    num_alleles_supported_by_inrepeat_reads: Option<u64>,
}

impl CallsRow {
    fn read_support(&self) -> Option<ReadSupport> {
        Some(ReadSupport {
            num_spanning_reads: self.num_spanning_reads?,
            num_flanking_reads: self.num_flanking_reads?,
            num_inrepeat_reads: self.num_inrepeat_reads?,
            num_alleles_supported_by_spanning_reads: self.num_alleles_supported_by_spanning_reads?,
            num_alleles_supported_by_flanking_reads: self.num_alleles_supported_by_flanking_reads?,
            num_alleles_supported_by_inrepeat_reads: self.num_alleles_supported_by_inrepeat_reads?,
        })
    }

    fn into_record(self, include_read_support: bool) -> Result<GenotypeRecord, TrioError> {
        let read_support = if include_read_support {
            self.read_support()
        } else {
            None
        };
        let coverage = self
            .coverage
            .trim()
            .parse::<f64>()
            .map_err(|_| TrioError::MalformedField {
                field: "Coverage",
                value: self.coverage.clone(),
            })?;

        Ok(GenotypeRecord {
            sample_id: self.sample_id,
            locus_id: self.locus_id,
            variant_id: self.variant_id,
            filename: self.filename,
            genotype: self.genotype,
            genotype_ci: self.genotype_ci,
            reference_region: self.reference_region,
            repeat_unit: self.repeat_unit,
            sex: self.sex,
            num_repeats_allele2: self.num_repeats_allele2,
            coverage,
            coverage_text: self.coverage,
            read_support,
            parents: None,
        })
    }
}

/// Genotype calls for every sample, as loaded from the combined calls table
#[derive(Debug, Clone, Default)]
pub struct CallsTable {
    pub records: Vec<GenotypeRecord>,
    /// All read support columns were present in the input
    pub has_read_support: bool,
}

/// Parser for the tab-separated STR calls table
pub struct CallsTableParser;

impl CallsTableParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, path: &Path) -> Result<CallsTable, TrioError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(true)
            .from_reader(open_file(path)?);

        let headers = reader.headers()?.clone();
        for column in BASIC_INPUT_COLUMNS {
            if !headers.iter().any(|h| h == column) {
                return Err(TrioError::MissingColumn {
                    column: column.to_string(),
                    path: path.display().to_string(),
                });
            }
        }

        let has_read_support = READ_SUPPORT_COLUMNS
            .iter()
            .all(|column| headers.iter().any(|h| h == *column));

        let mut records = Vec::new();
        for row in reader.deserialize() {
            let row: CallsRow = row?;
            records.push(row.into_record(has_read_support)?);
        }

        check_for_duplicate_keys(&records, path)?;

        info!("Parsed {} rows from {}", records.len(), path.display());

        Ok(CallsTable {
            records,
            has_read_support,
        })
    }
}

impl Default for CallsTableParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Each (Filename, SampleId, LocusId, VariantId) may occur only once.
fn check_for_duplicate_keys(records: &[GenotypeRecord], path: &Path) -> Result<(), TrioError> {
    let mut seen: HashMap<(&str, &str, &str, &str), usize> = HashMap::new();
    let mut duplicates = 0;

    for record in records {
        let key = (
            record.filename.as_str(),
            record.sample_id.as_str(),
            record.locus_id.as_str(),
            record.variant_id.as_str(),
        );
        let count = seen.entry(key).or_insert(0);
        *count += 1;
        if *count > 1 {
            duplicates += 1;
            error!("Duplicate key: {:?}", key);
            error!("{:?}", record);
        }
    }

    if duplicates > 0 {
        return Err(TrioError::DuplicateKeys {
            count: duplicates,
            path: path.display().to_string(),
        });
    }

    Ok(())
}
