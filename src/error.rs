use thiserror::Error;

/// Fatal conditions that abort a run
#[derive(Error, Debug)]
pub enum TrioError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Missing required column '{column}' in {path}")]
    MissingColumn { column: String, path: String },

    #[error("Found {count} duplicate keys in {path}")]
    DuplicateKeys { count: usize, path: String },

    #[error("Invalid line format at line {line}: {details}")]
    InvalidLine { line: usize, details: String },

    #[error("Invalid {field} value: '{value}'")]
    MalformedField { field: &'static str, value: String },

    #[error("Expected 1 or 2 alleles in {role} genotype '{genotype}' ({sample_id} at {locus_id})")]
    AlleleCount {
        role: &'static str,
        genotype: String,
        sample_id: String,
        locus_id: String,
    },

    #[error(
        "Proband {sample_id} has {alleles} allele(s) but {intervals} confidence interval(s) at {locus_id}"
    )]
    IntervalCount {
        sample_id: String,
        locus_id: String,
        alleles: usize,
        intervals: usize,
    },

    #[error("No {role} values to compare against at {locus_id}")]
    EmptyComparison {
        role: &'static str,
        locus_id: String,
    },

    #[error("Mendelian-consistent trio with nonzero distance: {0}")]
    InvariantViolation(String),
}
