//! # Trio Mendelian Check
//!
//! Detects Mendelian inheritance violations in short tandem repeat (STR)
//! genotype calls across family trios (proband, father, mother).
//!
//! ## Features
//!
//! - Trio matching between a combined STR calls table and a PLINK .fam pedigree
//! - Exact-allele consistency with minimum repeat-count distance
//! - Confidence-interval overlap consistency with minimum interval distance
//! - Hemizygous (single allele) calls accepted from either parent
//! - Per-locus violation summaries and a TSV result table

pub mod analysis;
pub mod error;
pub mod grouping;
pub mod interval;
pub mod output;
pub mod parsers;
pub mod types;

// Re-export key types
pub use analysis::{evaluate, Assignment, MendelianChecker, MendelianReport, ViolationTally};
pub use error::TrioError;
pub use grouping::{group_by_trio, CallsIndex, IdentifierKind, Trio, TrioGrouping};
pub use interval::{min_distance, min_distance_ci, overlaps, Interval};
pub use output::{ReportGenerator, RunSummary};
pub use parsers::{join_pedigree, CallsTable, CallsTableParser, FamParser};
pub use types::*;
