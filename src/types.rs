use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TrioError;

lazy_static! {
    static ref REFERENCE_REGION: Regex =
        Regex::new(r"^\s*([^:\s]+):([0-9,]+)-([0-9,]+)\s*$").expect("valid regex");
}

/// Only an empty field counts as missing. PLINK's `0` is an ordinary id here,
/// so founders stay trio candidates and fall through to the non-trio rows.
pub fn is_missing_id(id: &str) -> bool {
    id.trim().is_empty()
}

/// Read support counts reported by the STR caller for one sample at one locus
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadSupport {
    pub num_spanning_reads: u64,
    pub num_flanking_reads: u64,
    pub num_inrepeat_reads: u64,
    pub num_alleles_supported_by_spanning_reads: u64,
    pub num_alleles_supported_by_flanking_reads: u64,
    pub num_alleles_supported_by_inrepeat_reads: u64,
}

impl ReadSupport {
    /// Allele support summed over spanning, flanking and in-repeat reads
    pub fn total_allele_support(&self) -> u64 {
        self.num_alleles_supported_by_spanning_reads
            + self.num_alleles_supported_by_flanking_reads
            + self.num_alleles_supported_by_inrepeat_reads
    }
}

/// Father and mother identifiers of an individual, taken from the pedigree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Parents {
    pub father_id: String,
    pub mother_id: String,
}

impl Parents {
    /// Both parents are known, so the individual can head a trio.
    pub fn is_complete(&self) -> bool {
        !is_missing_id(&self.father_id) && !is_missing_id(&self.mother_id)
    }
}

/// One STR genotype call: a sample at a locus/variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenotypeRecord {
    pub sample_id: String,
    pub locus_id: String,
    pub variant_id: String,
    pub filename: String,
    /// Allele repeat counts joined by `/`, e.g. `"17/20"` or `"15"`
    pub genotype: String,
    /// Per-allele `low-high` intervals joined by `/`
    pub genotype_ci: String,
    pub reference_region: String,
    pub repeat_unit: String,
    pub sex: String,
    pub num_repeats_allele2: String,
    pub coverage: f64,
    /// `Coverage` exactly as it appeared in the calls table
    pub coverage_text: String,
    pub read_support: Option<ReadSupport>,
    /// Filled in by the pedigree join; `None` when the sample isn't in the pedigree
    pub parents: Option<Parents>,
}

impl GenotypeRecord {
    pub fn has_genotype(&self) -> bool {
        !self.genotype.trim().is_empty()
    }

    pub fn father_id(&self) -> Option<&str> {
        self.parents.as_ref().map(|p| p.father_id.as_str())
    }

    pub fn mother_id(&self) -> Option<&str> {
        self.parents.as_ref().map(|p| p.mother_id.as_str())
    }

    pub fn is_trio_candidate(&self) -> bool {
        self.parents.as_ref().map(Parents::is_complete).unwrap_or(false)
    }

    /// Column names matching [`GenotypeRecord::to_record`]
    pub fn header(include_read_support: bool) -> Vec<&'static str> {
        let mut header = vec![
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

        if include_read_support {
            header.extend([
                "NumSpanningReads",
                "NumFlankingReads",
                "NumInrepeatReads",
                "NumAllelesSupportedBySpanningReads",
                "NumAllelesSupportedByFlankingReads",
                "NumAllelesSupportedByInrepeatReads",
            ]);
        }

        header.extend(["father_id", "mother_id"]);
        header
    }

    pub fn to_record(&self, include_read_support: bool) -> Vec<String> {
        let mut record = vec![
            self.sample_id.clone(),
            self.locus_id.clone(),
            self.variant_id.clone(),
            self.filename.clone(),
            self.genotype.clone(),
            self.genotype_ci.clone(),
            self.reference_region.clone(),
            self.repeat_unit.clone(),
            self.sex.clone(),
            self.num_repeats_allele2.clone(),
            self.coverage_text.clone(),
        ];

        if include_read_support {
            match &self.read_support {
                Some(rs) => record.extend([
                    rs.num_spanning_reads.to_string(),
                    rs.num_flanking_reads.to_string(),
                    rs.num_inrepeat_reads.to_string(),
                    rs.num_alleles_supported_by_spanning_reads.to_string(),
                    rs.num_alleles_supported_by_flanking_reads.to_string(),
                    rs.num_alleles_supported_by_inrepeat_reads.to_string(),
                ]),
                None => record.extend(std::iter::repeat(String::new()).take(6)),
            }
        }

        record.push(self.father_id().unwrap_or_default().to_string());
        record.push(self.mother_id().unwrap_or_default().to_string());
        record
    }
}

/// One row of a pedigree (.fam) file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PedigreeRecord {
    pub family_id: String,
    pub individual_id: String,
    pub father_id: String,
    pub mother_id: String,
    pub sex: String,
    pub phenotype: String,
}

impl PedigreeRecord {
    pub fn parents(&self) -> Parents {
        Parents {
            father_id: self.father_id.clone(),
            mother_id: self.mother_id.clone(),
        }
    }
}

/// Key of the calls index: one individual at one locus/variant
#[derive(Debug, Clone, Hash, Eq, PartialEq, PartialOrd, Ord)]
pub struct CallKey {
    pub individual: String,
    pub locus_id: String,
    pub variant_id: String,
}

impl CallKey {
    pub fn new(
        individual: impl Into<String>,
        locus_id: impl Into<String>,
        variant_id: impl Into<String>,
    ) -> Self {
        Self {
            individual: individual.into(),
            locus_id: locus_id.into(),
            variant_id: variant_id.into(),
        }
    }
}

/// Reference coordinates of a repeat, `chrom:start-end` with a 0-based start
#[derive(Debug, Clone, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRegion {
    pub chromosome: String,
    pub start: u64,
    pub end: u64,
}

impl ReferenceRegion {
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromStr for ReferenceRegion {
    type Err = TrioError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || TrioError::MalformedField {
            field: "ReferenceRegion",
            value: s.to_string(),
        };

        let caps = REFERENCE_REGION.captures(s).ok_or_else(malformed)?;
        let position = |i: usize| -> Result<u64, TrioError> {
            caps[i].replace(',', "").parse().map_err(|_| malformed())
        };

        Ok(ReferenceRegion {
            chromosome: caps[1].to_string(),
            start: position(2)?,
            end: position(3)?,
        })
    }
}

impl fmt::Display for ReferenceRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}-{}", self.chromosome, self.start, self.end)
    }
}

/// Three-way classification of a trio-locus evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationSummary {
    /// Consistent by exact alleles and by confidence intervals
    Consistent,
    /// Exact alleles inconsistent, confidence intervals still overlap
    ExactViolation,
    /// Inconsistent even when confidence intervals are allowed to overlap
    CiViolation,
}

impl ViolationSummary {
    pub fn classify(is_violation: bool, is_violation_ci: bool) -> Self {
        if is_violation_ci {
            ViolationSummary::CiViolation
        } else if is_violation {
            ViolationSummary::ExactViolation
        } else {
            ViolationSummary::Consistent
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ViolationSummary::Consistent => "ok",
            ViolationSummary::ExactViolation => "MV",
            ViolationSummary::CiViolation => "MV-CI!",
        }
    }
}

impl fmt::Display for ViolationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mendelian check of one trio at one locus/variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationResult {
    /// `"<LocusId> (<VariantId>)"`
    pub locus_id: String,
    pub reference_region: String,
    pub variant_id: String,
    pub repeat_unit: String,
    pub repeat_unit_length: usize,

    pub is_mendelian_violation: bool,
    pub is_mendelian_violation_ci: bool,
    pub distance: i64,
    pub distance_ci: i64,
    pub summary: ViolationSummary,

    pub proband_genotype: String,
    pub proband_genotype_ci: String,
    pub proband_genotype_ci_size: i64,
    pub father_genotype: String,
    pub father_genotype_ci: String,
    pub mother_genotype: String,
    pub mother_genotype_ci: String,

    pub all_genotypes_are_the_same: bool,
    pub all_genotypes_are_homozygous_reference: bool,

    pub proband_sample_id: String,
    pub father_sample_id: String,
    pub mother_sample_id: String,
    pub proband_sex: String,

    pub proband_num_repeats_allele2: String,
    pub father_num_repeats_allele2: String,
    pub mother_num_repeats_allele2: String,

    pub proband_coverage: f64,
    pub father_coverage: f64,
    pub mother_coverage: f64,
    pub min_coverage: f64,

    pub mendelian_results_string: String,
    pub mendelian_ci_results_string: String,

    pub proband_read_support: Option<ReadSupport>,
    pub father_read_support: Option<ReadSupport>,
    pub mother_read_support: Option<ReadSupport>,
}

impl ViolationResult {
    /// Column names matching [`ViolationResult::to_record`]
    pub fn header(include_read_support: bool) -> Vec<&'static str> {
        let mut header = vec![
            "LocusId",
            "ReferenceRegion",
            "VariantId",
            "RepeatUnit",
            "RepeatUnitLength",
            "IsMendelianViolation",
            "IsMendelianViolationCI",
            "MendelianViolationDistance",
            "MendelianViolationDistanceCI",
            "MendelianViolationSummary",
            "ProbandGenotype",
            "ProbandGenotypeCI",
            "ProbandGenotypeCI_size",
            "FatherGenotype",
            "FatherGenotypeCI",
            "MotherGenotype",
            "MotherGenotypeCI",
            "AllGenotypesAreTheSame",
            "AllGenotypesAreHomozygousReference",
            "ProbandSampleId",
            "FatherSampleId",
            "MotherSampleId",
            "ProbandSex",
            "ProbandNumRepeatsAllele2",
            "FatherNumRepeatsAllele2",
            "MotherNumRepeatsAllele2",
            "ProbandCoverage",
            "FatherCoverage",
            "MotherCoverage",
            "MinCoverage",
            "mendelian_results_string",
            "mendelian_ci_results_string",
        ];

        if include_read_support {
            header.extend([
                "ProbandNumSpanningReads",
                "ProbandNumFlankingReads",
                "ProbandNumInrepeatReads",
                // Each role's last column holds the allele support summed over all read types
                "ProbandNumAllelesSupportedBySpanningReads",
                "FatherNumSpanningReads",
                "FatherNumFlankingReads",
                "FatherNumInrepeatReads",
                "FatherNumAllelesSupportedByFlankingReads",
                "MotherNumSpanningReads",
                "MotherNumFlankingReads",
                "MotherNumInrepeatReads",
                "MotherNumAllelesSupportedByInrepeatReads",
            ]);
        }

        header
    }

    pub fn to_record(&self, include_read_support: bool) -> Vec<String> {
        let mut record = vec![
            self.locus_id.clone(),
            self.reference_region.clone(),
            self.variant_id.clone(),
            self.repeat_unit.clone(),
            self.repeat_unit_length.to_string(),
            format_bool(self.is_mendelian_violation),
            format_bool(self.is_mendelian_violation_ci),
            self.distance.to_string(),
            self.distance_ci.to_string(),
            self.summary.to_string(),
            self.proband_genotype.clone(),
            self.proband_genotype_ci.clone(),
            self.proband_genotype_ci_size.to_string(),
            self.father_genotype.clone(),
            self.father_genotype_ci.clone(),
            self.mother_genotype.clone(),
            self.mother_genotype_ci.clone(),
            format_bool(self.all_genotypes_are_the_same),
            format_bool(self.all_genotypes_are_homozygous_reference),
            self.proband_sample_id.clone(),
            self.father_sample_id.clone(),
            self.mother_sample_id.clone(),
            self.proband_sex.clone(),
            self.proband_num_repeats_allele2.clone(),
            self.father_num_repeats_allele2.clone(),
            self.mother_num_repeats_allele2.clone(),
            self.proband_coverage.to_string(),
            self.father_coverage.to_string(),
            self.mother_coverage.to_string(),
            self.min_coverage.to_string(),
            self.mendelian_results_string.clone(),
            self.mendelian_ci_results_string.clone(),
        ];

        if include_read_support {
            for support in [
                &self.proband_read_support,
                &self.father_read_support,
                &self.mother_read_support,
            ] {
                match support {
                    Some(rs) => record.extend([
                        rs.num_spanning_reads.to_string(),
                        rs.num_flanking_reads.to_string(),
                        rs.num_inrepeat_reads.to_string(),
                        rs.total_allele_support().to_string(),
                    ]),
                    None => record.extend(std::iter::repeat(String::new()).take(4)),
                }
            }
        }

        record
    }
}

fn format_bool(value: bool) -> String {
    let text = if value { "True" } else { "False" };
    text.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_region_parsing() {
        let region: ReferenceRegion = "chr4:3,074,876-3,074,933".parse().unwrap();
        assert_eq!(region.chromosome, "chr4");
        assert_eq!(region.start, 3_074_876);
        assert_eq!(region.end, 3_074_933);
        assert_eq!(region.len(), 57);

        assert!("chrX:100".parse::<ReferenceRegion>().is_err());
        assert!("100-200".parse::<ReferenceRegion>().is_err());
    }

    #[test]
    fn test_missing_parent_ids() {
        assert!(is_missing_id(""));
        assert!(is_missing_id("  "));
        assert!(!is_missing_id("0"));
        assert!(!is_missing_id("."));
        assert!(!is_missing_id("NA12891"));

        let parents = Parents {
            father_id: "dad".to_string(),
            mother_id: "0".to_string(),
        };
        assert!(parents.is_complete());

        let parents = Parents {
            father_id: "dad".to_string(),
            mother_id: String::new(),
        };
        assert!(!parents.is_complete());
    }

    #[test]
    fn test_total_allele_support() {
        let rs = ReadSupport {
            num_alleles_supported_by_spanning_reads: 2,
            num_alleles_supported_by_flanking_reads: 1,
            num_alleles_supported_by_inrepeat_reads: 0,
            ..Default::default()
        };
        assert_eq!(rs.total_allele_support(), 3);
    }
}
