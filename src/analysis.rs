use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use crate::error::TrioError;
use crate::grouping::Trio;
use crate::interval::{min_distance, min_distance_ci, Interval};
use crate::types::*;

/// Something a proband can inherit from a parent: an exact allele length or a
/// confidence interval around one.
pub trait Inheritable: Sized {
    /// The proband value is explained by the parent value.
    fn matches(&self, parent: &Self) -> bool;

    /// Smallest distance to any of `parent`, `None` if `parent` is empty.
    fn min_distance_to(&self, parent: &[Self]) -> Option<i64>;

    fn matches_any(&self, parent: &[Self]) -> bool {
        parent.iter().any(|p| self.matches(p))
    }
}

impl Inheritable for i64 {
    fn matches(&self, parent: &Self) -> bool {
        self == parent
    }

    fn min_distance_to(&self, parent: &[Self]) -> Option<i64> {
        min_distance(*self, parent)
    }
}

impl Inheritable for Interval {
    fn matches(&self, parent: &Self) -> bool {
        self.overlaps(parent)
    }

    fn min_distance_to(&self, parent: &[Self]) -> Option<i64> {
        min_distance_ci(self, parent)
    }
}

/// Which proband allele is attributed to which parent in a diploid call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Assignment {
    /// First allele from the father, second from the mother
    Direct,
    /// Second allele from the father, first from the mother
    Swapped,
}

impl Assignment {
    pub const ALL: [Assignment; 2] = [Assignment::Direct, Assignment::Swapped];

    /// Returns (paternal, maternal) alleles under this assignment.
    pub fn split<'t, T>(&self, first: &'t T, second: &'t T) -> (&'t T, &'t T) {
        match self {
            Assignment::Direct => (first, second),
            Assignment::Swapped => (second, first),
        }
    }
}

/// Outcome of one inheritance test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Consistency {
    pub consistent: bool,
    /// Minimum total distance between the proband and what the parents could pass on
    pub distance: i64,
}

/// Test whether `proband` could have been inherited from `father` and `mother`.
///
/// A single proband allele (hemizygous call) may come from either parent. Two
/// alleles must be split one per parent under some [`Assignment`]. Returns
/// `None` if the proband has no or more than two values, or a parent has none.
pub fn evaluate<T: Inheritable>(proband: &[T], father: &[T], mother: &[T]) -> Option<Consistency> {
    match proband {
        // Either parent is accepted so pseudoautosomal loci aren't flagged
        [allele] => Some(Consistency {
            consistent: allele.matches_any(father) || allele.matches_any(mother),
            distance: allele
                .min_distance_to(father)?
                .min(allele.min_distance_to(mother)?),
        }),
        [first, second] => {
            let mut best: Option<Consistency> = None;
            for assignment in Assignment::ALL {
                let (paternal, maternal) = assignment.split(first, second);
                let outcome = Consistency {
                    consistent: paternal.matches_any(father) && maternal.matches_any(mother),
                    distance: paternal.min_distance_to(father)?
                        + maternal.min_distance_to(mother)?,
                };
                best = Some(match best {
                    None => outcome,
                    Some(best) => Consistency {
                        consistent: best.consistent || outcome.consistent,
                        distance: best.distance.min(outcome.distance),
                    },
                });
            }
            best
        }
        _ => None,
    }
}

/// Split a `/`-joined genotype into its one or two allele lengths
pub fn parse_alleles(record: &GenotypeRecord, role: &'static str) -> Result<Vec<i64>, TrioError> {
    let parts: Vec<&str> = record.genotype.split('/').collect();
    if !(1..=2).contains(&parts.len()) {
        return Err(TrioError::AlleleCount {
            role,
            genotype: record.genotype.clone(),
            sample_id: record.sample_id.clone(),
            locus_id: record.locus_id.clone(),
        });
    }

    parts
        .iter()
        .map(|allele| {
            allele.trim().parse().map_err(|_| TrioError::MalformedField {
                field: "Genotype",
                value: record.genotype.clone(),
            })
        })
        .collect()
}

/// Per-locus violation counts plus one diagnostic line per violation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ViolationTally {
    counts: BTreeMap<String, usize>,
    details: Vec<String>,
}

impl ViolationTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, locus: impl Into<String>, detail: impl Into<String>) {
        *self.counts.entry(locus.into()).or_insert(0) += 1;
        self.details.push(detail.into());
    }

    pub fn count(&self, locus: &str) -> usize {
        self.counts.get(locus).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Loci ordered by descending violation count, ties by name
    pub fn counts_by_frequency(&self) -> Vec<(&str, usize)> {
        let mut counts: Vec<(&str, usize)> =
            self.counts.iter().map(|(k, &v)| (k.as_str(), v)).collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        counts
    }

    pub fn sorted_details(&self) -> Vec<&str> {
        let mut details: Vec<&str> = self.details.iter().map(String::as_str).collect();
        details.sort_unstable();
        details
    }
}

/// Everything produced by a Mendelian check over all trios
#[derive(Debug, Clone, Default)]
pub struct MendelianReport {
    /// One row per trio-locus
    pub results: Vec<ViolationResult>,
    pub exact: ViolationTally,
    pub ci: ViolationTally,
}

impl MendelianReport {
    /// Number of trio-locus rows evaluated
    pub fn trio_rows(&self) -> usize {
        self.results.len()
    }

    pub fn violation_rows(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.is_mendelian_violation)
            .count()
    }

    pub fn violation_rows_ci(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.is_mendelian_violation_ci)
            .count()
    }
}

/// Scores trios for Mendelian violations by exact alleles and by confidence intervals
pub struct MendelianChecker;

impl MendelianChecker {
    pub fn new() -> Self {
        Self
    }

    pub fn check(&self, trios: &[Trio<'_>]) -> Result<MendelianReport, TrioError> {
        let mut report = MendelianReport::default();

        for trio in trios {
            let result = self.check_trio(trio, &mut report.exact, &mut report.ci)?;
            report.results.push(result);
        }

        debug!(
            "Checked {} trio rows: {} violations, {} by confidence interval",
            report.trio_rows(),
            report.exact.total(),
            report.ci.total()
        );

        Ok(report)
    }

    /// Evaluate one trio, recording any violation in `exact` and `ci`.
    pub fn check_trio(
        &self,
        trio: &Trio<'_>,
        exact: &mut ViolationTally,
        ci: &mut ViolationTally,
    ) -> Result<ViolationResult, TrioError> {
        let Trio {
            proband,
            father,
            mother,
        } = *trio;
        let locus_id = &proband.locus_id;

        let proband_alleles = parse_alleles(proband, "proband")?;
        let father_alleles = parse_alleles(father, "father")?;
        let mother_alleles = parse_alleles(mother, "mother")?;

        let proband_cis = Interval::parse_list(&proband.genotype_ci)?;
        let father_cis = Interval::parse_list(&father.genotype_ci)?;
        let mother_cis = Interval::parse_list(&mother.genotype_ci)?;

        if proband_cis.len() != proband_alleles.len() {
            return Err(TrioError::IntervalCount {
                sample_id: proband.sample_id.clone(),
                locus_id: locus_id.clone(),
                alleles: proband_alleles.len(),
                intervals: proband_cis.len(),
            });
        }

        let by_allele = evaluate(&proband_alleles, &father_alleles, &mother_alleles).ok_or_else(
            || TrioError::EmptyComparison {
                role: "parental allele",
                locus_id: locus_id.clone(),
            },
        )?;
        let by_ci = evaluate(&proband_cis, &father_cis, &mother_cis).ok_or_else(|| {
            TrioError::EmptyComparison {
                role: "parental confidence interval",
                locus_id: locus_id.clone(),
            }
        })?;

        let mendelian_results_string = format!(
            "{}  d:{}  ({} + {} => {}) {}  {}  {}",
            locus_id,
            by_allele.distance,
            father.genotype,
            mother.genotype,
            proband.genotype,
            proband.sample_id,
            father.sample_id,
            mother.sample_id
        );
        let mendelian_ci_results_string = format!(
            "{}   ({} + {} => {})  {}  {}  {}",
            locus_id,
            father.genotype_ci,
            mother.genotype_ci,
            proband.genotype_ci,
            proband.sample_id,
            father.sample_id,
            mother.sample_id
        );

        if by_allele.consistent && by_allele.distance != 0 {
            return Err(TrioError::InvariantViolation(mendelian_results_string));
        }

        let tally_key = format!("{} ({})", locus_id, proband.repeat_unit);
        if !by_allele.consistent {
            exact.record(tally_key.as_str(), mendelian_results_string.as_str());
        }
        if !by_ci.consistent {
            ci.record(tally_key.as_str(), mendelian_ci_results_string.as_str());
        }

        let reference_repeats = repeats_in_reference(proband)?;
        let is_homozygous_reference =
            |alleles: &[i64]| alleles.iter().all(|&a| a == reference_repeats);
        let all_genotypes_are_homozygous_reference = is_homozygous_reference(&proband_alleles)
            && is_homozygous_reference(&mother_alleles)
            && is_homozygous_reference(&father_alleles);

        let allele_set = |alleles: &[i64]| alleles.iter().copied().collect::<BTreeSet<i64>>();
        let all_genotypes_are_the_same = allele_set(&proband_alleles)
            == allele_set(&mother_alleles)
            && allele_set(&proband_alleles) == allele_set(&father_alleles);

        let proband_genotype_ci_size = proband_cis.last().map(Interval::length).unwrap_or(0);
        let min_coverage = proband
            .coverage
            .min(father.coverage)
            .min(mother.coverage);

        Ok(ViolationResult {
            locus_id: format!("{} ({})", locus_id, proband.variant_id),
            reference_region: proband.reference_region.clone(),
            variant_id: proband.variant_id.clone(),
            repeat_unit: proband.repeat_unit.clone(),
            repeat_unit_length: proband.repeat_unit.len(),
            is_mendelian_violation: !by_allele.consistent,
            is_mendelian_violation_ci: !by_ci.consistent,
            distance: by_allele.distance,
            distance_ci: by_ci.distance,
            summary: ViolationSummary::classify(!by_allele.consistent, !by_ci.consistent),
            proband_genotype: proband.genotype.clone(),
            proband_genotype_ci: proband.genotype_ci.clone(),
            proband_genotype_ci_size,
            father_genotype: father.genotype.clone(),
            father_genotype_ci: father.genotype_ci.clone(),
            mother_genotype: mother.genotype.clone(),
            mother_genotype_ci: mother.genotype_ci.clone(),
            all_genotypes_are_the_same,
            all_genotypes_are_homozygous_reference,
            proband_sample_id: proband.sample_id.clone(),
            father_sample_id: father.sample_id.clone(),
            mother_sample_id: mother.sample_id.clone(),
            proband_sex: proband.sex.clone(),
            proband_num_repeats_allele2: proband.num_repeats_allele2.clone(),
            father_num_repeats_allele2: father.num_repeats_allele2.clone(),
            mother_num_repeats_allele2: mother.num_repeats_allele2.clone(),
            proband_coverage: proband.coverage,
            father_coverage: father.coverage,
            mother_coverage: mother.coverage,
            min_coverage,
            mendelian_results_string,
            mendelian_ci_results_string,
            proband_read_support: proband.read_support,
            father_read_support: father.read_support,
            mother_read_support: mother.read_support,
        })
    }
}

impl Default for MendelianChecker {
    fn default() -> Self {
        Self::new()
    }
}

/// Repeat count of the reference allele. Truncates when the reference region
/// isn't a whole number of repeat units.
pub fn repeats_in_reference(record: &GenotypeRecord) -> Result<i64, TrioError> {
    let region: ReferenceRegion = record.reference_region.parse()?;
    let unit_length = record.repeat_unit.len() as u64;
    if unit_length == 0 {
        return Err(TrioError::MalformedField {
            field: "RepeatUnit",
            value: record.repeat_unit.clone(),
        });
    }

    if region.len() % unit_length != 0 {
        warn!(
            "{} is not a multiple of the repeat unit size ({})",
            record.reference_region, unit_length
        );
    }

    Ok((region.len() / unit_length) as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grouping::tests::record;

    fn check(
        proband: &GenotypeRecord,
        father: &GenotypeRecord,
        mother: &GenotypeRecord,
    ) -> Result<(ViolationResult, ViolationTally, ViolationTally), TrioError> {
        let trio = Trio {
            proband,
            father,
            mother,
        };
        let mut exact = ViolationTally::new();
        let mut ci = ViolationTally::new();
        let result = MendelianChecker::new().check_trio(&trio, &mut exact, &mut ci)?;
        Ok((result, exact, ci))
    }

    #[test]
    fn test_diploid_alleles_split_between_parents() {
        let outcome = evaluate::<i64>(&[17, 20], &[17, 17], &[20, 22]).unwrap();
        assert!(outcome.consistent);
        assert_eq!(outcome.distance, 0);

        // proband[1] from father, proband[0] from mother
        let outcome = evaluate::<i64>(&[20, 17], &[17, 17], &[20, 22]).unwrap();
        assert!(outcome.consistent);
        assert_eq!(outcome.distance, 0);
    }

    #[test]
    fn test_hemizygous_allele_from_either_parent() {
        let outcome = evaluate::<i64>(&[15], &[10, 10], &[15, 18]).unwrap();
        assert!(outcome.consistent);
        assert_eq!(outcome.distance, 0);

        let outcome = evaluate::<i64>(&[10], &[10], &[15, 18]).unwrap();
        assert!(outcome.consistent);

        let outcome = evaluate::<i64>(&[13], &[10], &[15, 18]).unwrap();
        assert!(!outcome.consistent);
        assert_eq!(outcome.distance, 2);
    }

    #[test]
    fn test_proband_matching_one_parent_exactly() {
        let outcome = evaluate::<i64>(&[12, 14], &[12, 14], &[14, 30]).unwrap();
        assert!(outcome.consistent);
        assert_eq!(outcome.distance, 0);

        let outcome = evaluate::<i64>(&[12, 14], &[40, 41], &[12, 14]).unwrap();
        assert!(!outcome.consistent);
    }

    #[test]
    fn test_both_alleles_from_one_parent_is_a_violation() {
        let outcome = evaluate::<i64>(&[17, 20], &[17, 20], &[25, 25]).unwrap();
        assert!(!outcome.consistent);
        // Direct: 0 + 5, Swapped: 0 + 8
        assert_eq!(outcome.distance, 5);
    }

    #[test]
    fn test_interval_evaluation() {
        let proband = [Interval::new(15, 17), Interval::new(21, 24)];
        let father = [Interval::new(10, 12), Interval::new(24, 26)];
        let mother = [Interval::new(17, 19)];

        let outcome = evaluate(&proband, &father, &mother).unwrap();
        assert!(outcome.consistent);
        assert_eq!(outcome.distance, 0);

        let mother = [Interval::new(30, 31)];
        let outcome = evaluate(&proband, &father, &mother).unwrap();
        assert!(!outcome.consistent);
        // Direct: 3 + 6, Swapped: 0 + 13
        assert_eq!(outcome.distance, 9);
    }

    #[test]
    fn test_evaluate_rejects_unsupported_shapes() {
        assert!(evaluate::<i64>(&[], &[1], &[1]).is_none());
        assert!(evaluate::<i64>(&[1, 2, 3], &[1], &[1]).is_none());
        assert!(evaluate::<i64>(&[1], &[], &[1]).is_none());
        assert!(evaluate::<i64>(&[1, 2], &[1], &[]).is_none());
    }

    #[test]
    fn test_assignment_split() {
        assert_eq!(Assignment::Direct.split(&1, &2), (&1, &2));
        assert_eq!(Assignment::Swapped.split(&1, &2), (&2, &1));
    }

    #[test]
    fn test_parse_alleles() {
        assert_eq!(parse_alleles(&record("kid", "HTT", "17/20", ""), "proband").unwrap(), vec![17, 20]);
        assert_eq!(parse_alleles(&record("kid", "AR", "15", ""), "proband").unwrap(), vec![15]);

        let err = parse_alleles(&record("kid", "HTT", "17/20/22", ""), "proband").unwrap_err();
        assert!(matches!(err, TrioError::AlleleCount { role: "proband", .. }));

        let err = parse_alleles(&record("kid", "HTT", "17/x", ""), "proband").unwrap_err();
        assert!(matches!(err, TrioError::MalformedField { field: "Genotype", .. }));
    }

    #[test]
    fn test_consistent_trio_result() -> Result<(), TrioError> {
        let proband = record("kid", "HTT", "17/20", "17-17/19-21");
        let father = record("dad", "HTT", "17/17", "16-18/17-17");
        let mother = record("mom", "HTT", "20/22", "20-20/22-23");

        let (result, exact, ci) = check(&proband, &father, &mother)?;
        assert!(!result.is_mendelian_violation);
        assert!(!result.is_mendelian_violation_ci);
        assert_eq!(result.distance, 0);
        assert_eq!(result.distance_ci, 0);
        assert_eq!(result.summary, ViolationSummary::Consistent);
        assert_eq!(result.locus_id, "HTT (HTT)");
        assert_eq!(result.repeat_unit_length, 3);
        assert_eq!(result.proband_genotype_ci_size, 2);
        assert!(!result.all_genotypes_are_the_same);
        assert!(exact.is_empty());
        assert!(ci.is_empty());

        Ok(())
    }

    #[test]
    fn test_exact_violation_within_confidence_intervals() -> Result<(), TrioError> {
        let proband = record("kid", "HTT", "17/21", "17-17/20-22");
        let father = record("dad", "HTT", "17/17", "17-17/17-17");
        let mother = record("mom", "HTT", "20/22", "19-20/22-23");

        let (result, exact, ci) = check(&proband, &father, &mother)?;
        assert!(result.is_mendelian_violation);
        assert!(!result.is_mendelian_violation_ci);
        assert_eq!(result.distance, 1);
        assert_eq!(result.summary, ViolationSummary::ExactViolation);
        assert_eq!(result.summary.as_str(), "MV");

        assert_eq!(exact.count("HTT (CAG)"), 1);
        assert_eq!(ci.total(), 0);
        assert_eq!(
            exact.sorted_details(),
            vec!["HTT  d:1  (17/17 + 20/22 => 17/21) kid  dad  mom"]
        );

        Ok(())
    }

    #[test]
    fn test_ci_violation() -> Result<(), TrioError> {
        let proband = record("kid", "HTT", "17/40", "17-17/38-42");
        let father = record("dad", "HTT", "17/17", "17-17/17-17");
        let mother = record("mom", "HTT", "20/22", "20-20/22-23");

        let (result, exact, ci) = check(&proband, &father, &mother)?;
        assert_eq!(result.summary.as_str(), "MV-CI!");
        assert_eq!(result.distance, 18);
        assert_eq!(result.distance_ci, 15);
        assert_eq!(
            ci.sorted_details(),
            vec!["HTT   (17-17/17-17 + 20-20/22-23 => 17-17/38-42)  kid  dad  mom"]
        );
        assert_eq!(exact.total(), 1);
        assert_eq!(ci.total(), 1);

        Ok(())
    }

    #[test]
    fn test_reference_flags() -> Result<(), TrioError> {
        // chr4:3074876-3074933 is 57 bp, 19 CAG repeats
        let proband = record("kid", "HTT", "19/19", "19-19/19-19");
        let father = record("dad", "HTT", "19/19", "19-19/19-19");
        let mother = record("mom", "HTT", "19", "19-19");

        let (result, _, _) = check(&proband, &father, &mother)?;
        assert!(result.all_genotypes_are_the_same);
        assert!(result.all_genotypes_are_homozygous_reference);

        Ok(())
    }

    #[test]
    fn test_repeats_in_reference_truncates() -> Result<(), TrioError> {
        let mut rec = record("kid", "HTT", "19/19", "19-19/19-19");
        assert_eq!(repeats_in_reference(&rec)?, 19);

        rec.reference_region = "chr4:100-158".to_string();
        assert_eq!(repeats_in_reference(&rec)?, 19);

        rec.repeat_unit = String::new();
        assert!(repeats_in_reference(&rec).is_err());

        Ok(())
    }

    #[test]
    fn test_interval_count_must_match_alleles() {
        let proband = record("kid", "HTT", "17/20", "17-17");
        let father = record("dad", "HTT", "17/17", "17-17/17-17");
        let mother = record("mom", "HTT", "20/22", "20-20/22-22");

        let err = check(&proband, &father, &mother).unwrap_err();
        assert!(matches!(err, TrioError::IntervalCount { alleles: 2, intervals: 1, .. }));
    }

    #[test]
    fn test_min_coverage() -> Result<(), TrioError> {
        let proband = record("kid", "HTT", "17/20", "17-17/20-20");
        let mut father = record("dad", "HTT", "17/17", "17-17/17-17");
        father.coverage = 12.5;
        let mother = record("mom", "HTT", "20/22", "20-20/22-22");

        let (result, _, _) = check(&proband, &father, &mother)?;
        assert_eq!(result.min_coverage, 12.5);

        Ok(())
    }

    #[test]
    fn test_tally_ordering() {
        let mut tally = ViolationTally::new();
        tally.record("B (CAG)", "b2");
        tally.record("A (CAG)", "a1");
        tally.record("B (CAG)", "b1");
        tally.record("C (GCC)", "c1");

        assert_eq!(
            tally.counts_by_frequency(),
            vec![("B (CAG)", 2), ("A (CAG)", 1), ("C (GCC)", 1)]
        );
        assert_eq!(tally.sorted_details(), vec!["a1", "b1", "b2", "c1"]);
        assert_eq!(tally.total(), 4);
    }

    #[test]
    fn test_report_tallies_match_violation_rows() -> Result<(), TrioError> {
        let father = record("dad", "HTT", "17/17", "17-17/17-17");
        let mother = record("mom", "HTT", "20/22", "20-20/22-22");
        let probands = [
            record("kid1", "HTT", "17/20", "17-17/20-20"),
            record("kid2", "HTT", "17/25", "17-17/25-25"),
            record("kid3", "HTT", "30/31", "30-30/31-31"),
        ];

        let trios: Vec<Trio> = probands
            .iter()
            .map(|proband| Trio {
                proband,
                father: &father,
                mother: &mother,
            })
            .collect();

        let report = MendelianChecker::new().check(&trios)?;
        assert_eq!(report.trio_rows(), 3);
        assert_eq!(report.violation_rows(), 2);
        assert_eq!(report.exact.total(), report.violation_rows());
        assert_eq!(report.ci.total(), report.violation_rows_ci());

        Ok(())
    }
}
