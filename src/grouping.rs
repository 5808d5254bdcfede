use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

use crate::types::{CallKey, GenotypeRecord};

/// Which column of the calls table an identifier was matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentifierKind {
    /// The `SampleId` column
    SampleId,
    /// The `Filename` column, for pedigrees that name individuals by their calls file
    Filename,
}

impl IdentifierKind {
    /// Lookup precedence: sample ids are consulted before filenames.
    pub const LOOKUP_ORDER: [IdentifierKind; 2] = [IdentifierKind::SampleId, IdentifierKind::Filename];

    fn identifier<'r>(&self, record: &'r GenotypeRecord) -> &'r str {
        match self {
            IdentifierKind::SampleId => &record.sample_id,
            IdentifierKind::Filename => &record.filename,
        }
    }
}

/// Index of genotype records by (individual, locus, variant).
///
/// Every record with a genotype is reachable under two aliases, its `SampleId`
/// and its `Filename`, each kept in its own namespace. [`CallsIndex::get`]
/// tries the namespaces in [`IdentifierKind::LOOKUP_ORDER`].
pub struct CallsIndex<'a> {
    records: &'a [GenotypeRecord],
    by_sample_id: HashMap<CallKey, usize>,
    by_filename: HashMap<CallKey, usize>,
}

impl<'a> CallsIndex<'a> {
    pub fn build(records: &'a [GenotypeRecord]) -> Self {
        let mut index = Self {
            records,
            by_sample_id: HashMap::with_capacity(records.len()),
            by_filename: HashMap::with_capacity(records.len()),
        };

        for (i, record) in records.iter().enumerate() {
            if !record.has_genotype() {
                continue;
            }

            for kind in IdentifierKind::LOOKUP_ORDER {
                let key = CallKey::new(
                    kind.identifier(record),
                    record.locus_id.as_str(),
                    record.variant_id.as_str(),
                );
                if let Some(previous) = index.namespace_mut(kind).insert(key.clone(), i) {
                    warn!(
                        "{:?} alias {:?} is shared by rows {} and {}; using row {}",
                        kind,
                        key,
                        previous + 1,
                        i + 1,
                        i + 1
                    );
                }
            }
        }

        index
    }

    fn namespace(&self, kind: IdentifierKind) -> &HashMap<CallKey, usize> {
        match kind {
            IdentifierKind::SampleId => &self.by_sample_id,
            IdentifierKind::Filename => &self.by_filename,
        }
    }

    fn namespace_mut(&mut self, kind: IdentifierKind) -> &mut HashMap<CallKey, usize> {
        match kind {
            IdentifierKind::SampleId => &mut self.by_sample_id,
            IdentifierKind::Filename => &mut self.by_filename,
        }
    }

    /// Look up a record in one namespace only
    pub fn get_in(&self, kind: IdentifierKind, key: &CallKey) -> Option<&'a GenotypeRecord> {
        let records = self.records;
        self.namespace(kind).get(key).map(|&i| &records[i])
    }

    pub fn get(
        &self,
        individual: &str,
        locus_id: &str,
        variant_id: &str,
    ) -> Option<&'a GenotypeRecord> {
        let key = CallKey::new(individual, locus_id, variant_id);
        IdentifierKind::LOOKUP_ORDER
            .iter()
            .find_map(|&kind| self.get_in(kind, &key))
    }

    /// Number of index entries across both namespaces
    pub fn len(&self) -> usize {
        self.by_sample_id.len() + self.by_filename.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A proband call together with the calls of both parents at the same locus/variant
#[derive(Debug, Clone, Copy)]
pub struct Trio<'a> {
    pub proband: &'a GenotypeRecord,
    pub father: &'a GenotypeRecord,
    pub mother: &'a GenotypeRecord,
}

/// Output of [`group_by_trio`]
#[derive(Debug, Default)]
pub struct TrioGrouping<'a> {
    pub trios: Vec<Trio<'a>>,
    /// Trio candidates that are missing a parent's genotype
    pub non_trio: Vec<&'a GenotypeRecord>,
    /// Distinct (proband, father, mother) triples among `trios`
    pub trio_count: usize,
}

/// Match every proband with known parents to the parents' calls.
///
/// `records` must already carry pedigree parents (see `parsers::join_pedigree`).
pub fn group_by_trio(records: &[GenotypeRecord]) -> TrioGrouping<'_> {
    info!("Caching paternal & maternal genotypes");
    let index = CallsIndex::build(records);

    info!("{} total rows", records.len());
    let candidates: Vec<&GenotypeRecord> =
        records.iter().filter(|r| r.is_trio_candidate()).collect();
    info!(
        "{} rows remaining after filtering to rows that represent full trios",
        candidates.len()
    );

    let mut grouping = TrioGrouping::default();
    let mut trio_ids = HashSet::new();

    for proband in candidates {
        let father_id = proband.father_id().unwrap_or_default();
        let mother_id = proband.mother_id().unwrap_or_default();

        let father = index.get(father_id, &proband.locus_id, &proband.variant_id);
        let mother = index.get(mother_id, &proband.locus_id, &proband.variant_id);

        match (father, mother) {
            (Some(father), Some(mother)) if proband.has_genotype() => {
                trio_ids.insert((
                    proband.sample_id.as_str(),
                    father.sample_id.as_str(),
                    mother.sample_id.as_str(),
                ));
                grouping.trios.push(Trio {
                    proband,
                    father,
                    mother,
                });
            }
            (father, mother) => {
                let missing: Vec<&str> = [
                    (!proband.has_genotype()).then_some("proband genotype"),
                    father.is_none().then_some("father genotype"),
                    mother.is_none().then_some("mother genotype"),
                ]
                .into_iter()
                .flatten()
                .collect();

                warn!(
                    "Skipping {} (father: {}, mother: {}) {} because table is missing the {}",
                    proband.sample_id,
                    father_id,
                    mother_id,
                    proband.variant_id,
                    missing.join(" and ")
                );
                grouping.non_trio.push(proband);
            }
        }
    }

    grouping.trio_count = trio_ids.len();
    info!(
        "Processed {} calls in {} trios",
        grouping.trios.len(),
        grouping.trio_count
    );

    grouping
}
