use std::collections::{HashMap, HashSet};
use std::io::BufRead;
use std::path::Path;
use tracing::{error, info};

use crate::error::TrioError;
use crate::parsers::open_file;
use crate::types::PedigreeRecord;

/// Parser for PLINK-style .fam pedigree files
///
/// Columns: FamilyID IndividualID PaternalID MaternalID Sex Phenotype.
/// Sex and phenotype may be omitted.
pub struct FamParser;

impl FamParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse(&self, path: &Path) -> Result<Vec<PedigreeRecord>, TrioError> {
        let reader = open_file(path)?;
        let records = self.parse_lines(reader)?;
        let records = dedup_records(records);

        check_for_duplicate_individuals(&records, path)?;

        info!("Parsed {} individuals from {}", records.len(), path.display());
        Ok(records)
    }

    fn parse_lines(&self, reader: impl BufRead) -> Result<Vec<PedigreeRecord>, TrioError> {
        let mut records = Vec::new();

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let parts: Vec<&str> = trimmed.split_whitespace().collect();
            if parts.len() < 4 {
                return Err(TrioError::InvalidLine {
                    line: i + 1,
                    details: format!("expected at least 4 columns, found {}", parts.len()),
                });
            }

            let field = |idx: usize| parts.get(idx).copied().unwrap_or_default().to_string();

            records.push(PedigreeRecord {
                family_id: field(0),
                individual_id: field(1),
                father_id: field(2),
                mother_id: field(3),
                sex: field(4),
                phenotype: field(5),
            });
        }

        Ok(records)
    }
}

impl Default for FamParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Drop rows that repeat an (individual, father, mother) triple, keeping the first.
fn dedup_records(records: Vec<PedigreeRecord>) -> Vec<PedigreeRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| {
            seen.insert((
                r.individual_id.clone(),
                r.father_id.clone(),
                r.mother_id.clone(),
            ))
        })
        .collect()
}

fn check_for_duplicate_individuals(
    records: &[PedigreeRecord],
    path: &Path,
) -> Result<(), TrioError> {
    let mut seen: HashMap<&str, &PedigreeRecord> = HashMap::new();
    let mut duplicates = 0;

    for record in records {
        if let Some(first) = seen.get(record.individual_id.as_str()) {
            duplicates += 1;
            error!("Duplicate individual id: {}", record.individual_id);
            error!("{:?}", first);
            error!("{:?}", record);
        } else {
            seen.insert(record.individual_id.as_str(), record);
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_fam_file() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("family.fam");
        fs::write(
            &path,
            "# family 1\nF1 kid dad mom 2 2\nF1 dad 0 0 1 1\n\nF1\tmom\t0\t0\t2\t1\n",
        )?;

        let records = FamParser::new().parse(&path)?;
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].individual_id, "kid");
        assert_eq!(records[0].father_id, "dad");
        assert_eq!(records[0].mother_id, "mom");
        assert_eq!(records[2].family_id, "F1");
        assert_eq!(records[2].sex, "2");

        Ok(())
    }

    #[test]
    fn test_repeated_rows_are_collapsed() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("family.fam");
        fs::write(&path, "F1 kid dad mom 2 2\nF1 kid dad mom 2 -9\n")?;

        let records = FamParser::new().parse(&path)?;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].phenotype, "2");

        Ok(())
    }

    #[test]
    fn test_conflicting_parents_are_fatal() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("family.fam");
        fs::write(&path, "F1 kid dad mom 2 2\nF1 kid dad other_mom 2 2\n")?;

        let err = FamParser::new().parse(&path).unwrap_err();
        assert!(matches!(err, TrioError::DuplicateKeys { count: 1, .. }));

        Ok(())
    }

    #[test]
    fn test_short_line_is_fatal() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("family.fam");
        fs::write(&path, "F1 kid dad mom\nF1 dad\n")?;

        let err = FamParser::new().parse(&path).unwrap_err();
        assert!(matches!(err, TrioError::InvalidLine { line: 2, .. }));

        Ok(())
    }
}
