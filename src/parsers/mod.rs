use flate2::read::MultiGzDecoder;
use std::collections::HashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use tracing::debug;

use crate::types::{GenotypeRecord, PedigreeRecord};

pub mod calls;
pub mod fam;

pub use calls::{CallsTable, CallsTableParser};
pub use fam::FamParser;

/// Open a plain or gzip-compressed text file
pub fn open_file(path: &Path) -> io::Result<Box<dyn BufRead>> {
    let file = File::open(path)?;

    if path.extension().map(|ext| ext == "gz").unwrap_or(false) {
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

/// Left-join pedigree parents onto the calls by `SampleId`.
///
/// Records whose sample isn't in the pedigree keep `parents == None`.
pub fn join_pedigree(records: &mut [GenotypeRecord], pedigree: &[PedigreeRecord]) {
    let by_individual: HashMap<&str, &PedigreeRecord> = pedigree
        .iter()
        .map(|p| (p.individual_id.as_str(), p))
        .collect();

    let mut joined = 0;
    for record in records.iter_mut() {
        record.parents = by_individual
            .get(record.sample_id.as_str())
            .map(|p| p.parents());
        if record.parents.is_some() {
            joined += 1;
        }
    }

    debug!(
        "Joined pedigree onto {} of {} genotype records",
        joined,
        records.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::{Read, Write};
    use tempfile::TempDir;

    #[test]
    fn test_open_gzipped_file() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("calls.tsv.gz");

        let mut encoder = GzEncoder::new(File::create(&path)?, Compression::default());
        writeln!(encoder, "SampleId\tLocusId")?;
        encoder.finish()?;

        let mut content = String::new();
        open_file(&path)?.read_to_string(&mut content)?;
        assert_eq!(content, "SampleId\tLocusId\n");

        Ok(())
    }
}
