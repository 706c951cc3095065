//src/taxid_map.rs

use std::io::BufRead;
use std::path::Path;

use ahash::AHashMap;

use crate::error::HitsError;
use crate::input::open_lines;

/// Accession (or any subject id) -> taxon id.
pub type TaxidMap = AHashMap<String, u32>;

/// Reads an accession to taxid map.
///
/// Two layouts are accepted:
/// ```text
/// <accession>\t<taxid>
/// accession\taccession.version\ttaxid\tgi      (NCBI accession2taxid)
/// ```
/// In the NCBI layout both the bare and the versioned accession are indexed.
/// A header line starting with `accession` is skipped.
pub fn read_taxid_map<P: AsRef<Path>>(path: P) -> Result<TaxidMap, HitsError> {
    let path = path.as_ref();
    let io_err = |source| HitsError::Io { path: path.to_path_buf(), source };
    let reader = open_lines(path).map_err(io_err)?;

    let mut map = TaxidMap::new();
    for (n, line_result) in reader.lines().enumerate() {
        let line = line_result.map_err(io_err)?;
        let line = line.trim_end();
        if line.is_empty() || (n == 0 && line.starts_with("accession")) {
            continue;
        }
        let fields: Vec<&str> = line.split('\t').collect();
        let (accessions, taxid_field): (&[&str], &str) = match fields.len() {
            2 | 3 => (&fields[..1], fields[1]),
            len if len >= 4 => (&fields[..2], fields[2]),
            _ => {
                return Err(HitsError::Parse {
                    path: path.to_path_buf(),
                    line: n + 1,
                    message: "expected <accession>\\t<taxid>".to_string(),
                })
            }
        };
        let taxid: u32 = taxid_field.trim().parse().map_err(|_| HitsError::Parse {
            path: path.to_path_buf(),
            line: n + 1,
            message: format!("invalid taxid '{}'", taxid_field.trim()),
        })?;
        for acc in accessions {
            map.insert(acc.trim().to_string(), taxid);
        }
    }

    log::info!("Loaded {} accession mappings from {}", map.len(), path.display());
    Ok(map)
}

/// Find the taxon for a subject id, retrying without a `.N` version suffix.
pub fn lookup_subject(map: &TaxidMap, subject_id: &str) -> Option<u32> {
    if let Some(&taxid) = map.get(subject_id) {
        return Some(taxid);
    }
    let (bare, version) = subject_id.rsplit_once('.')?;
    if !version.is_empty() && version.bytes().all(|b| b.is_ascii_digit()) {
        map.get(bare).copied()
    } else {
        None
    }
}
