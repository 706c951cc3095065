//src/hits.rs

use std::fmt;
use std::io::BufRead;
use std::path::Path;
use std::str::FromStr;

use ahash::AHashMap;
use serde::Deserialize;

use crate::error::HitsError;
use crate::input::open_lines;
use crate::taxid_map::{lookup_subject, TaxidMap};
use crate::types::Hit;

/// Hits grouped per query, in the order queries were first seen.
#[derive(Debug, Default, Clone)]
pub struct HitTable {
    order: Vec<String>,
    groups: AHashMap<String, Vec<Hit>>,
}

impl HitTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hit to its query's group. Nothing is deduplicated.
    pub fn add(&mut self, hit: Hit) {
        match self.groups.get_mut(&hit.query_id) {
            Some(group) => group.push(hit),
            None => {
                self.order.push(hit.query_id.clone());
                self.groups.insert(hit.query_id.clone(), vec![hit]);
            }
        }
    }

    /// Record a query that may end up with no hits at all, so that it is
    /// still reported (as unclassified).
    pub fn register_query(&mut self, query_id: &str) {
        if !self.groups.contains_key(query_id) {
            self.order.push(query_id.to_string());
            self.groups.insert(query_id.to_string(), Vec::new());
        }
    }

    /// The query's hits in insertion order. Unknown queries have none.
    pub fn hits_for(&self, query_id: &str) -> &[Hit] {
        self.groups.get(query_id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn best_score(&self, query_id: &str) -> Option<f64> {
        best_score(self.hits_for(query_id))
    }

    pub fn query_ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// `(query_id, hits)` pairs in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Hit])> {
        self.order.iter().map(|q| (q.as_str(), self.hits_for(q)))
    }

    /// Number of queries.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn hit_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

/// Highest bit score in a slice of hits.
pub fn best_score(hits: &[Hit]) -> Option<f64> {
    hits.iter().map(|h| h.bit_score).reduce(f64::max)
}

/// Layout of the search output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HitFormat {
    /// Plain 12-column BLAST tabular; taxa come from the accession map.
    Blast,
    /// BLAST tabular with the subject taxon id(s) in a 13th column.
    #[default]
    Tango,
}

impl FromStr for HitFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "blast" => Ok(HitFormat::Blast),
            "tango" => Ok(HitFormat::Tango),
            other => Err(format!("unknown hit format '{other}' (expected blast or tango)")),
        }
    }
}

impl fmt::Display for HitFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HitFormat::Blast => f.write_str("blast"),
            HitFormat::Tango => f.write_str("tango"),
        }
    }
}

/// Counters for what the parser kept and dropped.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct HitParseStats {
    pub lines: usize,
    pub hits_kept: usize,
    /// Hits dropped because their subject has no taxon mapping.
    pub unmapped_subjects: usize,
    /// Hits dropped by the e-value cut-off.
    pub evalue_filtered: usize,
}

// BLAST outfmt 6 columns
const COL_QUERY: usize = 0;
const COL_SUBJECT: usize = 1;
const COL_PIDENT: usize = 2;
const COL_EVALUE: usize = 10;
const COL_BITSCORE: usize = 11;
const COL_TAXIDS: usize = 12;

/// Read search-tool tabular output into a `HitTable`.
///
/// Every query seen in the file is registered, even when all of its hits are
/// dropped, so it comes out as unclassified rather than disappearing.
pub fn read_hits<P: AsRef<Path>>(
    path: P,
    format: HitFormat,
    taxid_map: Option<&TaxidMap>,
    max_evalue: Option<f64>,
) -> Result<(HitTable, HitParseStats), HitsError> {
    let path = path.as_ref();
    let io_err = |source| HitsError::Io { path: path.to_path_buf(), source };
    let reader = open_lines(path).map_err(io_err)?;

    let mut table = HitTable::new();
    let mut stats = HitParseStats::default();

    for (n, line_result) in reader.lines().enumerate() {
        let line = line_result.map_err(io_err)?;
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        stats.lines += 1;

        let parse_err = |message: String| HitsError::Parse {
            path: path.to_path_buf(),
            line: n + 1,
            message,
        };

        let fields: Vec<&str> = line.split('\t').collect();
        if fields.len() <= COL_BITSCORE {
            return Err(parse_err(format!(
                "expected at least {} tab-separated columns, found {}",
                COL_BITSCORE + 1,
                fields.len()
            )));
        }

        let query_id = fields[COL_QUERY];
        let subject_id = fields[COL_SUBJECT];
        table.register_query(query_id);

        let bit_score: f64 = fields[COL_BITSCORE]
            .trim()
            .parse()
            .map_err(|_| parse_err(format!("invalid bit score '{}'", fields[COL_BITSCORE])))?;
        if !bit_score.is_finite() || bit_score < 0.0 {
            return Err(parse_err(format!("bit score must be finite and non-negative, got {bit_score}")));
        }
        let evalue: f64 = fields[COL_EVALUE]
            .trim()
            .parse()
            .map_err(|_| parse_err(format!("invalid e-value '{}'", fields[COL_EVALUE])))?;
        let identity: Option<f32> = fields[COL_PIDENT].trim().parse().ok();

        if let Some(max) = max_evalue {
            if evalue > max {
                stats.evalue_filtered += 1;
                continue;
            }
        }

        let embedded = match format {
            HitFormat::Tango => fields.get(COL_TAXIDS).and_then(|f| first_taxid(f)),
            HitFormat::Blast => None,
        };
        let taxon_id = embedded.or_else(|| taxid_map.and_then(|m| lookup_subject(m, subject_id)));

        let Some(taxon_id) = taxon_id else {
            log::debug!("No taxon mapping for subject {subject_id} (query {query_id})");
            stats.unmapped_subjects += 1;
            continue;
        };

        table.add(Hit {
            query_id: query_id.to_string(),
            subject_id: subject_id.to_string(),
            bit_score,
            taxon_id,
            identity,
            evalue: Some(evalue),
        });
        stats.hits_kept += 1;
    }

    if stats.unmapped_subjects > 0 {
        log::warn!(
            "{} hit(s) in {} dropped: subject has no taxon mapping",
            stats.unmapped_subjects,
            path.display()
        );
    }
    log::info!(
        "Read {} hits for {} queries from {} ({} above e-value cut-off)",
        stats.hits_kept,
        table.len(),
        path.display(),
        stats.evalue_filtered
    );
    Ok((table, stats))
}

/// First usable id of a `;`-separated taxid column. Empty and `0` mean none.
fn first_taxid(field: &str) -> Option<u32> {
    field
        .split(';')
        .filter_map(|t| t.trim().parse::<u32>().ok())
        .find(|&t| t != 0)
}
