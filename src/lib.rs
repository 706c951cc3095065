// src/lib.rs
pub mod assign;
pub mod config;
pub mod error;
pub mod hits;
pub mod input;
pub mod stats;
pub mod taxdb;
pub mod taxid_map;
pub mod types;
pub mod writer;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use rayon::prelude::*;

use crate::assign::assign_query;
use crate::config::AssignConfig;
use crate::error::Result;
use crate::hits::{read_hits, HitTable};
use crate::stats::{taxon_counts, RunSummary};
use crate::taxdb::{load_ncbi_dir, load_taxdb, TaxonomyTree};
use crate::taxid_map::read_taxid_map;
use crate::types::{Assignment, QueryOutcome};
use crate::writer::{
    write_assignments, write_blobtools_hits, write_lineages, write_taxon_counts, LineageLabel,
};

pub use crate::error::TangoError;

/// Where the taxonomy snapshot comes from.
#[derive(Debug, Clone)]
pub enum TaxonomySource {
    /// NCBI dump directory (`nodes.dmp`, optional `names.dmp`, `merged.dmp`, `delnodes.dmp`).
    NcbiDir(PathBuf),
    /// Tab-separated `taxid, parent, name, rank` file plus an optional merged table.
    TaxDb { path: PathBuf, merged: Option<PathBuf> },
}

impl TaxonomySource {
    pub fn load(&self) -> Result<TaxonomyTree> {
        let tree = match self {
            TaxonomySource::NcbiDir(dir) => load_ncbi_dir(dir)?,
            TaxonomySource::TaxDb { path, merged } => load_taxdb(path, merged.as_deref())?,
        };
        Ok(tree)
    }
}

/// Files consumed by one run.
#[derive(Debug, Clone)]
pub struct AssignInputs {
    pub taxonomy: TaxonomySource,
    pub hits: PathBuf,
    /// Subject accession -> taxid map. Required for the `blast` hit format.
    pub taxid_map: Option<PathBuf>,
}

/// Everything a run produced. Text outputs are generated on demand.
pub struct AssignmentResults {
    /// One outcome per query, in the order queries appear in the hit file.
    pub outcomes: Vec<QueryOutcome>,
    pub summary: RunSummary,
    pub tree: Arc<TaxonomyTree>,
    pub config: AssignConfig,
}

impl AssignmentResults {
    pub fn assignments(&self) -> impl Iterator<Item = &Assignment> {
        self.outcomes.iter().map(|o| &o.assignment)
    }

    /// `query, taxid, rank, support` table.
    pub fn get_assignment_output(&self) -> String {
        render(|buf| write_assignments(buf, &self.outcomes))
    }

    /// Lineage table with taxon names, one column per report rank.
    pub fn get_lineage_output(&self) -> String {
        self.lineage_output(LineageLabel::Names)
    }

    /// Lineage table with taxon ids, one column per report rank.
    pub fn get_taxid_lineage_output(&self) -> String {
        self.lineage_output(LineageLabel::Taxids)
    }

    /// `query, taxid, bitscore` per voting hit, readable by blobtools.
    pub fn get_blobtools_output(&self) -> String {
        render(|buf| write_blobtools_hits(buf, &self.outcomes))
    }

    /// Queries per assigned taxon, most frequent first.
    pub fn get_taxon_counts_output(&self) -> String {
        let rows = taxon_counts(&self.outcomes, &self.tree);
        render(|buf| write_taxon_counts(buf, &rows))
    }

    pub fn get_summary_text(&self) -> String {
        self.summary.to_text()
    }

    fn lineage_output(&self, label: LineageLabel) -> String {
        render(|buf| write_lineages(buf, &self.outcomes, &self.tree, &self.config.report_ranks, label))
    }
}

/// Run a writer against an in-memory buffer.
fn render<F>(f: F) -> String
where
    F: FnOnce(&mut Vec<u8>) -> io::Result<()>,
{
    let mut buf = Vec::new();
    // Writes into a Vec cannot fail.
    let _ = f(&mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

/// Assign every query of `table` on a pool of `config.threads` workers
/// (0 = one per core). The result keeps the table's query order.
pub fn assign_parallel(
    table: &HitTable,
    tree: &TaxonomyTree,
    config: &AssignConfig,
) -> Result<Vec<QueryOutcome>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.threads)
        .build()?;

    let queries: Vec<_> = table.iter().collect();
    let outcomes: Vec<QueryOutcome> = pool.install(|| {
        queries
            .par_iter()
            .map(|&(query_id, hits)| assign_query(query_id, hits, tree, config))
            .collect()
    });
    Ok(outcomes)
}

/// Unified entry point: load the taxonomy and hits, then assign every query.
pub fn assign_taxonomy(inputs: &AssignInputs, config: &AssignConfig) -> Result<AssignmentResults> {
    // 1. Reject bad thresholds before touching any input
    config.validate()?;

    // 2. Taxonomy, built once and shared read-only
    let tree = Arc::new(inputs.taxonomy.load()?);

    // 3. Hits, joined against the accession map when one is given
    let taxid_map = match &inputs.taxid_map {
        Some(path) => Some(read_taxid_map(path)?),
        None => None,
    };
    let (table, parse_stats) = read_hits(&inputs.hits, config.format, taxid_map.as_ref(), config.max_evalue)?;

    // 4. Assign
    let outcomes = assign_parallel(&table, &tree, config)?;

    // 5. Summarise
    let summary = RunSummary::from_outcomes(&outcomes, Some(parse_stats));
    summary.log();

    Ok(AssignmentResults {
        outcomes,
        summary,
        tree,
        config: config.clone(),
    })
}
