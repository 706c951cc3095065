// src/stats.rs

use std::collections::BTreeMap;
use std::fmt::Write as _;

use ahash::{AHashMap, AHashSet};

use crate::hits::HitParseStats;
use crate::taxdb::TaxonomyTree;
use crate::types::{QueryOutcome, Rank};

/// What happened to the queries and hits of one run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RunSummary {
    pub queries: usize,
    pub classified: usize,
    /// Queries assigned at each rank.
    pub by_rank: BTreeMap<Rank, usize>,
    pub hits_total: usize,
    pub hits_used: usize,
    pub hits_outside_window: usize,
    /// Hits dropped because their taxon is unknown or deleted.
    pub unknown_taxon_hits: usize,
    /// Distinct raw ids behind `unknown_taxon_hits`.
    pub unknown_taxa: usize,
    /// Parser counters, when the hits came from a file.
    pub parse: Option<HitParseStats>,
}

impl RunSummary {
    pub fn from_outcomes(outcomes: &[QueryOutcome], parse: Option<HitParseStats>) -> Self {
        let mut summary = RunSummary {
            parse,
            ..RunSummary::default()
        };
        let mut unknown: AHashSet<u32> = AHashSet::new();

        for outcome in outcomes {
            summary.queries += 1;
            if outcome.assignment.is_classified() {
                summary.classified += 1;
                *summary.by_rank.entry(outcome.assignment.rank).or_insert(0) += 1;
            }
            summary.hits_total += outcome.hits_total;
            summary.hits_used += outcome.hits_used;
            summary.hits_outside_window += outcome.hits_outside_window;
            summary.unknown_taxon_hits += outcome.unknown_taxa.len();
            unknown.extend(outcome.unknown_taxa.iter().copied());
        }
        summary.unknown_taxa = unknown.len();
        summary
    }

    pub fn unclassified(&self) -> usize {
        self.queries - self.classified
    }

    /// Surface dropped inputs at warn level so they are never silent.
    pub fn log(&self) {
        if let Some(parse) = &self.parse {
            if parse.unmapped_subjects > 0 {
                log::warn!("{} hit(s) had no subject -> taxon mapping", parse.unmapped_subjects);
            }
        }
        if self.unknown_taxon_hits > 0 {
            log::warn!(
                "{} hit(s) excluded from voting: {} distinct taxon id(s) not in the taxonomy",
                self.unknown_taxon_hits,
                self.unknown_taxa
            );
        }
        log::info!(
            "Assigned {} of {} queries ({} unclassified)",
            self.classified,
            self.queries,
            self.unclassified()
        );
    }

    /// Plain-text summary, one `key\tvalue` per line.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "queries\t{}", self.queries);
        let _ = writeln!(out, "classified\t{}", self.classified);
        let _ = writeln!(out, "unclassified\t{}", self.unclassified());
        for (rank, count) in &self.by_rank {
            let _ = writeln!(out, "rank:{}\t{}", rank, count);
        }
        let _ = writeln!(out, "hits_total\t{}", self.hits_total);
        let _ = writeln!(out, "hits_used\t{}", self.hits_used);
        let _ = writeln!(out, "hits_outside_window\t{}", self.hits_outside_window);
        let _ = writeln!(out, "hits_unknown_taxon\t{}", self.unknown_taxon_hits);
        if let Some(parse) = &self.parse {
            let _ = writeln!(out, "hits_unmapped_subject\t{}", parse.unmapped_subjects);
            let _ = writeln!(out, "hits_evalue_filtered\t{}", parse.evalue_filtered);
        }
        out
    }
}

/// One row of the per-taxon count table.
#[derive(Debug, Clone, PartialEq)]
pub struct TaxonCountRow {
    pub taxon_id: u32,
    pub rank: Rank,
    pub name: String,
    /// Queries assigned to exactly this taxon.
    pub queries: usize,
}

/// Queries per assigned taxon, most frequent first, ties by taxon id.
/// Unclassified queries are not counted.
pub fn taxon_counts(outcomes: &[QueryOutcome], tree: &TaxonomyTree) -> Vec<TaxonCountRow> {
    let mut counts: AHashMap<u32, usize> = AHashMap::new();
    for outcome in outcomes.iter().filter(|o| o.assignment.is_classified()) {
        *counts.entry(outcome.assignment.taxon_id).or_insert(0) += 1;
    }

    let mut rows: Vec<TaxonCountRow> = counts
        .into_iter()
        .map(|(taxon_id, queries)| TaxonCountRow {
            taxon_id,
            rank: tree.rank_of(taxon_id).unwrap_or(Rank::NoRank),
            name: tree.name_of(taxon_id).unwrap_or_default().to_string(),
            queries,
        })
        .collect();
    rows.sort_by(|a, b| b.queries.cmp(&a.queries).then(a.taxon_id.cmp(&b.taxon_id)));
    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxdb::sample_tree;
    use crate::types::Assignment;

    fn outcome(query: &str, taxon_id: u32, rank: Rank, unknown: Vec<u32>) -> QueryOutcome {
        let assignment = if taxon_id == 0 {
            Assignment::unclassified(query, 0.0)
        } else {
            Assignment { query_id: query.to_string(), taxon_id, rank, support: 1.0 }
        };
        QueryOutcome {
            assignment,
            hits_total: 2 + unknown.len(),
            hits_used: 2,
            hits_outside_window: 0,
            unknown_taxa: unknown,
            retained: vec![],
        }
    }

    #[test]
    fn test_summary_counts() {
        let outcomes = vec![
            outcome("q1", 100, Rank::Species, vec![]),
            outcome("q2", 50, Rank::Genus, vec![12345]),
            outcome("q3", 0, Rank::NoRank, vec![12345, 777]),
            outcome("q4", 100, Rank::Species, vec![]),
        ];
        let summary = RunSummary::from_outcomes(&outcomes, None);
        assert_eq!(summary.queries, 4);
        assert_eq!(summary.classified, 3);
        assert_eq!(summary.unclassified(), 1);
        assert_eq!(summary.by_rank[&Rank::Species], 2);
        assert_eq!(summary.unknown_taxon_hits, 3);
        assert_eq!(summary.unknown_taxa, 2);

        let text = summary.to_text();
        assert!(text.contains("rank:species\t2\n"));
        assert!(text.contains("hits_unknown_taxon\t3\n"));
    }

    #[test]
    fn test_taxon_counts_sorted() {
        let tree = sample_tree();
        let outcomes = vec![
            outcome("q1", 100, Rank::Species, vec![]),
            outcome("q2", 50, Rank::Genus, vec![]),
            outcome("q3", 100, Rank::Species, vec![]),
            outcome("q4", 0, Rank::NoRank, vec![]),
        ];
        let rows = taxon_counts(&outcomes, &tree);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].taxon_id, 100);
        assert_eq!(rows[0].queries, 2);
        assert_eq!(rows[0].name, "Escherichia coli");
        assert_eq!(rows[1].rank, Rank::Genus);
    }
}
