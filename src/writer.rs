// src/writer.rs

use std::io::{self, Write};

use crate::stats::TaxonCountRow;
use crate::taxdb::TaxonomyTree;
use crate::types::{Assignment, QueryOutcome, Rank, Taxon};

pub const UNCLASSIFIED_LABEL: &str = "Unclassified";

/// What the lineage table prints in each cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineageLabel {
    Names,
    Taxids,
}

/// Writes `query, taxid, rank, support`, one line per query, with a header.
pub fn write_assignments<W: Write>(w: &mut W, outcomes: &[QueryOutcome]) -> io::Result<()> {
    writeln!(w, "query\ttaxid\trank\tsupport")?;
    for outcome in outcomes {
        let a = &outcome.assignment;
        let rank = if a.is_classified() { a.rank.as_str() } else { "unclassified" };
        writeln!(w, "{}\t{}\t{}\t{:.4}", a.query_id, a.taxon_id, rank, a.support)?;
    }
    Ok(())
}

/// Writes one column per report rank with the assigned taxon's lineage.
///
/// A rank with no node on the lineage (more specific than the assignment, or
/// simply skipped by the taxonomy) prints `Unclassified.<label>` where label
/// is the closest ancestor above that rank.
pub fn write_lineages<W: Write>(
    w: &mut W,
    outcomes: &[QueryOutcome],
    tree: &TaxonomyTree,
    report_ranks: &[Rank],
    label: LineageLabel,
) -> io::Result<()> {
    write!(w, "query")?;
    for rank in report_ranks {
        write!(w, "\t{}", rank)?;
    }
    writeln!(w)?;

    for outcome in outcomes {
        let cells = lineage_cells(&outcome.assignment, tree, report_ranks, label);
        writeln!(w, "{}\t{}", outcome.assignment.query_id, cells.join("\t"))?;
    }
    Ok(())
}

/// The lineage cells of a single assignment.
pub fn lineage_cells(
    assignment: &Assignment,
    tree: &TaxonomyTree,
    report_ranks: &[Rank],
    label: LineageLabel,
) -> Vec<String> {
    let path = if assignment.is_classified() {
        tree.ancestors(assignment.taxon_id).unwrap_or_default()
    } else {
        Vec::new()
    };
    if path.is_empty() {
        return vec![UNCLASSIFIED_LABEL.to_string(); report_ranks.len()];
    }

    let show = |t: &Taxon| match label {
        LineageLabel::Names => t.name.clone(),
        LineageLabel::Taxids => t.id.to_string(),
    };

    report_ranks
        .iter()
        .map(|&rank| {
            if let Some(t) = path.iter().find(|t| t.rank == rank) {
                return show(*t);
            }
            let above = rank.level().and_then(|wanted| {
                path.iter()
                    .find(|t| t.rank.level().is_some_and(|level| level < wanted))
            });
            match above {
                Some(t) => format!("{}.{}", UNCLASSIFIED_LABEL, show(*t)),
                None => UNCLASSIFIED_LABEL.to_string(),
            }
        })
        .collect()
}

/// Writes a blobtools-compatible hits table: `query, taxid, bitscore` for
/// every hit that voted, without a header.
pub fn write_blobtools_hits<W: Write>(w: &mut W, outcomes: &[QueryOutcome]) -> io::Result<()> {
    for outcome in outcomes {
        for (taxon_id, bit_score) in &outcome.retained {
            writeln!(w, "{}\t{}\t{}", outcome.assignment.query_id, taxon_id, bit_score)?;
        }
    }
    Ok(())
}

/// Writes `taxid, rank, name, queries`, one line per assigned taxon.
pub fn write_taxon_counts<W: Write>(w: &mut W, rows: &[TaxonCountRow]) -> io::Result<()> {
    writeln!(w, "taxid\trank\tname\tqueries")?;
    for row in rows {
        writeln!(w, "{}\t{}\t{}\t{}", row.taxon_id, row.rank, row.name, row.queries)?;
    }
    Ok(())
}
