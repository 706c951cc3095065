//src/assign.rs

use std::collections::BTreeMap;

use ahash::AHashMap;

use crate::config::{AssignConfig, AssignMode, FallbackPolicy};
use crate::hits::HitTable;
use crate::taxdb::TaxonomyTree;
use crate::types::{Assignment, Hit, QueryOutcome, Rank, Taxon};

/// Slack for comparing a support fraction against its threshold, so that
/// e.g. 9 equal votes out of 10 still meet a 0.9 threshold.
pub const SUPPORT_EPSILON: f64 = 1e-9;

/// Vote mass per taxon, per assignment rank.
pub type RankVotes = BTreeMap<Rank, AHashMap<u32, f64>>;

/// Runs the weighted vote against a fixed tree and configuration.
///
/// Holds only shared references, so one assigner can be used from many
/// worker threads at once.
pub struct ConsensusAssigner<'a> {
    tree: &'a TaxonomyTree,
    config: &'a AssignConfig,
}

impl<'a> ConsensusAssigner<'a> {
    pub fn new(tree: &'a TaxonomyTree, config: &'a AssignConfig) -> Self {
        Self { tree, config }
    }

    pub fn assign(&self, query_id: &str, hits: &[Hit]) -> QueryOutcome {
        assign_query(query_id, hits, self.tree, self.config)
    }

    /// Assign every query of the table, in table order, on the calling thread.
    pub fn assign_table(&self, table: &HitTable) -> Vec<QueryOutcome> {
        table
            .iter()
            .map(|(query_id, hits)| self.assign(query_id, hits))
            .collect()
    }
}

/// A hit that survived resolution, with the taxon it votes from.
struct Voter<'h> {
    hit: &'h Hit,
    taxon_id: u32,
}

/// Assign one query.
///
/// 1. Resolve each hit's taxon; unresolvable hits are dropped.
/// 2. Keep the hits within the score window of the best resolved hit. This
///    is not `HitTable::best_score`: a hit with an unknown taxon never sets
///    the window, so it cannot push resolvable hits out of the vote.
/// 3. Each retained hit adds its bit score to every ancestor that sits on an
///    assignment rank.
/// 4. Walk the ranks from most to least specific and accept the first whose
///    leading taxon reaches the rank's threshold. A hit taxon on no
///    assignment rank (a strain without rank, say) below the accepted taxon
///    wins instead when it alone reaches the leaf threshold.
/// 5. Otherwise apply the fallback policy.
pub fn assign_query(
    query_id: &str,
    hits: &[Hit],
    tree: &TaxonomyTree,
    config: &AssignConfig,
) -> QueryOutcome {
    // 1. Resolution
    let mut unknown_taxa = Vec::new();
    let mut voters: Vec<Voter> = Vec::with_capacity(hits.len());
    for hit in hits {
        match tree.resolve(hit.taxon_id) {
            Ok(taxon_id) => voters.push(Voter { hit, taxon_id }),
            Err(e) => {
                log::debug!("Query {query_id}: dropping hit to {}: {e}", hit.subject_id);
                unknown_taxa.push(hit.taxon_id);
            }
        }
    }

    let mut outcome = QueryOutcome {
        assignment: Assignment::unclassified(query_id, 0.0),
        hits_total: hits.len(),
        hits_used: 0,
        hits_outside_window: 0,
        unknown_taxa,
        retained: Vec::new(),
    };

    // 2. Score window
    let best = voters.iter().map(|v| v.hit.bit_score).reduce(f64::max);
    let Some(best) = best else {
        return outcome;
    };
    let floor = best * config.score_window;
    let before = voters.len();
    voters.retain(|v| v.hit.bit_score >= floor);
    outcome.hits_outside_window = before - voters.len();
    outcome.hits_used = voters.len();
    outcome.retained = voters.iter().map(|v| (v.taxon_id, v.hit.bit_score)).collect();

    // 3. Weights. All-zero scores fall back to one vote per hit.
    let raw_total: f64 = voters.iter().map(|v| v.hit.bit_score).sum();
    let uniform = raw_total <= 0.0;
    let weight = |hit: &Hit| if uniform { 1.0 } else { hit.bit_score };
    let total = if uniform { voters.len() as f64 } else { raw_total };

    outcome.assignment = match config.mode {
        AssignMode::RankVote => rank_vote(query_id, &voters, &weight, total, tree, config),
        AssignMode::Lca | AssignMode::RankLca => lca_assignment(query_id, &voters, tree, config),
    };

    log::debug!(
        "Query {query_id}: {} -> taxon {} ({}) support {:.4}",
        outcome.hits_used,
        outcome.assignment.taxon_id,
        outcome.assignment.rank,
        outcome.assignment.support
    );
    outcome
}

/// The part of a voter's ancestor path it is allowed to vote on.
fn voting_path<'t>(voter: &Voter, tree: &'t TaxonomyTree, config: &AssignConfig) -> Vec<&'t Taxon> {
    let path = match tree.ancestors(voter.taxon_id) {
        Ok(path) => path,
        Err(_) => return Vec::new(),
    };
    match config.identity_ceiling(voter.hit.identity) {
        None => path,
        Some(ceiling) => path
            .into_iter()
            .skip_while(|t| t.rank.level().map_or(true, |level| level >= ceiling))
            .collect(),
    }
}

/// Accumulate each voter's weight on every ancestor at an assignment rank.
fn tally_votes<F>(voters: &[Voter], weight: &F, tree: &TaxonomyTree, config: &AssignConfig) -> RankVotes
where
    F: Fn(&Hit) -> f64,
{
    let mut votes = RankVotes::new();
    for voter in voters {
        let w = weight(voter.hit);
        for taxon in voting_path(voter, tree, config) {
            if config.rank_thresholds.contains_key(&taxon.rank) {
                *votes
                    .entry(taxon.rank)
                    .or_default()
                    .entry(taxon.id)
                    .or_insert(0.0) += w;
            }
        }
    }
    votes
}

/// The taxon with the most mass at one rank.
///
/// Ties go to a taxon that is an ancestor of the other, then to the smaller
/// id. Candidates are visited in id order so the result does not depend on
/// hash order.
fn leading_taxon(tally: &AHashMap<u32, f64>, total: f64, tree: &TaxonomyTree) -> Option<(u32, f64)> {
    let mut candidates: Vec<(u32, f64)> = tally.iter().map(|(&id, &mass)| (id, mass)).collect();
    candidates.sort_by_key(|&(id, _)| id);

    let tolerance = SUPPORT_EPSILON * total.max(1.0);
    let mut leader: Option<(u32, f64)> = None;
    for (id, mass) in candidates {
        leader = match leader {
            None => Some((id, mass)),
            Some((best_id, best_mass)) => {
                if mass > best_mass + tolerance {
                    Some((id, mass))
                } else if (mass - best_mass).abs() <= tolerance && tree.is_ancestor(id, best_id) {
                    Some((id, mass))
                } else {
                    Some((best_id, best_mass))
                }
            }
        };
    }
    leader
}

fn rank_vote<F>(
    query_id: &str,
    voters: &[Voter],
    weight: &F,
    total: f64,
    tree: &TaxonomyTree,
    config: &AssignConfig,
) -> Assignment
where
    F: Fn(&Hit) -> f64,
{
    let votes = tally_votes(voters, weight, tree, config);
    let leaf = leaf_candidate(voters, weight, total, tree, config);

    let mut best_support = leaf.map_or(0.0, |(_, support)| support);
    for rank in config.ranks_most_specific_first() {
        let Some(tally) = votes.get(&rank) else {
            continue;
        };
        let Some((taxon_id, mass)) = leading_taxon(tally, total, tree) else {
            continue;
        };
        let support = (mass / total).min(1.0);
        best_support = best_support.max(support);

        let threshold = config.threshold(rank).unwrap_or(1.0);
        if support + SUPPORT_EPSILON >= threshold {
            if let Some((leaf_id, leaf_support)) = leaf {
                if tree.is_ancestor(taxon_id, leaf_id) {
                    return leaf_assignment(query_id, leaf_id, leaf_support, tree);
                }
            }
            return Assignment {
                query_id: query_id.to_string(),
                taxon_id,
                rank,
                support,
            };
        }
    }

    // Only reachable when the leaf has no ranked ancestor at all.
    if let Some((leaf_id, leaf_support)) = leaf {
        return leaf_assignment(query_id, leaf_id, leaf_support, tree);
    }

    match config.fallback {
        FallbackPolicy::Unclassified => Assignment::unclassified(query_id, best_support),
        FallbackPolicy::CommonAncestor => {
            let effective = voters.iter().filter_map(|v| effective_taxon(v, tree, config));
            match tree.lca_of(effective) {
                Ok(Some(taxon_id)) => Assignment {
                    query_id: query_id.to_string(),
                    taxon_id,
                    rank: tree.rank_of(taxon_id).unwrap_or(Rank::NoRank),
                    support: best_support,
                },
                _ => Assignment::unclassified(query_id, best_support),
            }
        }
    }
}

/// The leading hit taxon among those on no assignment rank, if it reaches
/// the leaf threshold. A voter only counts when its identity allows it to be
/// placed at its own taxon.
fn leaf_candidate<F>(
    voters: &[Voter],
    weight: &F,
    total: f64,
    tree: &TaxonomyTree,
    config: &AssignConfig,
) -> Option<(u32, f64)>
where
    F: Fn(&Hit) -> f64,
{
    let mut tally: AHashMap<u32, f64> = AHashMap::new();
    for voter in voters {
        let Some(taxon) = tree.get(voter.taxon_id) else {
            continue;
        };
        if config.rank_thresholds.contains_key(&taxon.rank) || taxon.rank == Rank::Root {
            continue;
        }
        if effective_taxon(voter, tree, config) != Some(voter.taxon_id) {
            continue;
        }
        *tally.entry(voter.taxon_id).or_insert(0.0) += weight(voter.hit);
    }
    let (taxon_id, mass) = leading_taxon(&tally, total, tree)?;
    let support = (mass / total).min(1.0);
    (support + SUPPORT_EPSILON >= config.leaf_threshold()).then_some((taxon_id, support))
}

fn leaf_assignment(query_id: &str, taxon_id: u32, support: f64, tree: &TaxonomyTree) -> Assignment {
    Assignment {
        query_id: query_id.to_string(),
        taxon_id,
        rank: tree.rank_of(taxon_id).unwrap_or(Rank::NoRank),
        support,
    }
}

/// The most specific taxon a voter may be placed at.
fn effective_taxon(voter: &Voter, tree: &TaxonomyTree, config: &AssignConfig) -> Option<u32> {
    voting_path(voter, tree, config).first().map(|t| t.id)
}

/// Plain LCA of every retained hit. All retained mass reaches the LCA, so
/// support is 1 whenever there is anything to assign.
fn lca_assignment(
    query_id: &str,
    voters: &[Voter],
    tree: &TaxonomyTree,
    config: &AssignConfig,
) -> Assignment {
    let effective = voters.iter().filter_map(|v| effective_taxon(v, tree, config));
    match tree.lca_of(effective) {
        Ok(Some(taxon_id)) => Assignment {
            query_id: query_id.to_string(),
            taxon_id,
            rank: tree.rank_of(taxon_id).unwrap_or(Rank::NoRank),
            support: 1.0,
        },
        _ => Assignment::unclassified(query_id, 0.0),
    }
}
