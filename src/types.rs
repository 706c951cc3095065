//src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

/// Taxon id used for the unclassified sentinel. NCBI never hands out 0.
pub const UNCLASSIFIED_TAXID: u32 = 0;

/// Taxonomic rank of a node.
///
/// Only the ranks that can take part in assignment are spelled out; every
/// other rank string in a taxonomy snapshot ("clade", "tribe", "no rank", ...)
/// is folded into `NoRank`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rank {
    Root,
    Domain,
    Superkingdom,
    Kingdom,
    Phylum,
    Class,
    Order,
    Family,
    Genus,
    Species,
    Subspecies,
    Strain,
    NoRank,
}

impl Rank {
    /// Depth of the rank below the root. Larger is more specific.
    /// `NoRank` has no level and never takes part in rank promotion.
    pub fn level(self) -> Option<u8> {
        match self {
            Rank::Root => Some(0),
            Rank::Domain | Rank::Superkingdom => Some(1),
            Rank::Kingdom => Some(2),
            Rank::Phylum => Some(3),
            Rank::Class => Some(4),
            Rank::Order => Some(5),
            Rank::Family => Some(6),
            Rank::Genus => Some(7),
            Rank::Species => Some(8),
            Rank::Subspecies => Some(9),
            Rank::Strain => Some(10),
            Rank::NoRank => None,
        }
    }

    /// True if `self` sits strictly below `other` in the hierarchy.
    pub fn is_more_specific_than(self, other: Rank) -> bool {
        match (self.level(), other.level()) {
            (Some(a), Some(b)) => a > b,
            _ => false,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rank::Root => "root",
            Rank::Domain => "domain",
            Rank::Superkingdom => "superkingdom",
            Rank::Kingdom => "kingdom",
            Rank::Phylum => "phylum",
            Rank::Class => "class",
            Rank::Order => "order",
            Rank::Family => "family",
            Rank::Genus => "genus",
            Rank::Species => "species",
            Rank::Subspecies => "subspecies",
            Rank::Strain => "strain",
            Rank::NoRank => "no rank",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rank {
    type Err = std::convert::Infallible;

    /// Never fails: unknown rank names map to `NoRank`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rank = match s.trim().to_ascii_lowercase().as_str() {
            "root" => Rank::Root,
            "domain" => Rank::Domain,
            "superkingdom" => Rank::Superkingdom,
            "kingdom" => Rank::Kingdom,
            "phylum" => Rank::Phylum,
            "class" => Rank::Class,
            "order" => Rank::Order,
            "family" => Rank::Family,
            "genus" => Rank::Genus,
            "species" => Rank::Species,
            "subspecies" => Rank::Subspecies,
            "strain" => Rank::Strain,
            _ => Rank::NoRank,
        };
        Ok(rank)
    }
}

impl<'de> Deserialize<'de> for Rank {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(s.parse().unwrap_or(Rank::NoRank))
    }
}

/// One node of the taxonomy. The parent is stored as an id, not a reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Taxon {
    pub id: u32,
    pub parent_id: u32,
    pub rank: Rank,
    pub name: String,
}

/// A single search hit whose subject has been mapped to a taxon id.
/// The taxon id is raw: it may still be a merged alias.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub query_id: String,
    pub subject_id: String,
    pub bit_score: f64,
    pub taxon_id: u32,
    /// Percent identity (0-100), when the search output carries it.
    pub identity: Option<f32>,
    pub evalue: Option<f64>,
}

impl Hit {
    pub fn new(query_id: &str, subject_id: &str, bit_score: f64, taxon_id: u32) -> Self {
        Self {
            query_id: query_id.to_string(),
            subject_id: subject_id.to_string(),
            bit_score,
            taxon_id,
            identity: None,
            evalue: None,
        }
    }

    pub fn with_identity(mut self, identity: f32) -> Self {
        self.identity = Some(identity);
        self
    }
}

/// The label given to one query.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub query_id: String,
    pub taxon_id: u32,
    pub rank: Rank,
    /// Fraction of the retained vote mass backing `taxon_id`, in [0, 1].
    pub support: f64,
}

impl Assignment {
    /// The sentinel for queries where no rank met its threshold.
    pub fn unclassified(query_id: &str, support: f64) -> Self {
        Self {
            query_id: query_id.to_string(),
            taxon_id: UNCLASSIFIED_TAXID,
            rank: Rank::NoRank,
            support,
        }
    }

    pub fn is_classified(&self) -> bool {
        self.taxon_id != UNCLASSIFIED_TAXID
    }
}

/// The assignment for a query plus the bookkeeping of what was left out.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOutcome {
    pub assignment: Assignment,
    /// Hits the query had in the table.
    pub hits_total: usize,
    /// Hits that actually voted.
    pub hits_used: usize,
    /// Hits dropped by the score window.
    pub hits_outside_window: usize,
    /// Raw taxon ids that could not be resolved, one entry per dropped hit.
    pub unknown_taxa: Vec<u32>,
    /// `(taxon id, bit score)` of every hit that voted, in input order.
    pub retained: Vec<(u32, f64)>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_parsing_folds_unknown_names() {
        assert_eq!("Species".parse::<Rank>().unwrap(), Rank::Species);
        assert_eq!("superkingdom".parse::<Rank>().unwrap(), Rank::Superkingdom);
        assert_eq!("domain".parse::<Rank>().unwrap(), Rank::Domain);
        assert_eq!("clade".parse::<Rank>().unwrap(), Rank::NoRank);
        assert_eq!("no rank".parse::<Rank>().unwrap(), Rank::NoRank);
    }

    #[test]
    fn test_rank_specificity() {
        assert!(Rank::Species.is_more_specific_than(Rank::Genus));
        assert!(!Rank::Phylum.is_more_specific_than(Rank::Family));
        assert!(!Rank::NoRank.is_more_specific_than(Rank::Root));
        assert!(!Rank::Genus.is_more_specific_than(Rank::NoRank));
    }

    #[test]
    fn test_unclassified_sentinel() {
        let a = Assignment::unclassified("q1", 0.0);
        assert!(!a.is_classified());
        assert_eq!(a.taxon_id, UNCLASSIFIED_TAXID);
        assert_eq!(a.rank, Rank::NoRank);
    }
}
