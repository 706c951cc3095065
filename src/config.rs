//src/config.rs

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use crate::error::ConfigError;
use crate::hits::HitFormat;
use crate::types::Rank;

/// How a query's label is chosen from its retained hits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignMode {
    /// Weighted vote with per-rank thresholds, most specific accepted rank wins.
    #[default]
    RankVote,
    /// Lowest common ancestor of all retained hits.
    Lca,
    /// LCA of the retained hits, each lifted to the most specific rank its
    /// percent identity qualifies for. Without explicit identity thresholds
    /// the `rank_lca_identity_thresholds` preset applies.
    RankLca,
}

impl FromStr for AssignMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rank_vote" | "vote" => Ok(AssignMode::RankVote),
            "lca" => Ok(AssignMode::Lca),
            "rank_lca" => Ok(AssignMode::RankLca),
            other => Err(format!("unknown mode '{other}' (expected rank_vote, rank_lca or lca)")),
        }
    }
}

/// What a query gets when no rank reaches its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// The unclassified sentinel.
    #[default]
    Unclassified,
    /// The lowest common ancestor of every retained hit.
    CommonAncestor,
}

impl FromStr for FallbackPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unclassified" => Ok(FallbackPolicy::Unclassified),
            "common_ancestor" | "lca" => Ok(FallbackPolicy::CommonAncestor),
            other => Err(format!("unknown fallback '{other}' (expected unclassified or common_ancestor)")),
        }
    }
}

/// Options for one assignment run.
///
/// Every field has a default, so a TOML file only needs the keys it changes:
/// ```toml
/// score_window = 0.9
/// fallback = "common_ancestor"
///
/// [rank_thresholds]
/// species = 0.8
/// genus = 0.6
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssignConfig {
    pub mode: AssignMode,
    /// Keep hits scoring at least `best * score_window`.
    pub score_window: f64,
    /// Minimum vote fraction per rank. The keys are the assignment ranks.
    pub rank_thresholds: BTreeMap<Rank, f64>,
    /// Minimum vote fraction for a hit's own taxon when its rank is not an
    /// assignment rank (e.g. a `no rank` strain node). Defaults to the
    /// strictest rank threshold.
    pub leaf_threshold: Option<f64>,
    /// Minimum percent identity for a hit to vote at a rank.
    pub identity_thresholds: BTreeMap<Rank, f32>,
    pub fallback: FallbackPolicy,
    /// Worker threads; 0 uses every core.
    pub threads: usize,
    /// Hits with a larger e-value are dropped while parsing.
    pub max_evalue: Option<f64>,
    pub format: HitFormat,
    /// Columns of the lineage output.
    pub report_ranks: Vec<Rank>,
}

impl Default for AssignConfig {
    fn default() -> Self {
        Self {
            mode: AssignMode::RankVote,
            score_window: 0.95,
            rank_thresholds: default_rank_thresholds(),
            leaf_threshold: None,
            identity_thresholds: BTreeMap::new(),
            fallback: FallbackPolicy::Unclassified,
            threads: 0,
            max_evalue: Some(0.001),
            format: HitFormat::Tango,
            report_ranks: vec![
                Rank::Superkingdom,
                Rank::Phylum,
                Rank::Class,
                Rank::Order,
                Rank::Family,
                Rank::Genus,
                Rank::Species,
            ],
        }
    }
}

pub fn default_rank_thresholds() -> BTreeMap<Rank, f64> {
    BTreeMap::from([
        (Rank::Strain, 0.9),
        (Rank::Subspecies, 0.9),
        (Rank::Species, 0.9),
        (Rank::Genus, 0.7),
        (Rank::Family, 0.6),
        (Rank::Order, 0.5),
        (Rank::Class, 0.5),
        (Rank::Phylum, 0.5),
        (Rank::Superkingdom, 0.5),
    ])
}

/// Percent identity a hit needs to be placed at phylum, genus and species in
/// `rank_lca` mode.
pub fn rank_lca_identity_thresholds() -> BTreeMap<Rank, f32> {
    BTreeMap::from([(Rank::Phylum, 45.0), (Rank::Genus, 60.0), (Rank::Species, 85.0)])
}

impl AssignConfig {
    /// Load and validate a TOML config file.
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AssignConfig = toml::from_str(&text).map_err(|source| ConfigError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Set the window from a "top percent of the best score" value.
    pub fn with_top_percent(mut self, top: f64) -> Self {
        self.score_window = 1.0 - top / 100.0;
        self
    }

    /// Reject anything that would make thresholds meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.score_window) {
            return Err(ConfigError::WindowOutOfRange(self.score_window));
        }
        if self.rank_thresholds.is_empty() {
            return Err(ConfigError::NoAssignRanks);
        }
        for (&rank, &value) in &self.rank_thresholds {
            if rank.level().is_none() || rank == Rank::Root {
                return Err(ConfigError::UnassignableRank(rank));
            }
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ThresholdOutOfRange { rank, value });
            }
        }
        if let Some(value) = self.leaf_threshold {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ThresholdOutOfRange { rank: Rank::NoRank, value });
            }
        }
        for (&rank, &value) in &self.identity_thresholds {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigError::IdentityOutOfRange { rank, value });
            }
        }
        Ok(())
    }

    /// Assignment ranks, most specific first.
    pub fn ranks_most_specific_first(&self) -> Vec<Rank> {
        let mut ranks: Vec<Rank> = self.rank_thresholds.keys().copied().collect();
        ranks.sort_by_key(|r| std::cmp::Reverse(r.level()));
        ranks
    }

    pub fn threshold(&self, rank: Rank) -> Option<f64> {
        self.rank_thresholds.get(&rank).copied()
    }

    /// Threshold for accepting a hit's own taxon outside the ranked walk.
    pub fn leaf_threshold(&self) -> f64 {
        self.leaf_threshold
            .unwrap_or_else(|| self.rank_thresholds.values().copied().fold(0.0, f64::max))
    }

    /// Identity thresholds in force: the configured table, or the
    /// `rank_lca` preset when that mode runs without one.
    pub fn effective_identity_thresholds(&self) -> Cow<'_, BTreeMap<Rank, f32>> {
        if self.mode == AssignMode::RankLca && self.identity_thresholds.is_empty() {
            Cow::Owned(rank_lca_identity_thresholds())
        } else {
            Cow::Borrowed(&self.identity_thresholds)
        }
    }

    /// Least specific level a hit with `identity` fails to qualify for, if any.
    /// The hit may only vote at ranks strictly above this level.
    pub fn identity_ceiling(&self, identity: Option<f32>) -> Option<u8> {
        let identity = identity?;
        self.effective_identity_thresholds()
            .iter()
            .filter(|&(_, &min)| identity < min)
            .filter_map(|(rank, _)| rank.level())
            .min()
    }

    /// True if a hit with `identity` may vote at `rank`.
    pub fn identity_allows(&self, rank: Rank, identity: Option<f32>) -> bool {
        match (self.identity_ceiling(identity), rank.level()) {
            (None, _) => true,
            (Some(ceiling), Some(level)) => level < ceiling,
            (Some(_), None) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AssignConfig::default();
        config.validate().unwrap();
        assert_eq!(
            config.ranks_most_specific_first(),
            vec![
                Rank::Strain,
                Rank::Subspecies,
                Rank::Species,
                Rank::Genus,
                Rank::Family,
                Rank::Order,
                Rank::Class,
                Rank::Phylum,
                Rank::Superkingdom
            ]
        );
    }

    #[test]
    fn test_threshold_out_of_range() {
        let mut config = AssignConfig::default();
        config.rank_thresholds.insert(Rank::Genus, 1.5);
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::ThresholdOutOfRange { rank: Rank::Genus, .. }));

        config.rank_thresholds.insert(Rank::Genus, -0.1);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_window_out_of_range() {
        let config = AssignConfig { score_window: 1.2, ..AssignConfig::default() };
        assert!(matches!(config.validate(), Err(ConfigError::WindowOutOfRange(_))));
    }

    #[test]
    fn test_no_rank_cannot_be_assigned() {
        let mut config = AssignConfig::default();
        config.rank_thresholds.insert(Rank::NoRank, 0.5);
        assert!(matches!(config.validate(), Err(ConfigError::UnassignableRank(Rank::NoRank))));

        config.rank_thresholds.clear();
        assert!(matches!(config.validate(), Err(ConfigError::NoAssignRanks)));
    }

    #[test]
    fn test_top_percent() {
        let config = AssignConfig::default().with_top_percent(10.0);
        assert!((config.score_window - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_identity_gate() {
        let mut config = AssignConfig::default();
        config.identity_thresholds.insert(Rank::Species, 85.0);
        assert!(config.identity_allows(Rank::Species, Some(90.0)));
        assert!(!config.identity_allows(Rank::Species, Some(80.0)));
        assert!(config.identity_allows(Rank::Species, None));
        assert!(config.identity_allows(Rank::Genus, Some(10.0)));
    }

    #[test]
    fn test_identity_ceiling_blocks_more_specific_ranks() {
        let mut config = AssignConfig::default();
        config.identity_thresholds.insert(Rank::Species, 85.0);
        config.identity_thresholds.insert(Rank::Genus, 90.0);
        // Passing species but failing genus still blocks species.
        assert_eq!(config.identity_ceiling(Some(88.0)), Some(Rank::Genus.level().unwrap()));
        assert!(!config.identity_allows(Rank::Species, Some(88.0)));
        assert!(config.identity_allows(Rank::Family, Some(88.0)));
        assert_eq!(config.identity_ceiling(Some(95.0)), None);
    }

    #[test]
    fn test_rank_lca_uses_identity_preset() {
        let config = AssignConfig { mode: AssignMode::RankLca, ..AssignConfig::default() };
        assert_eq!(config.effective_identity_thresholds()[&Rank::Species], 85.0);
        assert_eq!(config.identity_ceiling(Some(70.0)), Rank::Species.level());
        assert_eq!(config.identity_ceiling(Some(50.0)), Rank::Genus.level());
        assert_eq!(config.identity_ceiling(Some(30.0)), Rank::Phylum.level());
        assert_eq!(config.identity_ceiling(Some(90.0)), None);

        // An explicit table replaces the preset.
        let mut config = config;
        config.identity_thresholds.insert(Rank::Species, 95.0);
        assert_eq!(config.identity_ceiling(Some(70.0)), Rank::Species.level());
        assert_eq!(config.identity_ceiling(Some(50.0)), Rank::Species.level());

        // Other modes have no preset.
        assert_eq!(AssignConfig::default().identity_ceiling(Some(10.0)), None);
        assert_eq!("rank_lca".parse::<AssignMode>().unwrap(), AssignMode::RankLca);
        assert_eq!("lca".parse::<AssignMode>().unwrap(), AssignMode::Lca);
    }

    #[test]
    fn test_leaf_threshold() {
        let mut config = AssignConfig::default();
        assert!((config.leaf_threshold() - 0.9).abs() < 1e-12);
        config.leaf_threshold = Some(0.75);
        assert!((config.leaf_threshold() - 0.75).abs() < 1e-12);
        config.leaf_threshold = Some(1.5);
        assert!(matches!(config.validate(), Err(ConfigError::ThresholdOutOfRange { .. })));
    }

    #[test]
    fn test_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tango.toml");
        std::fs::write(
            &path,
            "mode = \"lca\"\nscore_window = 0.8\nfallback = \"common_ancestor\"\nformat = \"blast\"\n\
             report_ranks = [\"genus\", \"species\"]\n\n\
             [rank_thresholds]\nspecies = 0.8\ngenus = 0.6\n\n\
             [identity_thresholds]\nspecies = 85.0\n",
        )
        .unwrap();
        let config = AssignConfig::from_toml_file(&path).unwrap();
        assert_eq!(config.mode, AssignMode::Lca);
        assert_eq!(config.fallback, FallbackPolicy::CommonAncestor);
        assert_eq!(config.format, HitFormat::Blast);
        assert_eq!(config.threshold(Rank::Species), Some(0.8));
        assert_eq!(config.threshold(Rank::Family), None);
        assert_eq!(config.report_ranks, vec![Rank::Genus, Rank::Species]);
        assert_eq!(config.threads, 0);
    }

    #[test]
    fn test_from_toml_file_rejects_bad_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tango.toml");
        std::fs::write(&path, "[rank_thresholds]\nspecies = 2.0\n").unwrap();
        let err = AssignConfig::from_toml_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ThresholdOutOfRange { .. }));
    }
}
