//src/error.rs

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::Rank;

/// Errors raised while building or querying the taxonomy.
#[derive(Error, Debug)]
pub enum TaxonomyError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path}:{line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("unknown taxon id {0}")]
    UnknownTaxon(u32),

    #[error("taxon id {0} has been deleted from the taxonomy")]
    DeletedTaxon(u32),

    #[error("malformed taxonomy: no root node (a node whose parent is itself)")]
    MissingRoot,

    #[error("malformed taxonomy: more than one root ({first} and {second})")]
    MultipleRoots { first: u32, second: u32 },

    #[error("malformed taxonomy: taxon {taxon} points at missing parent {parent}")]
    DanglingParent { taxon: u32, parent: u32 },

    #[error("malformed taxonomy: parent chain of taxon {taxon} forms a cycle")]
    CycleDetected { taxon: u32 },
}

impl TaxonomyError {
    /// True for the per-hit errors that only drop a hit from voting.
    pub fn is_unknown_taxon(&self) -> bool {
        matches!(self, TaxonomyError::UnknownTaxon(_) | TaxonomyError::DeletedTaxon(_))
    }

    /// True for construction errors that make the whole run impossible.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            TaxonomyError::MissingRoot
                | TaxonomyError::MultipleRoots { .. }
                | TaxonomyError::DanglingParent { .. }
                | TaxonomyError::CycleDetected { .. }
        )
    }
}

/// Errors raised while reading search output or accession maps.
#[derive(Error, Debug)]
pub enum HitsError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{path}:{line}: {message}")]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

/// Rejected configuration. Raised before any query is processed.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("vote threshold for {rank} must be within [0, 1], got {value}")]
    ThresholdOutOfRange { rank: Rank, value: f64 },

    #[error("identity threshold for {rank} must be within [0, 100], got {value}")]
    IdentityOutOfRange { rank: Rank, value: f32 },

    #[error("score window must be within [0, 1], got {0}")]
    WindowOutOfRange(f64),

    #[error("rank '{0}' cannot be used for assignment")]
    UnassignableRank(Rank),

    #[error("at least one rank threshold is required")]
    NoAssignRanks,

    #[error("IO error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config file {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Top-level error for a full assignment run.
#[derive(Error, Debug)]
pub enum TangoError {
    #[error(transparent)]
    Taxonomy(#[from] TaxonomyError),

    #[error(transparent)]
    Hits(#[from] HitsError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("could not start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T, E = TangoError> = std::result::Result<T, E>;
