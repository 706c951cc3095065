use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use tango_rs::config::{AssignConfig, AssignMode, FallbackPolicy};
use tango_rs::hits::HitFormat;
use tango_rs::types::Rank;
use tango_rs::{assign_taxonomy, AssignInputs, TaxonomySource};

/// Assign taxonomy to query sequences from homology search hits.
#[derive(Parser, Debug)]
#[command(name = "tango-rs", version, about)]
struct Args {
    /// Search output (BLAST/DIAMOND tabular, optionally gzipped)
    hits: PathBuf,

    /// Lineage table with taxon names, one column per report rank
    outfile: PathBuf,

    /// NCBI taxonomy dump directory (nodes.dmp, names.dmp, merged.dmp, delnodes.dmp)
    #[arg(short = 't', long, conflicts_with = "taxdb", required_unless_present = "taxdb")]
    taxdir: Option<PathBuf>,

    /// taxDB file: taxid, parent, name, rank
    #[arg(long)]
    taxdb: Option<PathBuf>,

    /// Merged ids (old, new) to go with --taxdb
    #[arg(long, requires = "taxdb")]
    merged: Option<PathBuf>,

    /// Subject accession to taxid map
    #[arg(long)]
    taxidmap: Option<PathBuf>,

    /// TOML file with assignment options; flags below override it
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Hit file layout: 'tango' (taxid in 13th column) or 'blast'
    #[arg(long)]
    format: Option<HitFormat>,

    /// Assignment mode: 'rank_vote', 'rank_lca' or 'lca'
    #[arg(short = 'm', long)]
    mode: Option<AssignMode>,

    /// Keep hits within this percent of the best bit score
    #[arg(short = 'T', long, conflicts_with = "window")]
    top: Option<f64>,

    /// Keep hits scoring at least best * window
    #[arg(long)]
    window: Option<f64>,

    /// Maximum e-value of hits to keep
    #[arg(short = 'e', long)]
    evalue: Option<f64>,

    /// Vote threshold for a rank, e.g. species=0.9 (repeatable)
    #[arg(long = "rank-threshold", value_parser = parse_rank_value::<f64>)]
    rank_thresholds: Vec<(Rank, f64)>,

    /// Vote threshold for a hit taxon on no assignment rank (default: strictest rank threshold)
    #[arg(long)]
    leaf_threshold: Option<f64>,

    /// Minimum percent identity to vote at a rank, e.g. species=85 (repeatable)
    #[arg(long = "identity-threshold", value_parser = parse_rank_value::<f32>)]
    identity_thresholds: Vec<(Rank, f32)>,

    /// What to report when no rank is accepted: 'unclassified' or 'common_ancestor'
    #[arg(long)]
    fallback: Option<FallbackPolicy>,

    /// Ranks to report in the lineage tables
    #[arg(long, num_args = 1.., value_parser = parse_rank)]
    reportranks: Option<Vec<Rank>>,

    /// Also write the lineage table with taxon ids
    #[arg(long)]
    taxidout: Option<PathBuf>,

    /// Also write the query, taxid, rank, support table
    #[arg(long)]
    assignments: Option<PathBuf>,

    /// Also write a blobtools-compatible hits table
    #[arg(long)]
    blobout: Option<PathBuf>,

    /// Also write the number of queries per assigned taxon
    #[arg(long)]
    counts: Option<PathBuf>,

    /// Also write a run summary
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Worker threads (0 = all cores)
    #[arg(short = 'p', long)]
    threads: Option<usize>,
}

fn parse_rank(s: &str) -> Result<Rank, String> {
    match s.parse::<Rank>().unwrap_or(Rank::NoRank) {
        Rank::NoRank => Err(format!("unknown rank '{s}'")),
        rank => Ok(rank),
    }
}

fn parse_rank_value<T: std::str::FromStr>(s: &str) -> Result<(Rank, T), String> {
    let (rank, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected <rank>=<value>, got '{s}'"))?;
    let value = value
        .trim()
        .parse::<T>()
        .map_err(|_| format!("invalid value '{}' for rank {}", value.trim(), rank))?;
    Ok((parse_rank(rank)?, value))
}

fn spinner(color: &str, msg: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let template = format!("{{spinner:.{color}}} {{msg}}");
    if let Ok(style) = ProgressStyle::default_spinner().template(&template) {
        spinner.set_style(style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]));
    }
    spinner.set_message(msg.to_string());
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    spinner
}

/// File config first, then command-line overrides.
fn build_config(args: &Args) -> Result<AssignConfig> {
    let mut config = match &args.config {
        Some(path) => AssignConfig::from_toml_file(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => AssignConfig::default(),
    };
    if let Some(format) = args.format {
        config.format = format;
    }
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    if let Some(top) = args.top {
        config = config.with_top_percent(top);
    }
    if let Some(window) = args.window {
        config.score_window = window;
    }
    if let Some(evalue) = args.evalue {
        config.max_evalue = Some(evalue);
    }
    if !args.rank_thresholds.is_empty() {
        config.rank_thresholds = args.rank_thresholds.iter().copied().collect();
    }
    if let Some(leaf) = args.leaf_threshold {
        config.leaf_threshold = Some(leaf);
    }
    if !args.identity_thresholds.is_empty() {
        config.identity_thresholds = args.identity_thresholds.iter().copied().collect();
    }
    if let Some(fallback) = args.fallback {
        config.fallback = fallback;
    }
    if let Some(ranks) = &args.reportranks {
        config.report_ranks = ranks.clone();
    }
    if let Some(threads) = args.threads {
        config.threads = threads;
    }
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let config = build_config(&args)?;

    let taxonomy = match (&args.taxdir, &args.taxdb) {
        (Some(dir), _) => TaxonomySource::NcbiDir(dir.clone()),
        (None, Some(path)) => TaxonomySource::TaxDb { path: path.clone(), merged: args.merged.clone() },
        (None, None) => bail!("one of --taxdir or --taxdb is required"),
    };
    if config.format == HitFormat::Blast && args.taxidmap.is_none() {
        bail!("--format blast needs --taxidmap to map subjects to taxa");
    }
    let inputs = AssignInputs {
        taxonomy,
        hits: args.hits.clone(),
        taxid_map: args.taxidmap.clone(),
    };

    // 1. Assign
    let progress = spinner("green", "Assigning taxonomy...");
    let results = assign_taxonomy(&inputs, &config).context("Assignment failed")?;
    progress.finish_with_message(format!(
        "Assigned {} of {} queries.",
        results.summary.classified, results.summary.queries
    ));

    // 2. Write outputs
    let progress = spinner("yellow", "Writing output files...");
    fs::write(&args.outfile, results.get_lineage_output())
        .with_context(|| format!("writing {}", args.outfile.display()))?;
    if let Some(path) = &args.taxidout {
        fs::write(path, results.get_taxid_lineage_output())
            .with_context(|| format!("writing {}", path.display()))?;
    }
    if let Some(path) = &args.assignments {
        fs::write(path, results.get_assignment_output())
            .with_context(|| format!("writing {}", path.display()))?;
    }
    if let Some(path) = &args.blobout {
        fs::write(path, results.get_blobtools_output())
            .with_context(|| format!("writing {}", path.display()))?;
    }
    if let Some(path) = &args.counts {
        fs::write(path, results.get_taxon_counts_output())
            .with_context(|| format!("writing {}", path.display()))?;
    }
    if let Some(path) = &args.summary {
        fs::write(path, results.get_summary_text())
            .with_context(|| format!("writing {}", path.display()))?;
    }
    progress.finish_with_message("Output files created.");

    Ok(())
}
