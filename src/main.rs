use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};

use ferrous_seedmap::core::quality;
use ferrous_seedmap::index::{ReferenceIndex, ReferencePosition, catalog_io};
use ferrous_seedmap::pipelines::workflow::{CapacityPlan, WorkflowCliOptions};

#[derive(Parser)]
#[command(name = "ferrous-seedmap")]
#[command(about = "FerrousSeedmap - reference catalogs and alignment workflow planning", long_about = None)]
#[command(version)]
struct Cli {
    /// Verbose level: 1=error, 2=warning, 3=message, 4=debug, 5+=trace
    #[arg(short = 'v', long, value_name = "INT", default_value_t = 3, global = true)]
    verbosity: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a reference catalog
    Info {
        /// Reference catalog file
        #[arg(value_name = "CATALOG")]
        catalog: PathBuf,
    },

    /// Translate a genomic offset into contig and offset
    Locate {
        /// Reference catalog file
        #[arg(value_name = "CATALOG")]
        catalog: PathBuf,

        /// 0-based offsets in the concatenated genome
        #[arg(value_name = "OFFSET", required = true)]
        offsets: Vec<u64>,
    },

    /// Merge catalogs whose contigs continue one another
    Merge {
        /// Catalogs to merge, in karyotype order
        #[arg(value_name = "CATALOG", required = true, num_args = 2..)]
        catalogs: Vec<PathBuf>,

        /// Merged catalog file
        #[arg(short = 'o', long, value_name = "FILE")]
        output: PathBuf,
    },

    /// Show the bin capacity plan for a set of workflow options
    Plan {
        #[command(flatten)]
        options: WorkflowCliOptions,
    },

    /// Compute the mapping quality of one end of a pair
    Mapq {
        /// Alignment score of the fragment
        #[arg(value_name = "SCORE")]
        score: u32,

        /// Alignment score of the mate
        #[arg(long, value_name = "INT")]
        mate_score: u32,

        /// Alignment score of the template
        #[arg(long, value_name = "INT")]
        template_score: u32,

        /// The pair matches the template length model
        #[arg(long)]
        proper_pair: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Map verbosity (1=error, 2=warning, 3=message, 4=debug, 5+=trace) to log levels
    let log_level = match cli.verbosity {
        v if v <= 1 => log::LevelFilter::Error,
        2 => log::LevelFilter::Warn,
        3 => log::LevelFilter::Info,
        4 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .format_timestamp(None) // Don't show timestamps
        .format_target(false) // Don't show module names
        .init();

    match cli.command {
        Commands::Info { catalog } => info(&catalog),
        Commands::Locate { catalog, offsets } => locate(&catalog, &offsets),
        Commands::Merge { catalogs, output } => merge(&catalogs, &output),
        Commands::Plan { options } => plan(options),
        Commands::Mapq {
            score,
            mate_score,
            template_score,
            proper_pair,
        } => {
            let mapq = quality::pick_mapq(score, mate_score, proper_pair, template_score)
                .context("Cannot compute mapping quality")?;
            println!("{mapq}");
            Ok(())
        }
    }
}

fn load_catalog(path: &Path) -> Result<ReferenceIndex> {
    log::info!("Loading reference catalog: {}", path.display());
    catalog_io::load(path).with_context(|| format!("Failed to load catalog {}", path.display()))
}

fn info(path: &Path) -> Result<()> {
    let index = load_catalog(path)?;

    println!("format_version\t{}", index.format_version());
    println!("contigs\t{}", index.contig_count());
    println!("genome_length\t{}", index.genome_length());
    println!("single_file\t{}", index.single_file_reference());
    for contig in index.contigs() {
        println!(
            "contig\t{}\t{}\t{}\t{}\t{}",
            contig.index,
            contig.name,
            contig.genomic_position,
            contig.total_bases,
            if contig.decoy { "decoy" } else { "primary" }
        );
    }
    for seed_length in index.seed_lengths() {
        println!(
            "seed_length\t{}\t{} shards\t{} kmers\t{}",
            seed_length,
            index.mask_files(seed_length)?.len(),
            index.total_kmers(seed_length),
            if index.is_complete_partition(seed_length) {
                "complete"
            } else {
                "incomplete"
            }
        );
    }
    for annotation in index.annotations() {
        println!(
            "annotation\t{}\tk={}\t{}",
            annotation.annotation_type,
            annotation.k,
            annotation.path.display()
        );
    }
    Ok(())
}

fn locate(path: &Path, offsets: &[u64]) -> Result<()> {
    let index = load_catalog(path)?;
    for &offset in offsets {
        match index.genomic_offset_to_position(offset) {
            ReferencePosition::Position { contig_id, offset: contig_offset } => {
                let name = index
                    .contig(contig_id)
                    .map(|c| c.name.as_str())
                    .unwrap_or("?");
                println!("{offset}\t{name}\t{contig_offset}");
            }
            ReferencePosition::NoMatch => println!("{offset}\t*\t*"),
        }
    }
    Ok(())
}

fn merge(catalogs: &[PathBuf], output: &Path) -> Result<()> {
    let Some((first, rest)) = catalogs.split_first() else {
        bail!("No catalogs to merge");
    };
    let mut merged = load_catalog(first)?;
    for path in rest {
        let next = load_catalog(path)?;
        merged
            .merge(next)
            .with_context(|| format!("Failed to merge {}", path.display()))?;
    }

    catalog_io::save(&merged, output)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    log::info!(
        "Merged {} catalogs: {} contigs, {} bases",
        catalogs.len(),
        merged.contig_count(),
        merged.genome_length()
    );
    Ok(())
}

fn plan(options: WorkflowCliOptions) -> Result<()> {
    let opt = options
        .into_opt()
        .map_err(anyhow::Error::msg)
        .context("Invalid workflow options")?;
    let plan = CapacityPlan::new(&opt)?;
    plan.log();

    println!("cores\t{}", plan.cores);
    println!("estimated_fragment_size\t{}", plan.estimated_fragment_size);
    println!("target_fragments_per_bin\t{}", plan.target_fragments_per_bin);
    println!("target_bin_length\t{}", plan.target_bin_length);
    println!("target_bin_size\t{}", plan.target_bin_size);
    Ok(())
}
