//! `untangle` command line.
//!
//! Runs the stages individually (`filter`, `build`, `untangle`, `remove`,
//! `score`, `hairball`) or end to end (`run`), plus the reporting helpers
//! (`table`, `payload`, `shared`).
//!
//! ## Configuration
//!
//! Environment variables:
//! - `RUST_LOG`: Log level filter (default: untangle=info,untangle_kernel=info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for terminals (default: pretty)
//!
//! Logs go to stderr; scores and tables go to stdout.
//!
//! ## Usage
//!
//! ```bash
//! untangle run --atoms pangenome.geese --fasta genomes.fa --out-dir out/
//! untangle score --gfa out/untangle.untangled.gfa --original-nodes 1200 --verbose
//! ```

use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use untangle_kernel::io::{
    read_atoms, read_gfa, read_id_list, write_atoms, write_filter_removals, write_gfa,
    write_removal_details, write_removal_names, SequenceCatalog, VizPayload,
};
use untangle_kernel::pipeline::{run, RunConfig};
use untangle_kernel::report::ArtifactPaths;
use untangle_kernel::{
    color_segments, shared_atoms, AtomFilter, BridgePolicy, BubblePolicy, ContextPolicy,
    FilterPolicy, GraphBuilder, HairballIndex, HairballWeights, RustworkxBackend, SegmentId,
    SortKey, UntangleOutcome, UntanglePolicy, UntangleScore, Untangler, VertexTable,
};

/// Initialize the tracing subscriber with pretty or JSON format, on stderr.
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "untangle=info,untangle_kernel=info".into());

    if log_format == "json" {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .flatten_event(true)
                    .with_writer(io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(io::stderr))
            .init();
    }
}

#[derive(Parser)]
#[command(name = "untangle", version, about = "Filter pangenome atoms and untangle assembly graphs")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Filter a .geese atom file.
    Filter {
        /// Input .geese file.
        #[arg(long)]
        atoms: PathBuf,
        /// FASTA with genome sequences; required by --remove-duplicates.
        #[arg(long)]
        fasta: Option<PathBuf>,
        /// Output .geese file.
        #[arg(long, short)]
        output: PathBuf,
        /// Removed atoms with their reason (TSV).
        #[arg(long)]
        removed: Option<PathBuf>,
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Build a GFA graph from atoms.
    Build {
        /// Input .geese file.
        #[arg(long)]
        atoms: PathBuf,
        /// FASTA with genome sequences, used for segment sequences and colours.
        #[arg(long)]
        fasta: Option<PathBuf>,
        /// Output GFA file.
        #[arg(long, short)]
        output: PathBuf,
        /// Skip atoms with more occurrences than this.
        #[arg(long)]
        max_class_occurrences: Option<usize>,
    },
    /// Iteratively remove high-degree and high-centrality segments.
    Untangle {
        /// Input GFA file.
        #[arg(long)]
        gfa: PathBuf,
        /// Atoms supplying walk evidence for bridging.
        #[arg(long)]
        atoms: Option<PathBuf>,
        /// Output GFA file.
        #[arg(long, short)]
        output: PathBuf,
        #[command(flatten)]
        logs: RemovalLogArgs,
        #[command(flatten)]
        untangle: UntangleArgs,
    },
    /// Remove a list of segments.
    Remove {
        /// Input GFA file.
        #[arg(long)]
        gfa: PathBuf,
        /// File with one segment id per line.
        #[arg(long)]
        list: PathBuf,
        /// Atoms supplying walk evidence for bridging.
        #[arg(long)]
        atoms: Option<PathBuf>,
        /// Output GFA file.
        #[arg(long, short)]
        output: PathBuf,
        /// Bridging mode.
        #[arg(long, value_enum, default_value_t = BridgeArg::Evidence)]
        bridge: BridgeArg,
        #[command(flatten)]
        logs: RemovalLogArgs,
    },
    /// Score a graph against its original segment count.
    Score {
        /// GFA file to score.
        #[arg(long)]
        gfa: PathBuf,
        /// Segment count before untangling.
        #[arg(long)]
        original_nodes: usize,
        /// Print the score breakdown.
        #[arg(long, short)]
        verbose: bool,
    },
    /// Compare a simplified graph with its original by the hairball index.
    Hairball {
        /// Original GFA file.
        #[arg(long)]
        original: PathBuf,
        /// Simplified GFA file.
        #[arg(long)]
        gfa: PathBuf,
        /// Print both graphs' metrics and the removal fractions.
        #[arg(long, short)]
        verbose: bool,
    },
    /// Tabulate degree and betweenness centrality per segment.
    Table {
        /// Input GFA file.
        #[arg(long)]
        gfa: PathBuf,
        /// Output TSV, stdout when omitted.
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Column to sort by.
        #[arg(long, value_enum)]
        sort: Option<SortArg>,
        /// Sort in descending order.
        #[arg(long)]
        descending: bool,
        /// Node count from which betweenness runs in parallel.
        #[arg(long, default_value_t = 50)]
        parallel_threshold: usize,
    },
    /// Write the visualization payload for a graph.
    Payload {
        /// Input GFA file.
        #[arg(long)]
        gfa: PathBuf,
        /// Atoms supplying usage values.
        #[arg(long)]
        atoms: Option<PathBuf>,
        /// FASTA with chromosome/plasmid markers; recolours segments (needs --atoms).
        #[arg(long, requires = "atoms")]
        fasta: Option<PathBuf>,
        /// Output JSON file.
        #[arg(long, short)]
        output: PathBuf,
    },
    /// List atoms found on both chromosomes and plasmids.
    Shared {
        /// Input .geese file.
        #[arg(long)]
        atoms: PathBuf,
        /// FASTA with chromosome/plasmid markers.
        #[arg(long)]
        fasta: PathBuf,
        /// Output file, stdout when omitted.
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Filter, build, untangle and score in one run.
    Run {
        /// Input .geese file.
        #[arg(long)]
        atoms: PathBuf,
        /// FASTA with genome sequences.
        #[arg(long)]
        fasta: Option<PathBuf>,
        /// Output directory.
        #[arg(long)]
        out_dir: PathBuf,
        /// Artifact file name prefix.
        #[arg(long, default_value = "untangle")]
        prefix: String,
        /// Skip atom filtering.
        #[arg(long)]
        skip_filter: bool,
        /// Skip atoms with more occurrences than this when building.
        #[arg(long)]
        max_class_occurrences: Option<usize>,
        #[command(flatten)]
        filter: FilterArgs,
        #[command(flatten)]
        untangle: UntangleArgs,
    },
}

#[derive(Args)]
struct FilterArgs {
    /// Minimum number of occurrences.
    #[arg(long, default_value_t = 10)]
    min_depth: usize,
    /// Minimum atom length in bp.
    #[arg(long, default_value_t = 0)]
    min_length: u64,
    /// Remove atoms with the same sequence as a retained atom.
    #[arg(long)]
    remove_duplicates: bool,
    /// Remove atoms occurring more than once in a genome.
    #[arg(long)]
    remove_multicopy: bool,
    /// Global filter iterations.
    #[arg(long, default_value_t = 1)]
    filter_iterations: usize,
    /// Context cleaning passes, 0 disables.
    #[arg(long, default_value_t = 1)]
    context_passes: usize,
    /// Genomes needed for a context to count as shared.
    #[arg(long, default_value_t = 2)]
    min_shared_genomes: usize,
    /// Skip bubble resolution.
    #[arg(long)]
    no_bubbles: bool,
    /// Minimum distinct successors of a bubble source.
    #[arg(long, default_value_t = 2)]
    bubble_min_source: usize,
    /// Minimum distinct predecessors of a bubble sink.
    #[arg(long, default_value_t = 2)]
    bubble_min_sink: usize,
    /// Maximum bubble span in bp.
    #[arg(long, default_value_t = 70_000)]
    bubble_max_span: u64,
}

impl FilterArgs {
    fn policy(&self) -> FilterPolicy {
        let bubbles = (!self.no_bubbles).then_some(BubblePolicy {
            min_source_branches: self.bubble_min_source,
            min_sink_branches: self.bubble_min_sink,
            max_span: self.bubble_max_span,
        });
        FilterPolicy {
            min_depth: self.min_depth,
            min_length: self.min_length,
            remove_duplicates: self.remove_duplicates,
            remove_multicopy: self.remove_multicopy,
            max_iterations: self.filter_iterations,
            context: ContextPolicy {
                passes: self.context_passes,
                min_shared_genomes: self.min_shared_genomes,
                bubbles,
            },
            ..FilterPolicy::default()
        }
    }
}

#[derive(Args)]
struct UntangleArgs {
    /// Untangling iterations.
    #[arg(long, default_value_t = 1)]
    iterations: usize,
    /// Degree threshold.
    #[arg(long, default_value_t = 10)]
    degree_threshold: usize,
    /// Betweenness centrality threshold.
    #[arg(long, default_value_t = 0.05)]
    centrality_threshold: f64,
    /// Do not force-remove the most central segment when nothing is flagged.
    #[arg(long)]
    no_force: bool,
    /// Bridging mode.
    #[arg(long, value_enum, default_value_t = BridgeArg::Evidence)]
    bridge: BridgeArg,
    /// Node count from which betweenness runs in parallel.
    #[arg(long, default_value_t = 50)]
    parallel_threshold: usize,
}

impl UntangleArgs {
    fn policy(&self) -> UntanglePolicy {
        UntanglePolicy {
            max_iterations: self.iterations,
            degree_threshold: self.degree_threshold,
            centrality_threshold: self.centrality_threshold,
            force_removal: !self.no_force,
            bridge: self.bridge.into(),
            parallel_threshold: self.parallel_threshold,
            ..UntanglePolicy::default()
        }
    }
}

#[derive(Args)]
struct RemovalLogArgs {
    /// Detailed removal log (TSV).
    #[arg(long)]
    removed_details: Option<PathBuf>,
    /// Removed segment names, one per line.
    #[arg(long)]
    removed_names: Option<PathBuf>,
}

impl RemovalLogArgs {
    fn write(&self, outcome: &UntangleOutcome) -> Result<()> {
        if let Some(path) = &self.removed_details {
            write_removal_details(&outcome.log, path)
                .with_context(|| format!("writing removal log {}", path.display()))?;
        }
        if let Some(path) = &self.removed_names {
            write_removal_names(&outcome.log, path)
                .with_context(|| format!("writing removed names {}", path.display()))?;
        }
        Ok(())
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum BridgeArg {
    Evidence,
    Structural,
    #[value(name = "none")]
    Off,
}

impl From<BridgeArg> for BridgePolicy {
    fn from(arg: BridgeArg) -> Self {
        match arg {
            BridgeArg::Evidence => BridgePolicy::Evidence,
            BridgeArg::Structural => BridgePolicy::Structural,
            BridgeArg::Off => BridgePolicy::None,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Degree,
    Centrality,
}

impl From<SortArg> for SortKey {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Degree => SortKey::Degree,
            SortArg::Centrality => SortKey::Centrality,
        }
    }
}

fn load_gfa(path: &Path) -> Result<untangle_kernel::AssemblyGraph> {
    read_gfa(path).with_context(|| format!("reading GFA {}", path.display()))
}

fn load_atoms(path: &Path, catalog: Option<&SequenceCatalog>) -> Result<untangle_kernel::AtomCollection> {
    read_atoms(path, catalog).with_context(|| format!("reading atoms {}", path.display()))
}

fn load_catalog(path: &Path) -> Result<SequenceCatalog> {
    SequenceCatalog::read(path).with_context(|| format!("reading FASTA {}", path.display()))
}

/// Write to `path`, or stdout when `None`.
fn with_output<F>(path: Option<&Path>, body: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> io::Result<()>,
{
    match path {
        Some(path) => {
            let file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            body(&mut writer).with_context(|| format!("writing {}", path.display()))?;
            writer.flush()?;
        }
        None => {
            let stdout = io::stdout();
            let mut writer = stdout.lock();
            body(&mut writer).context("writing to stdout")?;
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    match cli.command {
        Command::Filter {
            atoms,
            fasta,
            output,
            removed,
            filter,
        } => {
            let filter = AtomFilter::new(filter.policy())?;
            if filter.policy().requires_sequences() && fasta.is_none() {
                bail!("--remove-duplicates compares atom sequences and needs --fasta");
            }
            let catalog = fasta.as_deref().map(load_catalog).transpose()?;
            let input = load_atoms(&atoms, catalog.as_ref())?;
            let outcome = filter.filter(&input)?;
            write_atoms(&outcome.atoms, &output).with_context(|| format!("writing {}", output.display()))?;
            if let Some(path) = &removed {
                write_filter_removals(&outcome.report, path)
                    .with_context(|| format!("writing filter removals {}", path.display()))?;
            }
            info!(
                removed = outcome.report.atoms_removed(),
                remaining = outcome.report.atoms_after,
                "Filter complete"
            );
        }
        Command::Build {
            atoms,
            fasta,
            output,
            max_class_occurrences,
        } => {
            let catalog = fasta.as_deref().map(load_catalog).transpose()?;
            let atoms = load_atoms(&atoms, catalog.as_ref())?;
            let mut builder = GraphBuilder::new();
            if let Some(cutoff) = max_class_occurrences {
                builder = builder.max_class_occurrences(cutoff);
            }
            let graph = builder.build(&atoms, catalog.as_ref());
            write_gfa(&graph, &output).with_context(|| format!("writing {}", output.display()))?;
        }
        Command::Untangle {
            gfa,
            atoms,
            output,
            logs,
            untangle,
        } => {
            let untangler = Untangler::new(untangle.policy())?;
            let graph = load_gfa(&gfa)?;
            let atoms = atoms.as_deref().map(|p| load_atoms(p, None)).transpose()?;
            let outcome = untangler.untangle(graph, atoms.as_ref())?;
            write_gfa(&outcome.graph, &output).with_context(|| format!("writing {}", output.display()))?;
            logs.write(&outcome)?;
        }
        Command::Remove {
            gfa,
            list,
            atoms,
            output,
            bridge,
            logs,
        } => {
            let untangler = Untangler::new(UntanglePolicy {
                bridge: bridge.into(),
                ..UntanglePolicy::default()
            })?;
            let graph = load_gfa(&gfa)?;
            let ids: Vec<SegmentId> = read_id_list(&list)
                .with_context(|| format!("reading id list {}", list.display()))?
                .into_iter()
                .map(SegmentId::from)
                .collect();
            let atoms = atoms.as_deref().map(|p| load_atoms(p, None)).transpose()?;
            let outcome = untangler.remove_listed(graph, &ids, atoms.as_ref())?;
            write_gfa(&outcome.graph, &output).with_context(|| format!("writing {}", output.display()))?;
            logs.write(&outcome)?;
        }
        Command::Score {
            gfa,
            original_nodes,
            verbose,
        } => {
            UntangleScore::check_original(original_nodes)?;
            let graph = load_gfa(&gfa)?;
            let score = UntangleScore::compute(&graph, original_nodes)
                .with_context(|| format!("scoring {}", gfa.display()))?;
            if verbose {
                println!("{}", score.breakdown());
            } else {
                println!("{score}");
            }
        }
        Command::Hairball {
            original,
            gfa,
            verbose,
        } => {
            let index = HairballIndex::compute(&load_gfa(&original)?, &load_gfa(&gfa)?, &HairballWeights::default());
            if verbose {
                println!("{}", index.breakdown());
            } else {
                println!("{index}");
            }
        }
        Command::Table {
            gfa,
            output,
            sort,
            descending,
            parallel_threshold,
        } => {
            let graph = load_gfa(&gfa)?;
            let mut table = VertexTable::compute(&graph, &RustworkxBackend::new(parallel_threshold));
            if let Some(key) = sort {
                table.sort(key.into(), descending);
            }
            with_output(output.as_deref(), |mut w| table.write_to(&mut w))?;
        }
        Command::Payload {
            gfa,
            atoms,
            fasta,
            output,
        } => {
            let mut graph = load_gfa(&gfa)?;
            let atoms = atoms.as_deref().map(|p| load_atoms(p, None)).transpose()?;
            if let (Some(fasta), Some(atoms)) = (fasta.as_deref(), atoms.as_ref()) {
                let colored = color_segments(&mut graph, atoms, &load_catalog(fasta)?);
                info!(colored, "Recoloured segments");
            }
            VizPayload::from_graph(&graph, atoms.as_ref())
                .write(&output)
                .with_context(|| format!("writing {}", output.display()))?;
        }
        Command::Shared { atoms, fasta, output } => {
            let catalog = load_catalog(&fasta)?;
            let atoms = load_atoms(&atoms, None)?;
            let shared = shared_atoms(&atoms, &catalog);
            info!(count = shared.len(), "Atoms on both chromosome and plasmid");
            with_output(output.as_deref(), |w| {
                for id in &shared {
                    writeln!(w, "{id}")?;
                }
                Ok(())
            })?;
        }
        Command::Run {
            atoms,
            fasta,
            out_dir,
            prefix,
            skip_filter,
            max_class_occurrences,
            filter,
            untangle,
        } => {
            let config = RunConfig {
                atoms,
                fasta,
                out_dir,
                paths: ArtifactPaths::with_prefix(&prefix),
                filter: (!skip_filter).then(|| filter.policy()),
                untangle: untangle.policy(),
                max_class_occurrences,
            };
            let result = run(&config).context("pipeline run failed")?;
            match result.score {
                Some(score) => println!("{score}"),
                None => println!("NA"),
            }
        }
    }

    Ok(())
}
