use std::process::ExitCode;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use stormlink::app::{App, RunOptions};
use stormlink::error::StormlinkError;
use stormlink::output::{JsonOutput, OutputWriter};
use stormlink::query::BundleQuery;
use stormlink::store::OutputStore;

#[derive(Parser)]
#[command(name = "stormlink")]
#[command(about = "Links storm track registries to forecast document archives")]
#[command(version, author)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Run the full match/kinematics/bundle pipeline")]
    Run(RunArgs),
    #[command(about = "Query a previously written bundle export")]
    Query(QueryArgs),
}

#[derive(Args)]
struct RunArgs {
    #[arg(long, help = "Path to the registry CSV")]
    registry: Utf8PathBuf,

    #[arg(long, help = "Root of the forecast document tree")]
    corpus: Utf8PathBuf,

    #[arg(long, default_value = "output", help = "Output directory")]
    out: Utf8PathBuf,

    #[arg(long, help = "Worker pool size (defaults to available parallelism)")]
    jobs: Option<usize>,
}

#[derive(Args)]
struct QueryArgs {
    #[arg(long, default_value = "output/storm_bundles.json")]
    bundles: Utf8PathBuf,

    #[arg(long, help = "Print per-year and per-basin statistics")]
    stats: bool,

    #[arg(long, help = "List all storm keys")]
    list: bool,

    #[arg(long, help = "Look up storms by name")]
    name: Option<String>,

    #[arg(long, help = "Restrict --name lookups to one year")]
    year: Option<i32>,

    #[arg(long, help = "Show one storm by key, e.g. 2024_Atlantic_BERYL")]
    info: Option<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<StormlinkError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &StormlinkError) -> u8 {
    match error {
        StormlinkError::RegistryNotFound(_)
        | StormlinkError::CorpusRootNotFound(_)
        | StormlinkError::BundleNotFound(_)
        | StormlinkError::StormNotFound(_) => 2,
        StormlinkError::RegistryMissingColumn(_) | StormlinkError::BundleParse { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run_pipeline(args),
        Commands::Query(args) => run_query(args),
    }
}

fn run_pipeline(args: RunArgs) -> miette::Result<()> {
    let options = RunOptions {
        registry: args.registry,
        corpus_root: args.corpus,
        jobs: args.jobs,
    };
    let report = App.run(&options, &JsonOutput).into_diagnostic()?;

    let store = OutputStore::new(args.out);
    OutputWriter::write_all(&store, &report).into_diagnostic()?;
    JsonOutput::print_summary(&report.summary).into_diagnostic()?;
    Ok(())
}

fn run_query(args: QueryArgs) -> miette::Result<()> {
    let query = BundleQuery::load(args.bundles.as_std_path()).into_diagnostic()?;

    if args.stats {
        JsonOutput::print_json(&query.stats()).into_diagnostic()?;
    }
    if args.list {
        JsonOutput::print_json(&query.keys()).into_diagnostic()?;
    }
    if let Some(name) = &args.name {
        JsonOutput::print_json(&query.by_name(name, args.year)).into_diagnostic()?;
    }
    if let Some(key) = &args.info {
        let detail = query.info(key).into_diagnostic()?;
        JsonOutput::print_json(&detail).into_diagnostic()?;
    }
    Ok(())
}
