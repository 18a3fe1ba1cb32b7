use std::process::ExitCode;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use kira_sample_assembler::app::{AssembleOptions, Assembler, SourceInputs, expand_inputs};
use kira_sample_assembler::cache::{CacheMode, TimeCache};
use kira_sample_assembler::config::{ConfigLoader, ResolvedConfig};
use kira_sample_assembler::domain::SourceKind;
use kira_sample_assembler::error::AssembleError;
use kira_sample_assembler::output::{
    ConsoleProgress, JsonOutput, OutputMode, print_human_summary,
};

#[derive(Parser)]
#[command(name = "kira-sa")]
#[command(about = "Assemble per-sample datasets from behavior, light-microscopy and time files")]
#[command(version, author)]
struct Cli {
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Read all sources and build per-sample tables")]
    Assemble(AssembleArgs),
    #[command(about = "Show the identity derived from a file name")]
    Resolve(ResolveArgs),
    #[command(about = "Manage the time-record cache")]
    Cache(CacheArgs),
}

#[derive(Args)]
struct AssembleArgs {
    #[arg(long, num_args = 1..)]
    behavior: Vec<String>,

    #[arg(long, num_args = 1..)]
    light: Vec<String>,

    #[arg(long, num_args = 1..)]
    time: Vec<String>,

    #[arg(long)]
    cache: Option<String>,

    #[arg(long)]
    no_cache: bool,

    #[arg(long)]
    export: Option<String>,

    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ResolveArgs {
    source: SourceKind,
    path: String,
}

#[derive(Args)]
struct CacheArgs {
    #[command(subcommand)]
    command: CacheCommand,
}

#[derive(Subcommand)]
enum CacheCommand {
    #[command(about = "Delete the time-record snapshot")]
    Clear {
        #[arg(long)]
        cache: Option<String>,
    },
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<AssembleError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &AssembleError) -> u8 {
    match error {
        AssembleError::Format { .. } | AssembleError::EmptyGroup { .. } => 2,
        AssembleError::Consistency { .. } | AssembleError::TagMismatch { .. } => 3,
        AssembleError::CacheRead(_)
        | AssembleError::CacheParse { .. }
        | AssembleError::CacheWrite { .. } => 4,
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
    let config = ConfigLoader::resolve(cli.config.as_deref())?;

    match cli.command {
        Commands::Assemble(args) => run_assemble(args, config),
        Commands::Resolve(args) => run_resolve(args, &config),
        Commands::Cache(CacheArgs {
            command: CacheCommand::Clear { cache },
        }) => {
            let path = cache
                .map(Utf8PathBuf::from)
                .unwrap_or_else(|| config.cache_path.clone());
            let removed = TimeCache::new(path.clone()).invalidate()?;
            if removed {
                println!("removed {path}");
            } else {
                println!("no cache at {path}");
            }
            Ok(())
        }
    }
}

fn run_assemble(args: AssembleArgs, mut config: ResolvedConfig) -> miette::Result<()> {
    if let Some(cache) = args.cache {
        config.cache_path = Utf8PathBuf::from(cache);
    }
    let cache_mode = if args.no_cache || !config.use_time_cache {
        CacheMode::Ignore
    } else {
        CacheMode::Use
    };
    let output_mode = if args.json {
        OutputMode::Json
    } else {
        OutputMode::Human
    };

    let mut inputs = SourceInputs::from_lists(&config.inputs)?;
    inputs
        .behavior
        .extend(expand_inputs(&args.behavior, SourceKind::Behavior)?);
    inputs
        .light
        .extend(expand_inputs(&args.light, SourceKind::LightMicroscopy)?);
    inputs.time.extend(expand_inputs(&args.time, SourceKind::Time)?);

    let assembler = Assembler::new(&config, AssembleOptions { cache_mode });
    let dataset = match output_mode {
        OutputMode::Human => assembler.assemble(&inputs, &ConsoleProgress)?,
        OutputMode::Json => assembler.assemble(&inputs, &JsonOutput)?,
    };

    if let Some(dir) = args.export {
        let written = dataset.export(Utf8Path::new(&dir))?;
        tracing::info!(files = written.len(), dir = %dir, "exported tables");
    }

    let summary = dataset.summary();
    match output_mode {
        OutputMode::Human => print_human_summary(&summary),
        OutputMode::Json => JsonOutput::print_summary(&summary).into_diagnostic()?,
    }
    Ok(())
}

fn run_resolve(args: ResolveArgs, config: &ResolvedConfig) -> miette::Result<()> {
    let pattern = match args.source {
        SourceKind::Behavior => &config.patterns.behavior,
        SourceKind::LightMicroscopy => &config.patterns.light,
        SourceKind::Time => &config.patterns.time,
    };
    let name = pattern.resolve(Utf8Path::new(&args.path))?;
    JsonOutput::print_json(&name).into_diagnostic()?;
    Ok(())
}
