// src/main.rs

mod cli;
mod csv;
mod engine;
mod error;
mod git;
mod model;
mod renderer;
mod server;
mod text;

use clap::Parser;
use cli::{AnalysisArgs, Cli, Command, DuplicatesArgs, DuplicatesFormat, OwnershipArgs, OwnershipFormat};
use engine::{OwnershipEngine, ResultFileEngine};
use error::CliError;
use model::{OwnershipOptions, OwnershipResult};
use std::net::SocketAddr;
use std::process::ExitCode;
use std::time::Instant;
use tracing::{debug, error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let start_time = Instant::now();

    let outcome = match cli.command {
        Command::Ownership(args) => run_ownership(args),
        Command::Duplicates(args) => run_duplicates(args),
    };
    debug!("Total time: {:.2?}", start_time.elapsed());

    match outcome {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

/// Logs go to stderr so stdout only carries the report
fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load(analysis: &AnalysisArgs) -> Result<(OwnershipOptions, OwnershipResult), CliError> {
    let commit = git::resolve_commit(&analysis.repo, &analysis.branch, analysis.when)?;
    debug!(commit_id = %commit.commit_id, commit_time = commit.time, "Starting analysis of code ownership");
    let options = analysis.to_options(commit.commit_id);

    let engine = ResultFileEngine::new(&analysis.result);
    let result = engine.analyse(&options)?;
    Ok((options, result))
}

fn run_ownership(args: OwnershipArgs) -> Result<(), CliError> {
    let (options, result) = load(&args.analysis)?;

    match args.format {
        OwnershipFormat::Full => println!("{}", text::format_ownership(&result, true)?),
        OwnershipFormat::Short => println!("{}", text::format_ownership(&result, false)?),
        OwnershipFormat::Csv => print!("{}", csv::format_ownership_csv(&result)?),
        OwnershipFormat::Graph => serve_graph(&result, &options, SocketAddr::new(args.host, args.port))?,
    }
    Ok(())
}

fn run_duplicates(args: DuplicatesArgs) -> Result<(), CliError> {
    let (_, result) = load(&args.analysis)?;
    let full = args.format == DuplicatesFormat::Full;
    println!("{}", text::format_duplicates(&result, full));
    Ok(())
}

/// Serve until the process is interrupted
fn serve_graph(result: &OwnershipResult, options: &OwnershipOptions, addr: SocketAddr) -> Result<(), CliError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;

    runtime.block_on(async {
        let url = server::serve_ownership(result, options, addr).await?;
        println!("\nServing graph at {}", url);

        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Couldn't listen for interrupt, serving until killed: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Interrupted, stopping graph server");
        Ok::<(), CliError>(())
    })
}
