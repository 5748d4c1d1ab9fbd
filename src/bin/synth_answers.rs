use anyhow::{Context, Result};
use clap::Parser;
use spa_test::engine::{ensure_output_writable, Engine};
use spa_test::queryset;
use spa_test::synth;
use std::fs;
use std::path::PathBuf;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "Synthesize expected-answer files for a query list from the engine's own output"
)]
struct Cli {
    /// Program source file handed to the engine for the oracle run
    #[arg(value_name = "SOURCE")]
    program: PathBuf,

    /// Plain list of queries, one per line
    #[arg(long, value_name = "FILE", default_value = "queries.txt")]
    queries: PathBuf,

    /// Synthesized query-set file to write
    #[arg(long, value_name = "FILE", default_value = "generated_queries.txt")]
    out: PathBuf,

    /// Where the engine writes its result document during the oracle run
    #[arg(long, value_name = "FILE", default_value = "oracle_out.xml")]
    oracle_output: PathBuf,

    /// Only write the unanswered scaffold; skip the oracle run
    #[arg(long)]
    scaffold: bool,

    /// Engine executable, as a name on PATH or an explicit path
    #[arg(long, value_name = "CMD", default_value = "autotester")]
    engine: String,

    /// Overwrite an existing oracle output file instead of refusing to run
    #[arg(short = 'i', long = "ignore-exists")]
    ignore_exists: bool,

    #[arg(short = 'v', long = "verbose")]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "spa_test=info,synth_answers=info".to_string())
    } else {
        std::env::var("RUST_LOG")
            .unwrap_or_else(|_| "spa_test=warn,synth_answers=warn".to_string())
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if let Err(e) = run(&cli) {
        error!("{e:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let queries = synth::read_query_list(&cli.queries)?;
    if cli.scaffold {
        let scaffold = queryset::render(&synth::scaffold_records(&queries));
        fs::write(&cli.out, scaffold)
            .with_context(|| format!("cannot write {}", cli.out.display()))?;
        info!(out = %cli.out.display(), queries = queries.len(), "scaffold written");
        return Ok(());
    }

    let engine = Engine::new(cli.engine.clone());
    engine.validate()?;
    ensure_output_writable(&cli.oracle_output, cli.ignore_exists)?;

    // The scaffold doubles as the query file for the oracle run, then is
    // overwritten with the answered records.
    let records = synth::synthesize(
        &engine,
        &cli.program,
        &queries,
        &cli.out,
        &cli.oracle_output,
    )?;
    fs::write(&cli.out, queryset::render(&records))
        .with_context(|| format!("cannot write {}", cli.out.display()))?;
    info!(out = %cli.out.display(), answered = records.len(), "answers synthesized");
    Ok(())
}
