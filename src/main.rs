use anyhow::Result;
use clap::Parser;
use colored::control::set_override as set_color_override;
use spa_test::discover;
use spa_test::engine::Engine;
use spa_test::error::HarnessError;
use spa_test::report;
use spa_test::runner::{run_pairs, RunOptions};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

#[cfg(feature = "mimalloc")]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Parser, Debug, Clone)]
#[command(
    version,
    author,
    about = "Drive the analyzer engine over (source, queries) test pairs and report per-query verdicts"
)]
struct Cli {
    /// Program source file, or a directory of *_source.txt fixtures
    #[arg(value_name = "SOURCE")]
    program: PathBuf,

    /// Query file; deduced from the source file name when omitted
    #[arg(value_name = "QUERIES")]
    queries: Option<PathBuf>,

    /// Overwrite an existing output file instead of refusing to run
    #[arg(short = 'i', long = "ignore-exists")]
    ignore_exists: bool,

    /// Where the engine writes its result document
    #[arg(long, value_name = "FILE", default_value = "out.xml")]
    output: PathBuf,

    /// Stage the result document into the artifact directory after the run
    #[arg(long)]
    serve: bool,

    /// Artifact directory used by --serve
    #[arg(long, value_name = "DIR", default_value = "artifacts")]
    artifact_dir: PathBuf,

    /// Engine executable, as a name on PATH or an explicit path
    #[arg(long, value_name = "CMD", default_value = "autotester")]
    engine: String,

    /// Kill an engine run after this many seconds
    #[arg(long, value_name = "SECS")]
    engine_timeout: Option<u64>,

    /// Print the run report as JSON instead of the human-readable lines
    #[arg(long)]
    json: bool,

    /// Suppress the report and engine stderr
    #[arg(short = 'q', long = "silent")]
    silent: bool,

    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    #[arg(short = 'c', long = "color", alias = "colour", conflicts_with = "no_color")]
    color: bool,

    #[arg(long = "no-color")]
    no_color: bool,
}

fn main() {
    let cli = Cli::parse();

    // With -v show INFO and above; RUST_LOG can override either way.
    let filter = if cli.verbose {
        std::env::var("RUST_LOG").unwrap_or_else(|_| "spa_test=info".to_string())
    } else {
        std::env::var("RUST_LOG").unwrap_or_else(|_| "spa_test=warn".to_string())
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    // Colors: default on, --no-color turns off.
    if cli.no_color {
        set_color_override(false);
    } else {
        set_color_override(true);
    }

    match run(&cli) {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("{e:#}");
            std::process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> Result<bool> {
    let directory_mode = cli.program.is_dir();
    if directory_mode && cli.serve {
        return Err(HarnessError::Config(
            "--serve cannot be combined with a test directory".to_string(),
        )
        .into());
    }

    let pairs = discover::discover(&cli.program, cli.queries.as_deref())?;

    let mut engine = Engine::new(cli.engine.clone());
    engine.timeout = cli.engine_timeout.map(Duration::from_secs);
    engine.quiet = cli.silent;

    if cli.verbose && !cli.silent {
        let resolved = engine
            .resolved_exe()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|| cli.engine.clone());
        info!(engine = %resolved, cases = pairs.len(), "starting run");
    }

    let opts = RunOptions {
        output: cli.output.clone(),
        allow_overwrite: cli.ignore_exists,
        stage_dir: cli.serve.then(|| cli.artifact_dir.clone()),
    };
    let run_report = run_pairs(&engine, &pairs, &opts)?;

    if !cli.silent {
        if cli.json {
            println!("{}", report::render_json(&run_report)?);
        } else {
            report::print_human(&run_report, directory_mode);
        }
    }
    Ok(run_report.all_passed())
}
