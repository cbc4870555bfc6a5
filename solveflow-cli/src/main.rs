//! Command-line problem solver.
//!
//! Reads every `*.txt` problem from `<problems-dir>/unsolved`, runs the
//! configured pipeline over each one, writes results to
//! `<problems-dir>/solved` and moves completed problems there.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use solveflow::observability::DEFAULT_LOG_FILE;
use solveflow::prelude::*;
use solveflow::test_runner::DEFAULT_INTERPRETER;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "solveflow")]
#[command(version, about = "Solve coding problems with a pipeline of LLM stages")]
struct Cli {
    /// Pipeline definition (JSON). Defaults to analyze -> implement -> verify.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding `unsolved/` and `solved/`
    #[arg(long, default_value = "problems")]
    problems_dir: PathBuf,

    /// Env file applied before reading settings
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,

    /// Problems solved at once
    #[arg(long, default_value_t = 1)]
    concurrency: usize,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Also append logs to this file
    #[arg(long, default_value = DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// Log to the console only
    #[arg(long)]
    no_log_file: bool,

    /// Emit JSON logs on stderr
    #[arg(long)]
    json_logs: bool,

    /// Validate the pipeline, print its execution order and exit
    #[arg(long)]
    dry_run: bool,

    /// Store extracted test cases without running them
    #[arg(long)]
    no_run_tests: bool,

    /// Interpreter used to run extracted test cases
    #[arg(long, default_value = DEFAULT_INTERPRETER)]
    python: PathBuf,

    /// Time budget in seconds for one problem's test run
    #[arg(long, default_value_t = 30)]
    test_timeout: u64,
}

impl Cli {
    fn log_config(&self) -> LogConfig {
        let config = LogConfig::new(&self.log_level).with_json(self.json_logs);
        if self.no_log_file {
            config
        } else {
            config.with_file(&self.log_file)
        }
    }

    fn test_runner(&self) -> Option<PythonTestRunner> {
        (!self.no_run_tests).then(|| {
            PythonTestRunner::new()
                .with_interpreter(&self.python)
                .with_timeout(Duration::from_secs(self.test_timeout))
        })
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_config()).context("failed to initialize logging")?;

    let applied = load_env_file(&cli.env_file)
        .with_context(|| format!("failed to load {}", cli.env_file.display()))?;
    info!(applied, path = %cli.env_file.display(), "Environment loaded");

    let pipeline_config = match &cli.config {
        Some(path) => PipelineConfig::from_path(path)
            .with_context(|| format!("failed to load pipeline config {}", path.display()))?,
        None => PipelineConfig::default_solver(),
    };

    if cli.dry_run {
        return dry_run(&pipeline_config);
    }

    let settings = Settings::from_env().context("invalid settings")?;
    let openai = settings
        .openai_config()
        .context("OPENAI_API_KEY must be set (in the environment or the env file)")?;
    info!(model = %openai.model, base_url = %openai.base_url, "Using OpenAI executor");

    let factory = OpenAiExecutorFactory::new(openai);
    let pipeline = pipeline_config
        .build(&factory, Arc::new(LoggingEventSink::debug()))
        .context("invalid pipeline configuration")?;
    info!(
        pipeline = pipeline.name(),
        order = ?pipeline.execution_order(),
        "Pipeline ready"
    );

    let source = DirectoryProblemSource::new(&cli.problems_dir);
    let mut store = FileArtifactStore::new(source.solved_dir());
    match cli.test_runner() {
        Some(runner) => {
            info!(interpreter = %runner.interpreter().display(), "Extracted test cases will be run");
            store = store.with_test_runner(Arc::new(runner));
        }
        None => info!("Test execution disabled"),
    }
    let cancel = CancellationToken::new();
    spawn_ctrl_c_handler(cancel.clone());

    let solver = ProblemSolver::new(Arc::new(pipeline), Arc::new(source), Arc::new(store))
        .with_concurrency(cli.concurrency)
        .with_cancellation(cancel)
        .with_event_sink(Arc::new(LoggingEventSink::info()));

    let report = solver.solve_all().await.context("problem solving failed")?;

    if report.is_empty() {
        println!(
            "No unsolved problems in {}",
            cli.problems_dir.join("unsolved").display()
        );
        return Ok(());
    }

    for outcome in &report.outcomes {
        let location = outcome
            .artifact_path
            .as_ref()
            .map_or_else(|| "not run".to_string(), |p| p.display().to_string());
        println!("{:<32} {:<18} {}", outcome.problem, outcome.status.to_string(), location);
    }
    println!(
        "\n{} of {} problem(s) solved",
        report.solved(),
        report.total()
    );

    Ok(())
}

fn dry_run(config: &PipelineConfig) -> Result<()> {
    let placeholder = |stage: &str, _instructions: &str| -> Arc<dyn Executor> {
        let stage = stage.to_string();
        Arc::new(FnExecutor::new(stage.clone(), move |_ctx: &str| {
            Err(ExecutorError::failure(format!("dry run: '{stage}' is not bound")))
        }))
    };
    let pipeline = config
        .build(&placeholder, Arc::new(NoOpEventSink))
        .context("invalid pipeline configuration")?;

    println!("Pipeline '{}' is valid. Execution order:", pipeline.name());
    for (i, stage) in pipeline.execution_order().iter().enumerate() {
        let deps = pipeline
            .stages()
            .iter()
            .find(|s| &s.name == stage)
            .map(|s| s.depends_on.join(", "))
            .unwrap_or_default();
        if deps.is_empty() {
            println!("  {}. {stage}", i + 1);
        } else {
            println!("  {}. {stage} (after {deps})", i + 1);
        }
    }
    Ok(())
}

fn spawn_ctrl_c_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing in-flight stages");
            cancel.cancel("interrupted by user");
        }
    });
}
