use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use taskbench::{AbortSignal, Bench, EventKind, TaskState};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use config::{CONFIG_FILE_NAME, ConfigResolver, OutputFormat, TaskbenchConfig};

mod config;
mod demo;
mod output;

/// Statistical micro-benchmark runner.
#[derive(Parser, Debug)]
#[command(name = "taskbench", author, version, about = "Statistical micro-benchmark runner", long_about = None)]
struct Cli {
    /// Enable debug logging (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the bundled demo tasks and print their statistics.
    Demo(DemoArgs),
    /// List the bundled demo tasks.
    List,
    /// Write a starter taskbench.toml.
    Init {
        #[arg(long, default_value = CONFIG_FILE_NAME)]
        output: PathBuf,
        #[arg(long, help = "Overwrite an existing file")]
        force: bool,
    },
}

#[derive(Args, Debug, Default)]
struct DemoArgs {
    #[arg(long, help = "Minimum measurement time per task, in milliseconds")]
    time: Option<f64>,
    #[arg(long, help = "Minimum measured invocations per task")]
    iterations: Option<u64>,
    #[arg(long, help = "Minimum warmup time per task, in milliseconds")]
    warmup_time: Option<f64>,
    #[arg(long, help = "Minimum warmup invocations per task")]
    warmup_iterations: Option<u64>,
    #[arg(long, help = "Skip the warmup phase")]
    no_warmup: bool,
    #[arg(long, help = "Add a task that always errors")]
    include_failing: bool,
    #[arg(long, value_enum)]
    format: Option<OutputFormat>,
    #[arg(long, help = "Also write the JSON report to this file")]
    output: Option<PathBuf>,
    #[arg(long, help = "Path to a taskbench.toml (default: discovered)")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Demo(args) => {
            let succeeded = cmd_demo(args).await?;
            Ok(if succeeded {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::List => {
            cmd_list();
            Ok(ExitCode::SUCCESS)
        }
        Command::Init { output, force } => {
            cmd_init(&output, force)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "taskbench=debug"
    } else {
        "taskbench=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Settings for one demo run after merging flags over the config file.
#[derive(Debug)]
struct DemoPlan {
    bench: config::BenchConfig,
    format: OutputFormat,
    output: Option<PathBuf>,
    include_failing: bool,
}

fn resolve_demo(args: DemoArgs, resolver: &ConfigResolver) -> DemoPlan {
    let mut bench = resolver.bench();
    if let Some(time) = args.time {
        bench.time_ms = time;
    }
    if let Some(iterations) = args.iterations {
        bench.iterations = iterations;
    }
    if let Some(warmup_time) = args.warmup_time {
        bench.warmup_time_ms = warmup_time;
    }
    if let Some(warmup_iterations) = args.warmup_iterations {
        bench.warmup_iterations = warmup_iterations;
    }
    if args.no_warmup {
        bench.warmup = false;
    }

    DemoPlan {
        bench,
        format: resolver.resolve(args.format, |c| Some(c.output.format), OutputFormat::Table),
        output: args.output.or_else(|| resolver.output().path),
        include_failing: args.include_failing,
    }
}

/// Runs the demo and reports whether every task avoided an error.
async fn cmd_demo(args: DemoArgs) -> Result<bool> {
    let resolver = ConfigResolver::new(args.config.as_deref())?;
    if let Some(path) = &resolver.config_path {
        debug!(path = %path.display(), "loaded config");
    }
    let plan = resolve_demo(args, &resolver);

    let signal = AbortSignal::new();
    let mut bench = plan
        .bench
        .builder()
        .signal(signal.clone())
        .build()
        .context("invalid benchmark settings")?;
    demo::register(&mut bench, plan.include_failing);
    watch_progress(&mut bench);

    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, finishing the current invocation");
            signal.abort();
        }
    });
    bench.run().await;
    ctrl_c.abort();

    let report = bench.report();
    match plan.format {
        OutputFormat::Table => {
            print!("{}", output::render_table(&bench.table()));
            println!("\n{}", output::summary_line(&report));
        }
        OutputFormat::Json => println!("{}", report.to_json()?),
    }
    if let Some(path) = &plan.output {
        ensure_parent(path)?;
        report
            .write_json(path)
            .with_context(|| format!("writing report {:?}", path))?;
        info!(path = %path.display(), "wrote JSON report");
    }

    Ok(report.count(TaskState::Errored) == 0)
}

fn watch_progress(bench: &mut Bench) {
    bench.subscribe(EventKind::Cycle, |event| {
        if let Some(task) = event.task {
            match task.result() {
                Some(result) => info!(
                    task = %task.name(),
                    samples = result.sample_count(),
                    hz = result.hz,
                    rme = result.rme,
                    "task finished"
                ),
                None => info!(task = %task.name(), state = %task.state(), "task finished"),
            }
        }
    });
    bench.subscribe(EventKind::Abort, |_| {
        warn!("abort observed, remaining tasks skipped");
    });
}

fn cmd_list() {
    println!("Bundled demo tasks:");
    for task in demo::DEMO_TASKS {
        println!("  {:<12} {}", task.name, task.description);
    }
    println!(
        "  {:<12} {} (--include-failing)",
        demo::FAILING_TASK.name,
        demo::FAILING_TASK.description
    );
}

fn cmd_init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("refusing to overwrite existing file: {:?}", path);
    }
    ensure_parent(path)?;
    fs::write(path, TaskbenchConfig::generate_starter_toml())
        .with_context(|| format!("writing file {:?}", path))?;
    println!("Wrote starter config to {:?}", path);
    Ok(())
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating parent directory {:?}", parent))?;
    }
    Ok(())
}
