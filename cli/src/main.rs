//! CLI entrypoint for plan-relay
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use relay_application::{
    NoProgress, PipelineProgressNotifier, RunLogger, RunPipelineUseCase,
};
use relay_domain::{ActionExtractor, ToolKind, ToolRegistry, system_prompt};
use relay_infrastructure::{
    BackendServer, ConfigLoader, FileConfig, HttpBackendTransport, JsonlRunLogger,
};
use relay_presentation::{
    Cli, Command, ConsoleFormatter, OutputFormat, ProgressReporter, ServeTarget,
};
use serde_json::json;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_ref());
        return Ok(());
    }

    // === Configuration ===
    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).context("Failed to load configuration")?
    };

    let log_guard = init_logging(cli.verbose, &config);
    info!("Starting plan-relay");

    let issues = config.validate();
    for issue in issues.iter().filter(|i| !i.is_error()) {
        warn!("{}", issue.message);
    }
    let errors: Vec<_> = issues.iter().filter(|i| i.is_error()).collect();
    if !errors.is_empty() {
        for issue in &errors {
            error!("{}", issue.message);
            eprintln!("config error: {}", issue.message);
        }
        bail!("Invalid configuration ({} error(s))", errors.len());
    }

    let Some(command) = cli.command else {
        bail!("No command given. Run `plan-relay --help` for usage.");
    };

    let succeeded = match command {
        Command::Extract { plan_file, output } => {
            let plan_text = read_plan(plan_file.as_deref())?;
            extract(&config.to_registry(), &plan_text, output);
            true
        }
        Command::Run { plan_file, output } => {
            let plan_text = read_plan(plan_file.as_deref())?;
            run(&config, &plan_text, output, cli.quiet).await
        }
        Command::Serve { target } => {
            serve(&config, target).await?;
            true
        }
        Command::Tools { output } => {
            let registry = config.to_registry();
            match output {
                OutputFormat::Text => print!("{}", ConsoleFormatter::format_tools(&registry)),
                OutputFormat::Json => {
                    let tools: Vec<_> = registry
                        .all()
                        .map(|spec| {
                            json!({
                                "tool": spec,
                                "url": spec.url(),
                                "aliases": registry.aliases_of(&spec.name),
                            })
                        })
                        .collect();
                    println!("{}", ConsoleFormatter::format_json(&tools));
                }
            }
            true
        }
        Command::Prompt => {
            println!("{}", system_prompt(&config.to_registry()));
            true
        }
    };

    if !succeeded {
        // flush file logs before exiting non-zero
        drop(log_guard);
        std::process::exit(1);
    }
    Ok(())
}

/// Console logging filtered by `-v` (or `RUST_LOG`), plus daily-rolling
/// files when `logging.dir` is set. The guard must outlive the program.
fn init_logging(verbose: u8, config: &FileConfig) -> Option<WorkerGuard> {
    let filter = std::env::var("RUST_LOG")
        .ok()
        .and_then(|value| EnvFilter::try_new(value).ok())
        .unwrap_or_else(|| match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"), // -vvv or more
        });

    let console = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let (file_layer, guard) = match &config.logging.dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, &config.logging.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .init();

    guard
}

fn read_plan(path: Option<&Path>) -> Result<String> {
    let text = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read plan file {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read plan from stdin")?;
            buf
        }
    };
    if text.trim().is_empty() {
        bail!("Plan text is empty");
    }
    Ok(text)
}

fn extract(registry: &ToolRegistry, plan_text: &str, output: OutputFormat) {
    let extractor = ActionExtractor::new(registry);
    let (outcome, fallback) = extractor.extract_with_fallback(plan_text);
    info!("Extraction: {}", outcome.kind_str());

    match output {
        OutputFormat::Text => {
            print!("{}", ConsoleFormatter::format_extraction(&outcome, fallback.as_deref()))
        }
        OutputFormat::Json => println!(
            "{}",
            ConsoleFormatter::format_json(&json!({
                "extraction": outcome,
                "fallback": fallback,
            }))
        ),
    }
}

/// Returns whether the run ended without an error outcome.
async fn run(config: &FileConfig, plan_text: &str, output: OutputFormat, quiet: bool) -> bool {
    // === Dependency Injection ===
    let registry = Arc::new(config.to_registry());
    let transport = Arc::new(HttpBackendTransport::new());
    let mut use_case =
        RunPipelineUseCase::new(registry, transport, config.to_execution_params());

    if let Some(path) = &config.logging.run_log {
        match JsonlRunLogger::new(path) {
            Some(logger) => {
                let logger: Arc<dyn RunLogger> = Arc::new(logger);
                use_case = use_case.with_run_logger(logger);
            }
            None => warn!("Run log disabled: cannot open {}", path.display()),
        }
    }

    let progress: Box<dyn PipelineProgressNotifier> = if quiet || output == OutputFormat::Json {
        Box::new(NoProgress)
    } else {
        Box::new(ProgressReporter::new())
    };

    let result = use_case.run_plan_text(plan_text, progress.as_ref()).await;
    use_case.log_run(&result);

    match output {
        OutputFormat::Text => print!("{}", ConsoleFormatter::format_output(&result)),
        OutputFormat::Json => println!("{}", ConsoleFormatter::format_json(&result)),
    }

    !result.outcome.is_error()
}

async fn serve(config: &FileConfig, target: ServeTarget) -> Result<()> {
    let settings = config.backends.to_settings();
    let mut servers = Vec::new();

    for kind in target.kinds() {
        let bind = config.backends.bind_for(kind);
        let server = BackendServer::start(kind, bind, &settings)
            .await
            .with_context(|| format!("Failed to start {} backend", kind))?;
        println!("{} backend listening on {}", kind, server.base_url());
        servers.push(server);
    }

    if target.kinds().contains(&ToolKind::Sql) {
        for (name, path) in &settings.sql.databases {
            if !path.exists() {
                warn!("Database '{}' not found at {}", name, path.display());
            }
        }
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    info!("Shutting down {} backend(s)", servers.len());

    for server in servers {
        server.stop().await;
    }
    Ok(())
}
