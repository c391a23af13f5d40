//! CLI entrypoint for mcp-conductor
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use conductor_application::{OrchestrationEngine, ToolCatalogPort};
use conductor_infrastructure::{
    ConfigLoader, FileConfig, JsonlConversationLogger, OpenAiChatRole, StdioConnector,
    ToolRegistry,
};
use conductor_presentation::{ChatRepl, Cli, ProgressReporter};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Kept alive until exit so buffered file logs are flushed
    let _log_guard = init_logging(&cli);

    if cli.show_config {
        show_config(&cli);
        return Ok(());
    }

    info!("Starting mcp-conductor");

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref()).context("Failed to load configuration")?
    };

    for missing in config.missing_env_vars() {
        warn!(
            provider = %missing.provider,
            "Environment variable ${{{}}} is not set; the argument is passed through unexpanded",
            missing.var
        );
    }

    // === Dependency Injection ===
    let registry = ToolRegistry::connect_all(&StdioConnector, &config.provider_specs()).await;
    for failure in registry.failures() {
        warn!(provider = %failure.provider(), "{}", failure);
        if !cli.quiet {
            eprintln!("{} {}", "warning:".yellow().bold(), failure);
        }
    }
    let stats = registry.stats();
    info!(
        providers = stats.total_providers,
        tools = stats.total_tools,
        failed = stats.failed_providers,
        "Tool registry ready"
    );

    let catalog: Arc<dyn ToolCatalogPort> = Arc::new(registry);
    let progress = (!cli.quiet).then(|| Arc::new(ProgressReporter::new()));
    let engine = match build_engine(&config, catalog.clone(), progress.clone()) {
        Ok(engine) => engine,
        Err(e) => {
            catalog.close().await;
            return Err(e);
        }
    };

    let result = run(&cli, &config, engine.clone(), progress).await;
    engine.close().await;
    result
}

fn init_logging(cli: &Cli) -> Option<WorkerGuard> {
    // -v wins over RUST_LOG; without either, warnings only
    let filter = if cli.verbose > 0 {
        EnvFilter::new(cli.log_level())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()))
    };

    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let (file_layer, guard) = match &cli.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "mcp-conductor.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}

fn show_config(cli: &Cli) {
    println!("{}", "Configuration sources (highest priority first):".bold());
    println!(
        "  {:<9} {}*",
        "Env".cyan(),
        conductor_infrastructure::config::ENV_PREFIX
    );
    for source in ConfigLoader::sources(cli.config.as_deref()) {
        let status = if source.found {
            "found".green()
        } else {
            "not found".dimmed()
        };
        println!(
            "  {:<9} {} ({})",
            source.label.cyan(),
            source.path.display(),
            status
        );
    }
}

fn build_engine(
    config: &FileConfig,
    catalog: Arc<dyn ToolCatalogPort>,
    progress: Option<Arc<ProgressReporter>>,
) -> Result<OrchestrationEngine> {
    if config.roles.resolve_api_key().is_none() {
        warn!(
            "No API key found in ${}; requests are sent unauthenticated",
            config.roles.api_key_env
        );
    }

    let advisor = OpenAiChatRole::advisor(&config.roles.advisory(), catalog.as_ref())
        .context("Failed to create advisory role")?;
    let executor = OpenAiChatRole::executor(&config.roles.execution(), catalog.clone())
        .context("Failed to create execution role")?;

    let mut engine = OrchestrationEngine::new(catalog, Arc::new(advisor), Arc::new(executor));

    if let Some(path) = &config.logging.conversation_log {
        let logger = JsonlConversationLogger::open(path)
            .with_context(|| format!("Failed to open conversation log {}", path.display()))?;
        info!(path = %path.display(), "Conversation log enabled");
        engine = engine.with_conversation_logger(Arc::new(logger));
    }

    if let Some(progress) = progress {
        engine = engine.with_progress(progress);
    }

    Ok(engine)
}

async fn run(
    cli: &Cli,
    config: &FileConfig,
    engine: OrchestrationEngine,
    progress: Option<Arc<ProgressReporter>>,
) -> Result<()> {
    let mut repl = ChatRepl::new(engine)
        .with_stream(cli.stream || config.behavior.stream)
        .with_auto_execute(config.behavior.auto_execute && !cli.no_auto_execute);
    if let Some(progress) = progress {
        repl = repl.with_progress(progress);
    }

    match &cli.prompt {
        Some(prompt) => repl.respond(prompt).await,
        None => repl.run().await.context("Chat session failed")?,
    }

    Ok(())
}
