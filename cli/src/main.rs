//! CLI entrypoint for tripsync
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};
use tripsync_application::{
    CompositeNotifier, ConsensusEngine, ConsensusResolver, DestinationResearcher, EndRouting,
    ItineraryPlanner, NotificationSink, PreferenceAggregator, RandomTieBreaker, RoutingStrategy,
    RunSupervisor, Supervisor, TokioSleeper, TripLanes, WorkerRegistry,
};
use tripsync_domain::RouteKey;
use tripsync_infrastructure::{
    ConfigLoader, FileConfig, HeuristicActivityGenerator, HeuristicItineraryGenerator,
    BroadcastNotifier, InMemoryTripStore, JsonlEventLog,
};
use tripsync_presentation::{
    Cli, ConsoleNotifier, OutputConfig, OutputFormatter, ProgressReporter, Scenario,
    ScenarioDriver, TripPlan, formatter_for,
};

/// Diagnostics go to stderr, and also to `log_file` when given.
///
/// `RUST_LOG` overrides the verbosity flag. The returned guard flushes the
/// file writer on drop.
fn init_tracing(verbose: u8, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace", // -vvv or more
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let directory = path.parent().filter(|p| !p.as_os_str().is_empty());
            let file_name = path
                .file_name()
                .with_context(|| format!("Invalid log file path: {}", path.display()))?;
            let appender =
                tracing_appender::rolling::never(directory.unwrap_or(Path::new(".")), file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(guard)
}

fn load_config(cli: &Cli) -> Result<FileConfig> {
    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_deref()).map_err(|e| anyhow::anyhow!(e))?
    };

    let errors = config.validate();
    if !errors.is_empty() {
        let listed: Vec<String> = errors.iter().map(|e| format!("  - {}", e)).collect();
        bail!("Invalid configuration:\n{}", listed.join("\n"));
    }
    Ok(config)
}

#[cfg(feature = "assist-http")]
fn routing_strategy(config: &FileConfig) -> Result<Arc<dyn RoutingStrategy>> {
    match &config.assist.endpoint {
        Some(endpoint) => {
            info!(endpoint = %endpoint, "Using assistive routing endpoint");
            let strategy = tripsync_infrastructure::HttpRoutingStrategy::new(
                endpoint.clone(),
                Duration::from_secs(config.assist.timeout_secs),
            )?;
            Ok(Arc::new(strategy))
        }
        None => Ok(Arc::new(EndRouting)),
    }
}

#[cfg(not(feature = "assist-http"))]
fn routing_strategy(config: &FileConfig) -> Result<Arc<dyn RoutingStrategy>> {
    if config.assist.endpoint.is_some() {
        warn!(
            timeout = ?Duration::from_secs(config.assist.timeout_secs),
            "assist.endpoint is set but this build lacks the assist-http feature; ignoring"
        );
    }
    Ok(Arc::new(EndRouting))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_deref());
        return Ok(());
    }

    let _log_guard = init_tracing(cli.verbose, cli.log_file.as_deref())?;

    let config = load_config(&cli)?;
    let output = OutputConfig {
        format: config.output.format.unwrap_or_default(),
        color: config.output.color,
        quiet: false,
    }
    .with_cli_overrides(cli.output.map(Into::into), cli.quiet);
    if !output.color {
        colored::control::set_override(false);
    }

    let Some(scenario_path) = cli.scenario.as_deref() else {
        bail!("A scenario file is required. See --help for the format.");
    };
    let scenario = Scenario::load(scenario_path)?;
    info!(trip_id = %scenario.trip_id(), actions = scenario.actions.len(), "Starting tripsync");

    let engine_config = config.to_engine_config();

    // === Dependency Injection ===
    let store = Arc::new(InMemoryTripStore::new());
    store.seed(scenario.seed_trip(), scenario.seed_preferences());

    let mut sinks: Vec<Arc<dyn NotificationSink>> = vec![Arc::new(
        ConsoleNotifier::new(if output.quiet {
            ProgressReporter::without_spinner()
        } else {
            ProgressReporter::new()
        })
        .quiet(output.quiet),
    )];
    let event_log_path = cli.event_log.clone().or_else(|| config.logging.event_log.clone());
    // File writes happen on a hub subscriber, not on the engine's tasks.
    let mut forwarder = None;
    if let Some(path) = event_log_path {
        match JsonlEventLog::new(&path) {
            Some(log) => {
                info!(path = %log.path().display(), "Writing trip events");
                let hub = Arc::new(BroadcastNotifier::default());
                forwarder = Some(hub.forward_to(Arc::new(log)));
                sinks.push(hub);
            }
            None => warn!(path = %path.display(), "Event log disabled"),
        }
    }
    let notifier: Arc<dyn NotificationSink> = Arc::new(CompositeNotifier::new(sinks));

    let sleeper = Arc::new(TokioSleeper);
    let engine = Arc::new(
        ConsensusEngine::new(
            store.clone(),
            notifier.clone(),
            Arc::new(RandomTieBreaker),
            Arc::new(TripLanes::new()),
        )
        .with_default_trip_days(engine_config.default_trip_days)
        .with_selection(engine_config.selection),
    );

    let registry = WorkerRegistry::new()
        .register(
            RouteKey::PREFERENCE_PROCESSOR,
            Arc::new(PreferenceAggregator::new(store.clone())),
            "Aggregates member preferences and opens the destination decision",
        )
        .register(
            RouteKey::DESTINATION_RESEARCHER,
            Arc::new(DestinationResearcher::new(
                Arc::new(HeuristicActivityGenerator::new()),
                sleeper.clone(),
                engine_config.retry.clone(),
                engine_config.research.clone(),
            )),
            "Researches activities at the chosen destination",
        )
        .register(
            RouteKey::ITINERARY_PLANNER,
            Arc::new(ItineraryPlanner::new(
                Arc::new(HeuristicItineraryGenerator::new()),
                sleeper,
                engine_config.retry.clone(),
            )),
            "Builds a day-by-day itinerary from the selected activities",
        )
        .register(
            RouteKey::CONSENSUS_RESOLVER,
            Arc::new(ConsensusResolver::new(engine.clone())),
            "Resolves the current consensus phase",
        );

    let supervisor = Supervisor::new(
        Arc::new(registry),
        routing_strategy(&config)?,
        engine_config.max_steps,
    );
    let mut runs = RunSupervisor::new(supervisor, engine, store.clone(), store.clone(), notifier);
    if let Some(goal) = &scenario.goal {
        runs = runs.with_goal(goal.clone());
    }

    let driver = ScenarioDriver::new(Arc::new(runs), store.clone(), store);
    let report = driver.drive(&scenario).await;
    if let Some(forwarder) = forwarder {
        forwarder.finish().await;
    }
    let report = report?;

    let plan = TripPlan::new(&report.trip, report.final_status, report.itinerary)
        .with_action_report(report.rejected, report.unused);
    println!("{}", formatter_for(output.format).format(&plan));

    Ok(())
}
