use anyhow::{Context, Result};
use clap::Parser;
use dropflow::config::{IngestConfig, default_media_extensions};
use dropflow::dispatcher::batch_exit_code;
use dropflow::{
    Category, Classifier, Cli, Commands, Dispatcher, ItemProcessor, ItemReport, ItemType,
    MediaItem, Pipeline, ProcessingOutcome, TagBlacklist, discover_items,
};
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::runtime::Runtime;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let code = match run(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("Error: {e:#}");
            1
        }
    };
    process::exit(code);
}

/// Logs go to stderr; stdout carries the command's own output
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Process {
            item_type,
            item_path,
            category_hint,
        } => run_process(&cli.config, item_type, item_path, category_hint),
        Commands::Scan => run_scan(&cli.config),
        Commands::Daemon { interval } => run_daemon(&cli.config, interval),
        Commands::Classify { name, hint } => run_classify(&cli.config, &name, hint),
    }
}

fn load_config(config_path: &Path) -> Result<IngestConfig> {
    tracing::info!("Loading configuration from: {}", config_path.display());
    IngestConfig::from_file(config_path)
        .with_context(|| format!("Failed to load configuration from {}", config_path.display()))
}

fn run_process(
    config_path: &Path,
    item_type: ItemType,
    item_path: PathBuf,
    category_hint: Option<Category>,
) -> Result<i32> {
    let config = load_config(config_path)?;
    let pipeline = Pipeline::from_config(&config)?;
    // A signal only raises the flag; the item in progress runs to its outcome
    install_shutdown_handler(&Arc::new(AtomicBool::new(false)));

    let hint = category_hint.or_else(|| item_type.category_hint());
    let item = match MediaItem::from_path(&item_path, hint) {
        Ok(item) => item,
        // Still goes through the pipeline, which reports it as vanished
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            MediaItem::new(item_path, item_type.kind(), hint)
        }
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to inspect {}", item_path.display()));
        }
    };

    let outcome = pipeline.process(&item);
    pipeline.finish();
    print_outcome(&item, &outcome);
    Ok(outcome.exit_code())
}

fn run_scan(config_path: &Path) -> Result<i32> {
    let config = load_config(config_path)?;
    let shutdown = Arc::new(AtomicBool::new(false));
    install_shutdown_handler(&shutdown);

    let runtime = build_runtime()?;
    let reports = scan_once(&config, &shutdown, &runtime)?;
    print_summary(&reports);
    Ok(batch_exit_code(&reports))
}

fn run_daemon(config_path: &Path, interval: u64) -> Result<i32> {
    let config = load_config(config_path)?;
    tracing::info!(
        "Starting daemon mode (interval: {}s, watching: {})",
        interval,
        config.watch_dir.display()
    );

    let shutdown = Arc::new(AtomicBool::new(false));
    install_shutdown_handler(&shutdown);
    let runtime = build_runtime()?;

    let mut run_number = 1;

    while !shutdown.load(Ordering::SeqCst) {
        tracing::info!("===== Scan #{run_number} =====");

        match scan_once(&config, &shutdown, &runtime) {
            Ok(reports) if reports.is_empty() => tracing::debug!("Drop folder is empty"),
            Ok(reports) => print_summary(&reports),
            // Continue running even after errors
            Err(e) => tracing::error!("Scan failed: {e:#}"),
        }

        if shutdown.load(Ordering::SeqCst) {
            break;
        }

        tracing::debug!("Sleeping for {interval} seconds until next scan...");

        // Sleep in smaller chunks to allow quick shutdown
        for _ in 0..interval {
            if shutdown.load(Ordering::SeqCst) {
                break;
            }
            std::thread::sleep(Duration::from_secs(1));
        }

        run_number += 1;
    }

    tracing::info!("Daemon stopped gracefully");
    Ok(0)
}

fn build_runtime() -> Result<Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")
}

fn scan_once(
    config: &IngestConfig,
    shutdown: &Arc<AtomicBool>,
    runtime: &Runtime,
) -> Result<Vec<ItemReport>> {
    let exclude = [
        config.error_dir.clone(),
        config.lock_dir.clone(),
        config.history_file.clone(),
        config.movies_dir.clone(),
        config.shows_dir.clone(),
    ];
    let items = discover_items(&config.watch_dir, &exclude)
        .with_context(|| format!("Failed to list {}", config.watch_dir.display()))?;
    if items.is_empty() {
        return Ok(Vec::new());
    }
    tracing::info!("Found {} items in {}", items.len(), config.watch_dir.display());

    let pipeline = Arc::new(Pipeline::from_config(config)?);
    let processor: Arc<dyn ItemProcessor> = Arc::<Pipeline>::clone(&pipeline);
    let dispatcher =
        Dispatcher::new(processor, config.max_concurrent).with_shutdown(Arc::clone(shutdown));

    let reports = runtime.block_on(dispatcher.run_batch(items));
    pipeline.finish();
    Ok(reports)
}

fn install_shutdown_handler(shutdown: &Arc<AtomicBool>) {
    let flag = Arc::clone(shutdown);
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received shutdown signal, finishing in-flight items...");
        flag.store(true, Ordering::SeqCst);
    }) {
        tracing::warn!("Failed to set Ctrl-C handler: {}", e);
    }
}

fn run_classify(config_path: &Path, name: &str, hint: Option<Category>) -> Result<i32> {
    // Works without a config; uses its blacklist and library roots when present
    let (classifier, movies_dir, shows_dir) = if config_path.exists() {
        let config = load_config(config_path)?;
        (
            Classifier::new(config.tag_blacklist()?, config.media_extensions.clone()),
            config.movies_dir,
            config.shows_dir,
        )
    } else {
        (
            Classifier::new(
                TagBlacklist::new(dropflow::classifier::DEFAULT_TAG_BLACKLIST)?,
                default_media_extensions(),
            ),
            PathBuf::from("Movies"),
            PathBuf::from("Shows"),
        )
    };

    match classifier.classify(name, hint) {
        Ok(result) => {
            println!("Category:    {}", result.category);
            println!("Title:       {}", result.display_title());
            if let Some(tag) = result.episode_tag() {
                println!("Episode:     {tag}");
            }
            println!(
                "Destination: {}",
                result.destination_template(&movies_dir, &shows_dir).display()
            );
            Ok(0)
        }
        Err(e) => {
            println!("Unclassifiable: {e}");
            Ok(1)
        }
    }
}

fn print_outcome(item: &MediaItem, outcome: &ProcessingOutcome) {
    match outcome {
        ProcessingOutcome::Success {
            destination,
            category,
        } => println!("✓ {} -> {} ({category})", item, destination.display()),
        ProcessingOutcome::Quarantined {
            reason,
            destination: Some(destination),
        } => println!("⚠ {} quarantined to {}: {reason}", item, destination.display()),
        ProcessingOutcome::Quarantined {
            reason,
            destination: None,
        } => println!("⚠ {} not quarantined: {reason}", item),
        ProcessingOutcome::Failed { reason } => println!("✗ {}: {reason}", item),
    }
}

fn print_summary(reports: &[ItemReport]) {
    println!("\n=== Scan Results ===");
    for report in reports {
        print_outcome(&report.item, &report.outcome);
    }

    let count = |label: &str| {
        reports
            .iter()
            .filter(|r| r.outcome.label() == label)
            .count()
    };
    println!("\nSummary:");
    println!("  Filed:       {}", count("success"));
    println!("  Quarantined: {}", count("quarantined"));
    println!("  Failed:      {}", count("failed"));
}
