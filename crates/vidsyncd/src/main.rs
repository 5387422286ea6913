// # vidsyncd - Upload Feed Sync Daemon
//
// The vidsyncd daemon is a thin integration layer. It is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Registering the feed client and state stores
// 4. Running the sync scheduler until SIGTERM/SIGINT
//
// All sync logic lives in vidsync-core.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Feed
// - `VIDSYNC_YOUTUBE_API_KEY`: YouTube Data API key
// - `VIDSYNC_CHANNEL_ID`: Channel whose uploads are synced
// - `VIDSYNC_YOUTUBE_API_BASE`: API base URL (default: Google's v3 endpoint)
// - `VIDSYNC_PAGE_SIZE`: Entries per page, 1-50 (default: 50)
// - `VIDSYNC_REQUEST_TIMEOUT_SECS`: Per-request timeout (default: 30)
//
// Without an API key or channel id, sync is disabled and the daemon only
// waits for a shutdown signal.
//
// ### State Store
// - `VIDSYNC_STATE_STORE_TYPE`: Type of state store (file, memory)
// - `VIDSYNC_STATE_STORE_PATH`: Path to state file (default: db.json)
//
// ### Engine
// - `VIDSYNC_POLL_INTERVAL_SECS`: Seconds between cycles (default: 300)
// - `VIDSYNC_NOTIFY_ON_FIRST_RUN`: Announce the initial backlog (default: true)
// - `VIDSYNC_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
//
// ## Example
//
// ```bash
// export VIDSYNC_YOUTUBE_API_KEY=your_key
// export VIDSYNC_CHANNEL_ID=UC_x5XG1OV2P6uZZ5FSM9Ttw
// export VIDSYNC_STATE_STORE_PATH=/var/lib/vidsync/db.json
//
// vidsyncd
// ```

use anyhow::Result;
use std::env;
use std::fmt::Display;
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_stream::StreamExt;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;
use vidsync_core::config::DEFAULT_YOUTUBE_API_BASE;
use vidsync_core::{
    EngineConfig, FeedConfig, ItemsReader, Registry, Scheduler, SchedulerExit, StateStoreConfig,
    SyncConfig, SyncEngine, SyncEvent, TracingNotifier,
};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// How long an in-flight cycle may take to finish after a shutdown signal
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(60);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum VidsyncExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<VidsyncExitCode> for ExitCode {
    fn from(code: VidsyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
#[derive(Debug)]
struct Config {
    /// Sync settings; `None` when credentials are absent
    sync: Option<SyncConfig>,
    state_store: StateStoreConfig,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through a variable lookup
    ///
    /// Empty values are treated as unset.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let state_store = match var("VIDSYNC_STATE_STORE_TYPE").as_deref().unwrap_or("file") {
            "file" => StateStoreConfig::File {
                path: var("VIDSYNC_STATE_STORE_PATH").unwrap_or_else(|| "db.json".to_string()),
            },
            "memory" => StateStoreConfig::Memory,
            other => anyhow::bail!(
                "VIDSYNC_STATE_STORE_TYPE '{}' is not supported. \
                Supported types: file, memory",
                other
            ),
        };

        let engine = EngineConfig {
            poll_interval_secs: parse_var(&var, "VIDSYNC_POLL_INTERVAL_SECS", 300)?,
            notify_on_first_run: parse_bool_var(&var, "VIDSYNC_NOTIFY_ON_FIRST_RUN", true)?,
            ..EngineConfig::default()
        };

        let sync = match (var("VIDSYNC_YOUTUBE_API_KEY"), var("VIDSYNC_CHANNEL_ID")) {
            (Some(api_key), Some(channel_id)) => Some(SyncConfig {
                feed: FeedConfig::Youtube {
                    api_key,
                    channel_id,
                    api_base: var("VIDSYNC_YOUTUBE_API_BASE")
                        .unwrap_or_else(|| DEFAULT_YOUTUBE_API_BASE.to_string()),
                    page_size: parse_var(&var, "VIDSYNC_PAGE_SIZE", 50)?,
                    request_timeout_secs: parse_var(&var, "VIDSYNC_REQUEST_TIMEOUT_SECS", 30)?,
                },
                state_store: state_store.clone(),
                engine,
            }),
            _ => None,
        };

        Ok(Self {
            sync,
            state_store,
            log_level: var("VIDSYNC_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        if let Some(ref sync) = self.sync {
            sync.validate()?;
        } else {
            self.state_store.validate()?;
        }

        if let StateStoreConfig::File { ref path } = self.state_store
            && let Some(parent) = std::path::Path::new(path).parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            anyhow::bail!(
                "VIDSYNC_STATE_STORE_PATH parent directory does not exist: {}. \
                    Create it first: mkdir -p {}",
                parent.display(),
                parent.display()
            );
        }

        self.level()?;
        Ok(())
    }

    fn level(&self) -> Result<Level> {
        Ok(match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => anyhow::bail!(
                "VIDSYNC_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        })
    }
}

fn parse_var<T>(var: impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match var(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{} has an invalid value '{}': {}", name, raw, e)),
        None => Ok(default),
    }
}

fn parse_bool_var(var: impl Fn(&str) -> Option<String>, name: &str, default: bool) -> Result<bool> {
    match var(name).map(|raw| raw.trim().to_lowercase()).as_deref() {
        None => Ok(default),
        Some("true" | "1" | "yes" | "on") => Ok(true),
        Some("false" | "0" | "no" | "off") => Ok(false),
        Some(other) => anyhow::bail!("{} must be true or false. Got: {}", name, other),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return VidsyncExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return VidsyncExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = config.level().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return VidsyncExitCode::ConfigError.into();
    }

    info!("Starting vidsyncd daemon");
    info!("State store: {}", config.state_store.type_name());

    // Enter tokio runtime
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return VidsyncExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        match run_daemon(config).await {
            Ok(()) => VidsyncExitCode::CleanShutdown,
            Err(e) => {
                error!("Daemon error: {}", e);
                exit_code_for(&e)
            }
        }
    });

    result.into()
}

/// Rejected configuration found at startup exits with 1, anything else with 2
fn exit_code_for(err: &anyhow::Error) -> VidsyncExitCode {
    match err.downcast_ref::<vidsync_core::Error>() {
        Some(e) if e.is_permanent() => VidsyncExitCode::ConfigError,
        _ => VidsyncExitCode::RuntimeError,
    }
}

/// Run the daemon
async fn run_daemon(config: Config) -> Result<()> {
    let registry = Registry::with_builtin_stores();

    #[cfg(feature = "youtube")]
    {
        info!("Registering YouTube feed client");
        vidsync_feed_youtube::register(&registry);
    }

    let Some(sync) = config.sync else {
        warn!(
            "Sync disabled: VIDSYNC_YOUTUBE_API_KEY and VIDSYNC_CHANNEL_ID must both be set"
        );
        let store = registry.create_state_store(&config.state_store)?;
        match store.load().await {
            Ok(state) => info!("{} persisted items available", state.items.len()),
            Err(e) => warn!("Could not load persisted items: {}", e),
        }
        let signal = wait_for_shutdown().await?;
        info!("Received shutdown signal: {}", signal);
        return Ok(());
    };

    info!("Feed: {:?}", sync.feed);

    let feed_client = registry.create_feed_client(&sync.feed)?;
    let state_store = registry.create_state_store(&sync.state_store)?;
    let (engine, reader, events) = SyncEngine::new(
        feed_client,
        state_store,
        Box::new(TracingNotifier),
        &sync.engine,
    )?;

    tokio::spawn(log_events(events));
    tokio::spawn(log_published_items(reader));

    let scheduler = Scheduler::new(engine, sync.feed.channel_id(), &sync.engine);
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let mut scheduler_task =
        tokio::spawn(async move { scheduler.run_with_shutdown(shutdown_rx).await });

    tokio::select! {
        signal = wait_for_shutdown() => {
            info!("Received shutdown signal: {}", signal?);
            let _ = shutdown_tx.send(());

            match tokio::time::timeout(SHUTDOWN_TIMEOUT, scheduler_task).await {
                Ok(Ok(_)) => info!("Shutting down daemon"),
                Ok(Err(e)) => anyhow::bail!("Scheduler task failed: {}", e),
                Err(_) => anyhow::bail!("Scheduler did not stop within {:?}", SHUTDOWN_TIMEOUT),
            }
        }

        exit = &mut scheduler_task => {
            match exit.map_err(|e| anyhow::anyhow!("Scheduler task failed: {}", e))? {
                SchedulerExit::Disabled(e) => {
                    warn!("Sync disabled until restart: {}", e);
                    let signal = wait_for_shutdown().await?;
                    info!("Received shutdown signal: {}", signal);
                }
                SchedulerExit::Stopped => info!("Scheduler stopped"),
            }
        }
    }

    Ok(())
}

/// Surface engine events in the log
async fn log_events(mut events: mpsc::Receiver<SyncEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            SyncEvent::Merged { .. } | SyncEvent::CursorSeeded { .. } => info!("{:?}", event),
            SyncEvent::Disabled { .. } | SyncEvent::PersistFailed { .. } => warn!("{:?}", event),
            _ => debug!("{:?}", event),
        }
    }
}

/// Report the size of every published item list
async fn log_published_items(reader: ItemsReader) {
    let mut changes = reader.changes();
    while let Some(items) = changes.next().await {
        debug!("{} items available to readers", items.len());
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
