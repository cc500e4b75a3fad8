// # dnsyncd - DNS sync daemon
//
// Thin integration layer: all reconciliation logic lives in dnsync-core.
//
// The dnsyncd daemon is responsible for:
// 1. Reading process settings from environment variables
// 2. Loading the YAML domain configuration
// 3. Registering providers and resolution strategies
// 4. Running the engine once, or on a fixed interval until signalled
//
// ## Configuration
//
// - `DNSYNC_CONFIG`: Path to the YAML configuration (default `/app/config/config.yml`)
// - `DNSYNC_LOG_LEVEL`: trace, debug, info, warn or error (default `info`)
// - `DNSYNC_INTERVAL_SECS`: Seconds between runs; unset means run once and exit
//
// ## Example
//
// ```bash
// export DNSYNC_CONFIG=/etc/dnsync/config.yml
// export DNSYNC_INTERVAL_SECS=300
//
// dnsyncd
// ```

use anyhow::Result;
use dnsync_core::config::DEFAULT_CONFIG_PATH;
use dnsync_core::{EngineEvent, ProviderRegistry, SyncConfig, SyncEngine};
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};

/// Shortest accepted interval between runs
const MIN_INTERVAL_SECS: u64 = 10;

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DnsyncExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DnsyncExitCode> for ExitCode {
    fn from(code: DnsyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Process settings
#[derive(Debug, Clone, PartialEq, Eq)]
struct Config {
    config_path: PathBuf,
    log_level: String,
    interval: Option<Duration>,
}

impl Config {
    /// Load settings from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load settings through `lookup`
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let interval = match lookup("DNSYNC_INTERVAL_SECS") {
            Some(raw) => {
                let secs: u64 = raw.trim().parse().map_err(|_| {
                    anyhow::anyhow!("DNSYNC_INTERVAL_SECS must be a whole number of seconds. Got: {}", raw)
                })?;
                Some(Duration::from_secs(secs))
            }
            None => None,
        };

        Ok(Self {
            config_path: lookup("DNSYNC_CONFIG")
                .filter(|path| !path.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
                .into(),
            log_level: lookup("DNSYNC_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            interval,
        })
    }

    /// Validate the settings
    fn validate(&self) -> Result<()> {
        if let Some(interval) = self.interval
            && interval.as_secs() < MIN_INTERVAL_SECS
        {
            anyhow::bail!(
                "DNSYNC_INTERVAL_SECS must be at least {} seconds. Got: {}",
                MIN_INTERVAL_SECS,
                interval.as_secs()
            );
        }

        self.level()?;
        Ok(())
    }

    fn level(&self) -> Result<Level> {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Ok(Level::TRACE),
            "debug" => Ok(Level::DEBUG),
            "info" => Ok(Level::INFO),
            "warn" => Ok(Level::WARN),
            "error" => Ok(Level::ERROR),
            _ => anyhow::bail!(
                "DNSYNC_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DnsyncExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return DnsyncExitCode::ConfigError.into();
    }

    let log_level = config.level().unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DnsyncExitCode::ConfigError.into();
    }

    info!("Starting dnsyncd");

    // A broken configuration aborts before any network activity
    let sync_config = match SyncConfig::load(&config.config_path) {
        Ok(sync_config) => sync_config,
        Err(e) => {
            error!(
                "Failed to load configuration from {}: {}",
                config.config_path.display(),
                e
            );
            return DnsyncExitCode::ConfigError.into();
        }
    };

    info!(
        "Configuration loaded: {} domain(s) from {}",
        sync_config.domains.len(),
        config.config_path.display()
    );

    let (engine, events) = match SyncEngine::new(sync_config, build_registry()) {
        Ok(pair) => pair,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return DnsyncExitCode::ConfigError.into();
        }
    };

    // Runs are strictly sequential, one thread is enough
    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DnsyncExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(engine, events, config.interval).await {
            error!("Daemon error: {}", e);
            DnsyncExitCode::RuntimeError
        } else {
            DnsyncExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Register every compiled-in provider and resolution strategy
fn build_registry() -> Arc<ProviderRegistry> {
    let registry = ProviderRegistry::new();

    #[cfg(feature = "ns1")]
    {
        info!("Registering NS1 provider");
        dnsync_provider_ns1::register(&registry);
    }

    #[cfg(feature = "linode")]
    {
        info!("Registering Linode cloud-instance resolver");
        dnsync_ip_linode::register(&registry);
    }

    #[cfg(feature = "http")]
    {
        info!("Registering external-probe resolver");
        dnsync_ip_http::register(&registry);
    }

    Arc::new(registry)
}

/// Run once, or every `interval` until SIGTERM/SIGINT
async fn run_daemon(
    engine: SyncEngine,
    mut events: mpsc::Receiver<EngineEvent>,
    interval: Option<Duration>,
) -> Result<()> {
    let Some(interval) = interval else {
        engine.run_once().await;
        log_events(&mut events);
        return Ok(());
    };

    let mut shutdown = Shutdown::install()?;
    info!("Running every {:?}", interval);

    loop {
        engine.run_once().await;
        log_events(&mut events);

        // Signals are only honoured between runs
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            signal = shutdown.recv() => {
                info!("Received shutdown signal: {}", signal?);
                info!("Shutting down daemon");
                return Ok(());
            }
        }
    }
}

/// Drain pending engine events into the log
fn log_events(events: &mut mpsc::Receiver<EngineEvent>) {
    while let Ok(event) = events.try_recv() {
        match event {
            EngineEvent::RunCompleted { report } if report.has_failures() => {
                warn!(
                    "Run finished with failures: {} subdomain(s) failed, {} host(s) and {} domain(s) skipped",
                    report.failed_subdomains, report.skipped_hosts, report.skipped_domains
                );
            }
            other => debug!("Engine event: {:?}", other),
        }
    }
}

/// SIGTERM/SIGINT listener
#[cfg(unix)]
struct Shutdown {
    sigterm: Signal,
    sigint: Signal,
}

#[cfg(unix)]
impl Shutdown {
    fn install() -> Result<Self> {
        let sigterm = signal(SignalKind::terminate())
            .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
        let sigint = signal(SignalKind::interrupt())
            .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;
        Ok(Self { sigterm, sigint })
    }

    /// Wait for the next signal and return its name
    async fn recv(&mut self) -> Result<&'static str> {
        tokio::select! {
            _ = self.sigterm.recv() => Ok("SIGTERM"),
            _ = self.sigint.recv() => Ok("SIGINT"),
        }
    }
}

/// CTRL-C listener
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
struct Shutdown;

#[cfg(not(unix))]
impl Shutdown {
    fn install() -> Result<Self> {
        Ok(Self)
    }

    async fn recv(&mut self) -> Result<&'static str> {
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
        Ok("SIGINT")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_run_once_with_default_path() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.config_path, PathBuf::from("/app/config/config.yml"));
        assert_eq!(config.interval, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn interval_is_parsed_and_bounded() {
        let config = config_from(&[("DNSYNC_INTERVAL_SECS", "300")]).unwrap();
        assert_eq!(config.interval, Some(Duration::from_secs(300)));
        assert!(config.validate().is_ok());

        let too_short = config_from(&[("DNSYNC_INTERVAL_SECS", "5")]).unwrap();
        assert!(too_short.validate().is_err());

        assert!(config_from(&[("DNSYNC_INTERVAL_SECS", "soon")]).is_err());
    }

    #[test]
    fn log_level_is_validated() {
        let config = config_from(&[("DNSYNC_LOG_LEVEL", "DEBUG")]).unwrap();
        assert_eq!(config.level().unwrap(), Level::DEBUG);

        let config = config_from(&[("DNSYNC_LOG_LEVEL", "chatty")]).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn config_path_override() {
        let config = config_from(&[("DNSYNC_CONFIG", "/etc/dnsync.yml")]).unwrap();
        assert_eq!(config.config_path, PathBuf::from("/etc/dnsync.yml"));
    }

    #[test]
    fn registry_has_default_features() {
        let registry = build_registry();

        #[cfg(feature = "ns1")]
        assert!(registry.has_provider("ns1"));
        #[cfg(feature = "linode")]
        assert!(registry.has_resolver("LinodeAPI"));
        #[cfg(feature = "http")]
        assert!(registry.has_resolver("external"));
        let _ = registry;
    }
}
