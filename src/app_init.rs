use std::{sync::Arc, time::Duration};

use tokio::sync::mpsc;
use tracing::{debug, info, instrument};
use tracing_appender::non_blocking::WorkerGuard;

use crate::{
    client::{ClientConfig, GithubApi, GithubClient},
    clock::SystemClock,
    config::AppConfig,
    dispatcher::ChannelBadgeSink,
    host,
    logging::{LoggingConfig, init_logging},
    result::{Result, StarsError},
    router::MessageRouter,
    service::StarsService,
    storage::KeyValueStore,
};

/// How often expired star counts are swept from the cache
const CACHE_SWEEP_INTERVAL: Duration = Duration::from_secs(60 * 60);

pub fn initialize_logging(config: &AppConfig, debug: bool) -> Result<Option<WorkerGuard>> {
    let mut logging_config = LoggingConfig::from_env();

    // Env var wins over the config file; --debug wins over both
    if logging_config.filter.is_none() {
        logging_config.filter = config.log_level.clone();
    }
    if debug {
        logging_config.filter = Some("debug".into());
    }
    if logging_config.log_dir.is_none() {
        logging_config.log_dir = Some(config.log_directory());
    }

    init_logging(logging_config)
        .map_err(|e| StarsError::general(format!("Failed to initialize logging: {e}")))
}

pub fn create_github_client(config: &AppConfig) -> Result<Arc<GithubApi>> {
    let client_config = ClientConfig::from(config);
    Ok(Arc::new(GithubApi::new(client_config)?))
}

/// Serve the extension over stdin/stdout until stdin closes
#[instrument(skip_all)]
pub async fn run_host<C, S>(client: Arc<C>, storage: S) -> Result<()>
where
    C: GithubClient,
    S: KeyValueStore,
{
    let (sender, receiver) = mpsc::unbounded_channel();

    let service = Arc::new(StarsService::new(
        client,
        storage,
        Arc::new(SystemClock),
        Arc::new(ChannelBadgeSink::new(sender.clone())),
    )?);
    service.spawn_rate_limit_refresh();

    let sweeper = tokio::spawn(sweep_cache(Arc::clone(&service)));

    info!("Native messaging host ready");
    let outcome = host::run(
        tokio::io::stdin(),
        tokio::io::stdout(),
        MessageRouter::new(service),
        sender,
        receiver,
    )
    .await;

    sweeper.abort();
    info!("Native messaging host stopped");
    outcome
}

async fn sweep_cache<C, S>(service: Arc<StarsService<C, S>>)
where
    C: GithubClient,
    S: KeyValueStore,
{
    let mut interval = tokio::time::interval(CACHE_SWEEP_INTERVAL);
    // The first tick completes immediately
    interval.tick().await;

    loop {
        interval.tick().await;
        let removed = service.cache().purge_expired();
        debug!(removed, remaining = service.cache().len(), "Swept star cache");
    }
}
