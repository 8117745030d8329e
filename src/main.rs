mod config;
mod dummy;
mod http;
mod registry;
mod seed;
mod sensor;
mod tasks;
mod timestamp;

use crate::{config::Config, registry::SensorRegistry, timestamp::Timestamp};
use futures_util::{stream, StreamExt};
use sensor::Measurement;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{
    signal::unix::{self, SignalKind},
    sync::RwLock,
    task,
};
use tokio_stream::wrappers::SignalStream;

const DEMO_PERIOD: Duration = Duration::from_secs(10);

async fn run(config: Config) -> Result<(), eyre::Error> {
    let seed = match config.seed_file {
        Some(ref path) => {
            tracing::info!("Loading sensors from {}", path.display());
            seed::load(path)?
        }
        None => seed::default_readings(),
    };
    let registry = SensorRegistry::new(seed, Timestamp::now())?;
    let counts = registry.counts();
    tracing::info!(
        "Monitoring {} sensors: {} active, {} warning, {} critical, {} offline",
        registry.len(),
        counts.active,
        counts.warning,
        counts.critical,
        counts.offline
    );

    let addr = SocketAddr::from((config.host, config.port));
    let demo = config.demo;
    let ctx = Context::new(config, registry);

    let update_task = if demo {
        let sensors: Vec<_> = ctx
            .sensors
            .read()
            .await
            .list()
            .map(|reading| {
                let measurement = Measurement {
                    temperature: reading.temperature,
                    smoke_level: reading.smoke_level,
                };
                (reading.id.clone(), measurement)
            })
            .collect();
        tracing::info!("Simulating reports for {} sensors", sensors.len());
        let (dummy_task, dummy_stream) = dummy::dummy_feed(sensors, DEMO_PERIOD);
        task::spawn(dummy_task);
        Some(task::spawn(tasks::update(ctx.clone(), dummy_stream)))
    } else {
        tracing::info!("No report source configured, serving seed readings as they are");
        None
    };

    let term = SignalStream::new(unix::signal(SignalKind::terminate())?);
    let int = SignalStream::new(unix::signal(SignalKind::interrupt())?);
    let shutdown = async move {
        let signal = stream::select(term, int);
        tokio::pin!(signal);
        match update_task {
            Some(update_task) => {
                tokio::select! {
                    Err(e) = update_task => {
                        tracing::error!("Update task failed: {}", e);
                    }
                    _ = signal.next() => {}
                }
            }
            None => {
                signal.next().await;
            }
        }
        tracing::info!("Shutting down");
    };

    let (addr, svr) = http::serve(ctx, addr, shutdown)?;
    tracing::info!("Started server on {}", addr);

    svr.await;

    Ok(())
}

fn main() -> Result<(), eyre::Error> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let config = Config::from_env()?;

    let rt = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()?;

    rt.block_on(run(config))
}

#[derive(derive_more::Deref, Clone)]
pub(crate) struct Context(Arc<ContextInner>);

impl Context {
    pub fn new(config: Config, registry: SensorRegistry) -> Self {
        Self(Arc::new(ContextInner {
            sensors: RwLock::new(registry),
            config,
        }))
    }
}

pub(crate) struct ContextInner {
    pub(crate) sensors: RwLock<SensorRegistry>,
    pub(crate) config: Config,
}
