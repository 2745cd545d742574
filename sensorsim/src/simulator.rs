//! Composition root: one generator per device plus the HTTP exporter.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::SimulatorConfig;
use crate::generator::ReadingGenerator;
use crate::http::HttpServer;
use crate::sink::{MetricsSink, SharedSink};

/// A configured but not yet started simulator.
pub struct Simulator {
    config: SimulatorConfig,
    sink: SharedSink,
}

impl Simulator {
    /// Create a simulator with a fresh sink.
    pub fn new(config: SimulatorConfig) -> Self {
        Self::with_sink(config, MetricsSink::shared())
    }

    /// Create a simulator that publishes into an existing sink.
    pub fn with_sink(config: SimulatorConfig, sink: SharedSink) -> Self {
        Self { config, sink }
    }

    pub fn sink(&self) -> &SharedSink {
        &self.sink
    }

    /// Build one generator per configured device.
    pub fn generators(&self) -> Vec<ReadingGenerator> {
        let simulation = &self.config.simulation;

        self.config
            .devices
            .iter()
            .enumerate()
            .map(|(index, device)| {
                let generator = ReadingGenerator::new(
                    device.clone(),
                    self.sink.clone(),
                    simulation.interval(),
                    simulation.temperature,
                    simulation.humidity,
                );
                match simulation.seed_for(index) {
                    Some(seed) => generator.with_seed(seed),
                    None => generator,
                }
            })
            .collect()
    }

    /// Bind the exporter, then spawn the generators and the HTTP server.
    ///
    /// An invalid configuration or a bind failure is returned before any
    /// generator is started.
    pub async fn start(self, shutdown: watch::Receiver<bool>) -> anyhow::Result<RunningSimulator> {
        self.config.validate()?;

        let listen_addr: SocketAddr = self
            .config
            .prometheus
            .listen
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid listen address: {}", e))?;

        let server = HttpServer::new(
            self.sink.clone(),
            listen_addr,
            self.config.prometheus.path.clone(),
            self.config.distinct_device_count(),
        );
        let listener = server.bind().await?;
        let local_addr = listener.local_addr()?;

        let generators: Vec<_> = self
            .generators()
            .into_iter()
            .map(|generator| tokio::spawn(generator.run(shutdown.clone())))
            .collect();

        info!(
            devices = generators.len(),
            interval_ms = self.config.simulation.interval_ms,
            "Started reading generators"
        );

        let http = tokio::spawn(server.serve(listener, shutdown));

        Ok(RunningSimulator {
            local_addr,
            sink: self.sink,
            generators,
            http: Some(http),
        })
    }
}

/// Handles to the tasks of a started simulator.
pub struct RunningSimulator {
    local_addr: SocketAddr,
    sink: SharedSink,
    generators: Vec<JoinHandle<u64>>,
    http: Option<JoinHandle<anyhow::Result<()>>>,
}

impl RunningSimulator {
    /// Address the exporter is listening on.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn sink(&self) -> &SharedSink {
        &self.sink
    }

    /// Wait for the HTTP server task to finish on its own.
    ///
    /// Cancel-safe: if the returned future is dropped the task can still be
    /// awaited later. Never resolves once the task has already been reaped.
    pub async fn http_stopped(&mut self) -> anyhow::Result<()> {
        let Some(handle) = self.http.as_mut() else {
            return std::future::pending().await;
        };

        let result = handle.await;
        self.http = None;
        result.map_err(|e| anyhow::anyhow!("HTTP server task failed: {}", e))?
    }

    /// Wait for every task to exit, giving up after `timeout`.
    ///
    /// Returns the total number of samples generated by generators that
    /// finished in time.
    pub async fn join(self, timeout: Duration) -> u64 {
        let generators = self.generators;
        let http = self.http;

        let joined = tokio::time::timeout(timeout, async move {
            let mut samples = 0;
            for handle in generators {
                match handle.await {
                    Ok(n) => samples += n,
                    Err(e) => warn!(error = %e, "Generator task failed"),
                }
            }
            if let Some(handle) = http {
                match handle.await {
                    Ok(Err(e)) => warn!(error = %e, "HTTP server exited with error"),
                    Err(e) => warn!(error = %e, "HTTP server task failed"),
                    Ok(Ok(())) => {}
                }
            }
            samples
        })
        .await;

        match joined {
            Ok(samples) => samples,
            Err(_) => {
                warn!(timeout_ms = timeout.as_millis() as u64, "Timed out waiting for tasks");
                0
            }
        }
    }
}
