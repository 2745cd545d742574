//! Synthetic sensor telemetry exposed as Prometheus metrics.
//!
//! One generator per configured device draws a temperature and a humidity
//! value on a fixed interval and records them into a shared sink. An HTTP
//! server renders the sink on every scrape.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │ ReadingGenerator│──┐
//! └─────────────────┘  │    ┌─────────────────┐     ┌─────────────────┐
//! ┌─────────────────┐  ├───>│   MetricsSink   │────>│   HTTP Server   │
//! │ ReadingGenerator│──┘    │ (latest/device) │     │   (/metrics)    │
//! └─────────────────┘       └─────────────────┘     └─────────────────┘
//! ```
//!
//! # Usage
//!
//! ```bash
//! sensorsim --config sensorsim.json5
//! ```
//!
//! # Configuration
//!
//! See [`config::SimulatorConfig`] for configuration options.

pub mod config;
pub mod exposition;
pub mod generator;
pub mod http;
pub mod simulator;
pub mod sink;

pub use config::SimulatorConfig;
pub use generator::ReadingGenerator;
pub use http::HttpServer;
pub use simulator::{RunningSimulator, Simulator};
pub use sink::{MetricsSink, SharedSink, SinkStats};
