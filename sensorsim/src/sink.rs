//! Shared store of the latest reading per device.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::trace;

use sensorsim_common::{DeviceIdentity, Reading};

use crate::exposition::{DEVICE_FAMILIES, MetricType, write_unlabeled};

/// Thread-safe store of the most recent [`Reading`] for each device.
///
/// Any number of generators may call [`record`](Self::record) while the
/// exporter calls [`render`](Self::render). Writers take the map's write
/// lock, readers share its read lock. The map is ordered so rendering is
/// deterministic.
#[derive(Default)]
pub struct MetricsSink {
    /// Latest reading per device.
    readings: RwLock<BTreeMap<DeviceIdentity, Reading>>,
    /// Statistics.
    stats: RwLock<SinkStats>,
}

/// Sink statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SinkStats {
    /// Total readings recorded across all devices.
    pub samples_recorded: u64,
    /// Number of times the sink was rendered.
    pub scrapes: u64,
}

/// Create a shareable sink handle.
pub type SharedSink = Arc<MetricsSink>;

impl MetricsSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new sink behind an [`Arc`].
    pub fn shared() -> SharedSink {
        Arc::new(Self::new())
    }

    /// Store `reading` as the latest value for `device`, replacing any previous one.
    pub fn record(&self, device: &DeviceIdentity, reading: Reading) {
        trace!(
            device = %device,
            temperature = reading.temperature,
            humidity = reading.humidity,
            "Recording reading"
        );

        {
            let mut readings = self.readings.write();
            match readings.get_mut(device) {
                Some(slot) => *slot = reading,
                None => {
                    readings.insert(device.clone(), reading);
                }
            }
        }

        self.stats.write().samples_recorded += 1;
    }

    /// Latest reading for `device`, if it has produced one.
    pub fn get(&self, device: &DeviceIdentity) -> Option<Reading> {
        self.readings.read().get(device).copied()
    }

    /// Number of devices with a reading.
    pub fn series_count(&self) -> usize {
        self.readings.read().len()
    }

    /// Snapshot of all readings in device order.
    pub fn snapshot(&self) -> Vec<(DeviceIdentity, Reading)> {
        self.readings
            .read()
            .iter()
            .map(|(d, r)| (d.clone(), *r))
            .collect()
    }

    /// Get sink statistics.
    pub fn stats(&self) -> SinkStats {
        self.stats.read().clone()
    }

    /// Render all readings in Prometheus exposition format.
    pub fn render(&self) -> String {
        let readings = self.readings.read();
        let samples_recorded = {
            let mut stats = self.stats.write();
            stats.scrapes += 1;
            stats.samples_recorded
        };

        let mut output = String::with_capacity(readings.len() * 2 * 160 + 512);

        for family in DEVICE_FAMILIES {
            family.write(&mut output, readings.iter());
        }

        write_unlabeled(
            &mut output,
            "sensorsim_exporter_devices",
            "Number of devices with at least one reading.",
            MetricType::Gauge,
            readings.len() as f64,
        );
        write_unlabeled(
            &mut output,
            "sensorsim_exporter_samples_total",
            "Total readings generated across all devices.",
            MetricType::Counter,
            samples_recorded as f64,
        );

        output
    }
}
