//! Per-device simulated reading generator.

use std::time::Duration;

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use sensorsim_common::{DeviceIdentity, Reading, ValueRange};

use crate::sink::SharedSink;

/// Periodically draws a temperature/humidity pair for one device and
/// publishes it into the shared sink.
pub struct ReadingGenerator {
    device: DeviceIdentity,
    sink: SharedSink,
    interval: Duration,
    temperature: ValueRange,
    humidity: ValueRange,
    rng: SmallRng,
    max_iterations: Option<u64>,
}

impl ReadingGenerator {
    /// Create a generator seeded from OS entropy.
    pub fn new(
        device: DeviceIdentity,
        sink: SharedSink,
        interval: Duration,
        temperature: ValueRange,
        humidity: ValueRange,
    ) -> Self {
        Self {
            device,
            sink,
            interval,
            temperature,
            humidity,
            rng: SmallRng::from_os_rng(),
            max_iterations: None,
        }
    }

    /// Use a fixed seed so the sequence of readings is reproducible.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    /// Stop after `iterations` samples instead of running until shutdown.
    pub fn with_max_iterations(mut self, iterations: u64) -> Self {
        self.max_iterations = Some(iterations);
        self
    }

    pub fn device(&self) -> &DeviceIdentity {
        &self.device
    }

    /// Draw one reading, record it and return it.
    pub fn sample(&mut self) -> Reading {
        let temperature = draw(&mut self.rng, self.temperature);
        let humidity = draw(&mut self.rng, self.humidity);
        let reading = Reading::new(temperature, humidity);

        self.sink.record(&self.device, reading);
        reading
    }

    /// Sample immediately, then once per interval, until shutdown.
    ///
    /// Returns when the shutdown flag is set, the sender is dropped, or the
    /// iteration limit is reached. The return value is the number of samples
    /// taken.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> u64 {
        info!(
            device = %self.device,
            interval_ms = self.interval.as_millis() as u64,
            "Starting reading generator"
        );

        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut samples = 0u64;

        loop {
            if *shutdown.borrow() {
                break;
            }
            if self.max_iterations.is_some_and(|max| samples >= max) {
                break;
            }

            tokio::select! {
                _ = interval.tick() => {
                    let reading = self.sample();
                    samples += 1;
                    debug!(
                        device = %self.device,
                        temperature = reading.temperature,
                        humidity = reading.humidity,
                        "Generated reading"
                    );
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        info!(device = %self.device, samples, "Reading generator stopped");
        samples
    }
}

/// Uniform draw from the closed interval.
fn draw(rng: &mut SmallRng, range: ValueRange) -> f64 {
    if range.min == range.max {
        return range.min;
    }
    rng.random_range(range.min..=range.max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MetricsSink;
    use sensorsim_common::{HUMIDITY_RANGE, TEMPERATURE_RANGE};

    fn device() -> DeviceIdentity {
        DeviceIdentity::new("Guangdong", "Shenzhen", "Nanshan", "Site1", "DeviceA")
    }

    fn generator(sink: SharedSink) -> ReadingGenerator {
        ReadingGenerator::new(
            device(),
            sink,
            Duration::from_secs(2),
            TEMPERATURE_RANGE,
            HUMIDITY_RANGE,
        )
    }

    #[test]
    fn test_sample_within_ranges() {
        let sink = MetricsSink::shared();
        let mut generator = generator(sink.clone()).with_seed(1);

        for _ in 0..1000 {
            let reading = generator.sample();
            assert!(TEMPERATURE_RANGE.contains(reading.temperature));
            assert!(HUMIDITY_RANGE.contains(reading.humidity));
        }

        assert_eq!(sink.series_count(), 1);
        assert_eq!(sink.stats().samples_recorded, 1000);
    }

    #[test]
    fn test_sample_records_latest() {
        let sink = MetricsSink::shared();
        let mut generator = generator(sink.clone()).with_seed(2);

        generator.sample();
        let last = generator.sample();

        assert_eq!(sink.get(&device()), Some(last));
    }

    #[test]
    fn test_seed_is_reproducible() {
        let mut a = generator(MetricsSink::shared()).with_seed(42);
        let mut b = generator(MetricsSink::shared()).with_seed(42);

        for _ in 0..10 {
            let ra = a.sample();
            let rb = b.sample();
            assert_eq!(ra.temperature, rb.temperature);
            assert_eq!(ra.humidity, rb.humidity);
        }
    }

    #[test]
    fn test_degenerate_range() {
        let sink = MetricsSink::shared();
        let mut generator = ReadingGenerator::new(
            device(),
            sink,
            Duration::from_secs(1),
            ValueRange::new(20.0, 20.0),
            ValueRange::new(50.0, 50.0),
        );

        let reading = generator.sample();
        assert_eq!(reading.temperature, 20.0);
        assert_eq!(reading.humidity, 50.0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_bounded_iterations() {
        let sink = MetricsSink::shared();
        let (_tx, rx) = watch::channel(false);

        let samples = generator(sink.clone())
            .with_seed(3)
            .with_max_iterations(5)
            .run(rx)
            .await;

        assert_eq!(samples, 5);
        assert_eq!(sink.stats().samples_recorded, 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_samples_immediately_then_per_interval() {
        let sink = MetricsSink::shared();
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(generator(sink.clone()).run(rx));

        // First tick fires immediately
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(sink.stats().samples_recorded, 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(sink.stats().samples_recorded, 2);

        tx.send(true).unwrap();
        let samples = handle.await.unwrap();
        assert_eq!(samples, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_when_sender_dropped() {
        let sink = MetricsSink::shared();
        let (tx, rx) = watch::channel(false);

        let handle = tokio::spawn(generator(sink).run(rx));
        tokio::time::sleep(Duration::from_millis(10)).await;
        drop(tx);

        let samples = tokio::time::timeout(Duration::from_secs(10), handle)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(samples, 1);
    }

    #[tokio::test]
    async fn test_run_already_shut_down() {
        let sink = MetricsSink::shared();
        let (_tx, rx) = watch::channel(true);

        let samples = generator(sink.clone()).run(rx).await;

        assert_eq!(samples, 0);
        assert_eq!(sink.series_count(), 0);
    }
}
