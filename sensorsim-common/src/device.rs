use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};

/// Label names carried by every device series, in exposition order.
pub const DEVICE_LABELS: [&str; 5] = ["province", "city", "district", "site", "device_id"];

/// Default simulated temperature range in degrees Celsius.
pub const TEMPERATURE_RANGE: ValueRange = ValueRange {
    min: 15.0,
    max: 35.0,
};

/// Default simulated relative humidity range in percent.
pub const HUMIDITY_RANGE: ValueRange = ValueRange {
    min: 30.0,
    max: 70.0,
};

/// Identity of one simulated sensor.
///
/// Ordering is lexicographic over the fields in declaration order, which is
/// also the order series appear on the metrics endpoint.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub province: String,
    pub city: String,
    pub district: String,
    pub site: String,
    pub device_id: String,
}

impl DeviceIdentity {
    pub fn new(
        province: impl Into<String>,
        city: impl Into<String>,
        district: impl Into<String>,
        site: impl Into<String>,
        device_id: impl Into<String>,
    ) -> Self {
        Self {
            province: province.into(),
            city: city.into(),
            district: district.into(),
            site: site.into(),
            device_id: device_id.into(),
        }
    }

    /// Label name/value pairs for this device, in [`DEVICE_LABELS`] order.
    pub fn labels(&self) -> [(&'static str, &str); 5] {
        [
            (DEVICE_LABELS[0], self.province.as_str()),
            (DEVICE_LABELS[1], self.city.as_str()),
            (DEVICE_LABELS[2], self.district.as_str()),
            (DEVICE_LABELS[3], self.site.as_str()),
            (DEVICE_LABELS[4], self.device_id.as_str()),
        ]
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}/{}",
            self.province, self.city, self.district, self.site, self.device_id
        )
    }
}

/// Latest simulated values for one device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Temperature in degrees Celsius.
    pub temperature: f64,

    /// Relative humidity in percent.
    pub humidity: f64,

    /// Unix epoch milliseconds when the reading was generated.
    pub timestamp: i64,
}

impl Reading {
    /// Create a reading stamped with the current time.
    pub fn new(temperature: f64, humidity: f64) -> Self {
        Self {
            temperature,
            humidity,
            timestamp: current_timestamp_millis(),
        }
    }
}

/// A closed interval `[min, max]` that simulated values are drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Reject non-finite bounds and inverted intervals.
    pub fn validate(&self) -> Result<()> {
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(Error::Range(format!(
                "bounds must be finite (got [{}, {}])",
                self.min, self.max
            )));
        }
        if self.min > self.max {
            return Err(Error::Range(format!(
                "min {} is greater than max {}",
                self.min, self.max
            )));
        }
        Ok(())
    }
}

/// Get the current Unix timestamp in milliseconds.
pub fn current_timestamp_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
