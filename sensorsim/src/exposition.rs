//! Prometheus text exposition format helpers.

use std::fmt::Write;

use sensorsim_common::{DeviceIdentity, Reading};

/// Content type served on the metrics endpoint.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Prometheus metric type as written on `# TYPE` lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricType {
    Gauge,
    Counter,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Gauge => "gauge",
            MetricType::Counter => "counter",
        }
    }
}

/// A labeled gauge family fed from one field of a [`Reading`].
#[derive(Debug, Clone, Copy)]
pub struct GaugeFamily {
    pub name: &'static str,
    pub help: &'static str,
    pub extract: fn(&Reading) -> f64,
}

pub const TEMPERATURE: GaugeFamily = GaugeFamily {
    name: "device_temperature_celsius",
    help: "Simulated temperature of devices in Celsius.",
    extract: temperature,
};

pub const HUMIDITY: GaugeFamily = GaugeFamily {
    name: "device_humidity_percent",
    help: "Simulated humidity of devices in percentage.",
    extract: humidity,
};

fn temperature(reading: &Reading) -> f64 {
    reading.temperature
}

fn humidity(reading: &Reading) -> f64 {
    reading.humidity
}

/// Device families in the order they are rendered.
pub const DEVICE_FAMILIES: [GaugeFamily; 2] = [TEMPERATURE, HUMIDITY];

impl GaugeFamily {
    /// Write HELP/TYPE headers and one sample per device.
    ///
    /// Nothing is written for an empty family.
    pub fn write<'a, I>(&self, out: &mut String, series: I)
    where
        I: IntoIterator<Item = (&'a DeviceIdentity, &'a Reading)>,
    {
        let mut series = series.into_iter().peekable();
        if series.peek().is_none() {
            return;
        }

        write_header(out, self.name, self.help, MetricType::Gauge);
        for (device, reading) in series {
            writeln!(
                out,
                "{}{} {}",
                self.name,
                format_device_labels(device),
                format_value((self.extract)(reading))
            )
            .ok();
        }
    }
}

/// Write `# HELP` and `# TYPE` lines for a metric.
pub fn write_header(out: &mut String, name: &str, help: &str, metric_type: MetricType) {
    writeln!(out, "# HELP {} {}", name, escape_help(help)).ok();
    writeln!(out, "# TYPE {} {}", name, metric_type.as_str()).ok();
}

/// Write an unlabeled sample with its headers.
pub fn write_unlabeled(
    out: &mut String,
    name: &str,
    help: &str,
    metric_type: MetricType,
    value: f64,
) {
    write_header(out, name, help, metric_type);
    writeln!(out, "{} {}", name, format_value(value)).ok();
}

/// Format a device's labels as `{province="..",...,device_id=".."}`.
pub fn format_device_labels(device: &DeviceIdentity) -> String {
    let parts: Vec<String> = device
        .labels()
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", k, escape_label_value(v)))
        .collect();

    format!("{{{}}}", parts.join(","))
}

/// Escape special characters in label values.
pub fn escape_label_value(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => result.push_str("\\\\"),
            '"' => result.push_str("\\\""),
            '\n' => result.push_str("\\n"),
            _ => result.push(c),
        }
    }
    result
}

/// Escape HELP text. Quotes are legal here, unlike label values.
fn escape_help(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\n', "\\n")
}

/// Format a floating point value for Prometheus.
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "+Inf".to_string()
        } else {
            "-Inf".to_string()
        }
    } else if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        format!("{}", value)
    }
}
