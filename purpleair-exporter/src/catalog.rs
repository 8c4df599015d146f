//! Static table of the metric families exposed for a PurpleAir sensor.
//!
//! Identities fall into two groups:
//!
//! - **device** identities describe the sensor itself and are reported at
//!   most once per scrape, regardless of how many periods were queried.
//! - **periodic** identities describe particulate readings and are reported
//!   once per queried averaging period, distinguished by the `period` label.

/// The Prometheus type of a metric family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Counter,
    Gauge,
}

impl ValueKind {
    /// Get the TYPE comment string for Prometheus exposition format.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Counter => "counter",
            ValueKind::Gauge => "gauge",
        }
    }
}

/// A metric family description.
#[derive(Debug, PartialEq, Eq)]
pub struct MetricIdentity {
    /// Full Prometheus metric name.
    pub name: &'static str,
    /// HELP text.
    pub help: &'static str,
    /// Label names, in the order label values are supplied.
    pub labels: &'static [&'static str],
    /// Value type.
    pub kind: ValueKind,
}

pub static UPTIME: MetricIdentity = MetricIdentity {
    name: "purpleair_uptime_seconds_total",
    help: "The uptime of a sensor",
    labels: &["id"],
    kind: ValueKind::Counter,
};

pub static RSSI: MetricIdentity = MetricIdentity {
    name: "purpleair_rssi_dbm",
    help: "A measurement of wireless signal strength",
    labels: &["id"],
    kind: ValueKind::Gauge,
};

pub static HTTP_SENDS: MetricIdentity = MetricIdentity {
    name: "purpleair_http_sends_total",
    help: "A counter of outbound HTTP requests",
    labels: &["id", "status"],
    kind: ValueKind::Counter,
};

pub static TEMPERATURE: MetricIdentity = MetricIdentity {
    name: "purpleair_temperature_c",
    help: "A temperature measurement, as determined by a Bosch BME680 sensor",
    labels: &["id"],
    kind: ValueKind::Gauge,
};

pub static DEW_POINT: MetricIdentity = MetricIdentity {
    name: "purpleair_dewpoint_c",
    help: "A dew point measurement, as determined by a Bosch BME680 sensor",
    labels: &["id"],
    kind: ValueKind::Gauge,
};

pub static HUMIDITY: MetricIdentity = MetricIdentity {
    name: "purpleair_humidity_percent",
    help: "A relative humidity measurement, as determined by a Bosch BME680 sensor",
    labels: &["id"],
    kind: ValueKind::Gauge,
};

pub static IAQ: MetricIdentity = MetricIdentity {
    name: "purpleair_iaq",
    help: "Index for Air Quality, as determined by a Bosch BME680 sensor",
    labels: &["id"],
    kind: ValueKind::Gauge,
};

pub static PRESSURE: MetricIdentity = MetricIdentity {
    name: "purpleair_pressure_pa",
    help: "A barometric pressure measurement, as determined by a Bosch BME680 sensor",
    labels: &["id"],
    kind: ValueKind::Gauge,
};

pub static PM25_AQI: MetricIdentity = MetricIdentity {
    name: "purpleair_pm25_aqi",
    help: "A PM2.5 Air Quality Index value",
    labels: &["id", "channel", "period"],
    kind: ValueKind::Gauge,
};

/// Variants CF1 and ATM, sizes 1.0 and 2.5.
pub static MASS: MetricIdentity = MetricIdentity {
    name: "purpleair_mass_ugm3",
    help: "A particulate mass measurement for a particular particle size",
    labels: &["id", "variant", "size", "channel", "period"],
    kind: ValueKind::Gauge,
};

/// Sizes 0.3, 0.5, 1.0, 2.5, 5.0 and 10.0.
pub static PARTICLE_COUNT: MetricIdentity = MetricIdentity {
    name: "purpleair_particle_count",
    help: "A count of particles per deciliter of air for a particular particle size",
    labels: &["id", "channel", "size", "period"],
    kind: ValueKind::Gauge,
};

static DEVICE: [&MetricIdentity; 8] = [
    &UPTIME,
    &RSSI,
    &HTTP_SENDS,
    &TEMPERATURE,
    &DEW_POINT,
    &HUMIDITY,
    &IAQ,
    &PRESSURE,
];

static PERIODIC: [&MetricIdentity; 3] = [&PM25_AQI, &MASS, &PARTICLE_COUNT];

/// Identities reported at most once per scrape.
pub fn device_identities() -> &'static [&'static MetricIdentity] {
    &DEVICE
}

/// Identities reported once per queried period.
pub fn periodic_identities() -> &'static [&'static MetricIdentity] {
    &PERIODIC
}

/// Every identity, device group first.
pub fn all_identities() -> impl Iterator<Item = &'static MetricIdentity> {
    DEVICE.iter().chain(PERIODIC.iter()).copied()
}
