//! Per-scrape collection: fetch each requested period, decide where device
//! metrics come from, and map sensor fields to labeled metric events.
//!
//! A [`Collector`] is built fresh for every scrape request. It never fails:
//! fetch errors become [`MetricEvent::Invalid`] entries so that a partially
//! reachable sensor still yields a complete snapshot.

use tracing::{debug, warn};

use crate::catalog::{
    self, DEW_POINT, HTTP_SENDS, HUMIDITY, IAQ, MASS, MetricIdentity, PARTICLE_COUNT, PM25_AQI,
    PRESSURE, RSSI, TEMPERATURE, UPTIME, ValueKind,
};
use crate::fetch::{FetchError, PeriodFetcher};
use crate::payload::SensorPayload;
use crate::request::{Period, ScrapeRequest};

/// Convert degrees Fahrenheit to degrees Celsius.
pub fn fahrenheit_to_celsius(f: f64) -> f64 {
    (f - 32.0) * 5.0 / 9.0
}

/// Convert hectopascals to pascals.
pub fn hpa_to_pa(hpa: f64) -> f64 {
    hpa * 100.0
}

/// A single metric value with its label values.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub identity: &'static MetricIdentity,
    /// Label values, in the order of `identity.labels`.
    pub labels: Vec<String>,
    pub value: f64,
    pub kind: ValueKind,
}

impl Sample {
    fn new(identity: &'static MetricIdentity, labels: &[&str], value: f64) -> Self {
        debug_assert_eq!(labels.len(), identity.labels.len(), "{}", identity.name);
        Self {
            identity,
            labels: labels.iter().map(|l| l.to_string()).collect(),
            value,
            kind: identity.kind,
        }
    }

    /// Label name/value pairs.
    pub fn label_pairs(&self) -> impl Iterator<Item = (&'static str, &str)> + '_ {
        self.identity
            .labels
            .iter()
            .copied()
            .zip(self.labels.iter().map(String::as_str))
    }
}

/// One item of a scrape's output.
#[derive(Debug)]
pub enum MetricEvent<'a> {
    /// A metric value.
    Sample(Sample),
    /// A metric that could not be populated because its period failed.
    Invalid {
        identity: &'static MetricIdentity,
        period: Period,
        error: &'a FetchError,
    },
}

impl MetricEvent<'_> {
    pub fn identity(&self) -> &'static MetricIdentity {
        match self {
            MetricEvent::Sample(sample) => sample.identity,
            MetricEvent::Invalid { identity, .. } => *identity,
        }
    }
}

/// The result of fetching one period.
#[derive(Debug)]
pub struct PeriodOutcome {
    pub period: Period,
    pub result: Result<SensorPayload, FetchError>,
}

/// Where a scrape's device metrics come from.
#[derive(Debug, Clone, Copy)]
pub enum DeviceSource<'a> {
    /// The first period, in priority order, that succeeded.
    Payload {
        period: Period,
        payload: &'a SensorPayload,
    },
    /// Every requested period failed; device metrics carry the first error.
    Unavailable {
        period: Period,
        error: &'a FetchError,
    },
}

/// Decide which outcome supplies device metrics.
///
/// `outcomes` must be in priority order. Returns `None` only for an empty
/// slice.
pub fn device_source(outcomes: &[PeriodOutcome]) -> Option<DeviceSource<'_>> {
    let succeeded = outcomes.iter().find_map(|o| match &o.result {
        Ok(payload) => Some(DeviceSource::Payload {
            period: o.period,
            payload,
        }),
        Err(_) => None,
    });

    succeeded.or_else(|| {
        outcomes.first().and_then(|o| match &o.result {
            Err(error) => Some(DeviceSource::Unavailable {
                period: o.period,
                error,
            }),
            Ok(_) => None,
        })
    })
}

/// Fetched outcomes for one scrape, in priority order.
#[derive(Debug)]
pub struct Collection {
    outcomes: Vec<PeriodOutcome>,
}

impl Collection {
    pub fn new(outcomes: Vec<PeriodOutcome>) -> Self {
        Self { outcomes }
    }

    pub fn outcomes(&self) -> &[PeriodOutcome] {
        &self.outcomes
    }

    /// Device source decision for this collection.
    pub fn device_source(&self) -> Option<DeviceSource<'_>> {
        device_source(&self.outcomes)
    }

    /// The scrape's metric events: device metrics first, then each period's
    /// periodic metrics.
    pub fn events(&self) -> impl Iterator<Item = MetricEvent<'_>> {
        std::iter::once(self.device_source())
            .flat_map(device_events)
            .chain(self.outcomes.iter().flat_map(periodic_events))
    }
}

/// Drives the fetches for a single scrape request.
pub struct Collector<'f, F> {
    fetcher: &'f F,
    request: ScrapeRequest,
}

impl<'f, F: PeriodFetcher> Collector<'f, F> {
    pub fn new(fetcher: &'f F, request: ScrapeRequest) -> Self {
        Self { fetcher, request }
    }

    /// Fetch every requested period, one after the other.
    pub async fn collect(self) -> Collection {
        let target = self.request.target;
        let mut outcomes = Vec::with_capacity(2);

        for period in self.request.periods.iter() {
            debug!(%target, %period, "Fetching sensor data");

            let result = self.fetcher.fetch(target, period).await;
            if let Err(e) = &result {
                warn!(%target, %period, error = %e, "Sensor fetch failed");
            }

            outcomes.push(PeriodOutcome { period, result });
        }

        let collection = Collection::new(outcomes);
        match collection.device_source() {
            Some(DeviceSource::Payload { period, .. }) => {
                debug!(%target, %period, "Device metrics sourced")
            }
            Some(DeviceSource::Unavailable { .. }) => {
                debug!(%target, "No period succeeded, device metrics unavailable")
            }
            None => {}
        }

        collection
    }
}

fn device_events(source: Option<DeviceSource<'_>>) -> Vec<MetricEvent<'_>> {
    match source {
        Some(DeviceSource::Payload { payload, .. }) => device_samples(payload)
            .into_iter()
            .map(MetricEvent::Sample)
            .collect(),
        Some(DeviceSource::Unavailable { period, error }) => {
            invalid_events(catalog::device_identities(), period, error)
        }
        None => Vec::new(),
    }
}

fn periodic_events(outcome: &PeriodOutcome) -> Vec<MetricEvent<'_>> {
    match &outcome.result {
        Ok(payload) => periodic_samples(payload, outcome.period)
            .into_iter()
            .map(MetricEvent::Sample)
            .collect(),
        Err(error) => invalid_events(catalog::periodic_identities(), outcome.period, error),
    }
}

fn invalid_events<'a>(
    identities: &[&'static MetricIdentity],
    period: Period,
    error: &'a FetchError,
) -> Vec<MetricEvent<'a>> {
    identities
        .iter()
        .map(|&identity| MetricEvent::Invalid {
            identity,
            period,
            error,
        })
        .collect()
}

/// Map device-level fields.
pub fn device_samples(payload: &SensorPayload) -> Vec<Sample> {
    let id = payload.sensor_id.as_str();
    let failures = payload.http_sends.saturating_sub(payload.http_success);

    vec![
        Sample::new(&UPTIME, &[id], payload.uptime as f64),
        Sample::new(&RSSI, &[id], payload.rssi as f64),
        Sample::new(&HTTP_SENDS, &[id, "total"], payload.http_sends as f64),
        Sample::new(&HTTP_SENDS, &[id, "success"], payload.http_success as f64),
        Sample::new(&HTTP_SENDS, &[id, "failure"], failures as f64),
        Sample::new(
            &TEMPERATURE,
            &[id],
            fahrenheit_to_celsius(payload.current_temp_f_680),
        ),
        Sample::new(&HUMIDITY, &[id], payload.current_humidity_680),
        Sample::new(
            &DEW_POINT,
            &[id],
            fahrenheit_to_celsius(payload.current_dewpoint_f_680),
        ),
        Sample::new(&IAQ, &[id], payload.gas_680),
        Sample::new(&PRESSURE, &[id], hpa_to_pa(payload.pressure_680)),
    ]
}

/// Particulate readings of one of the sensor's two laser counters.
struct ChannelReadings {
    channel: &'static str,
    aqi: f64,
    /// (variant, size, µg/m³)
    mass: [(&'static str, &'static str, f64); 4],
    /// (size, particles/dl)
    counts: [(&'static str, f64); 6],
}

fn channel_readings(p: &SensorPayload) -> [ChannelReadings; 2] {
    [
        ChannelReadings {
            channel: "A",
            aqi: p.pm2_5_aqi,
            mass: [
                ("CF1", "1.0", p.pm1_0_cf_1),
                ("ATM", "1.0", p.pm1_0_atm),
                ("CF1", "2.5", p.pm2_5_cf_1),
                ("ATM", "2.5", p.pm2_5_atm),
            ],
            counts: [
                ("0.3", p.p_0_3_um),
                ("0.5", p.p_0_5_um),
                ("1.0", p.p_1_0_um),
                ("2.5", p.p_2_5_um),
                ("5.0", p.p_5_0_um),
                ("10.0", p.p_10_0_um),
            ],
        },
        ChannelReadings {
            channel: "B",
            aqi: p.pm2_5_aqi_b,
            mass: [
                ("CF1", "1.0", p.pm1_0_cf_1_b),
                ("ATM", "1.0", p.pm1_0_atm_b),
                ("CF1", "2.5", p.pm2_5_cf_1_b),
                ("ATM", "2.5", p.pm2_5_atm_b),
            ],
            counts: [
                ("0.3", p.p_0_3_um_b),
                ("0.5", p.p_0_5_um_b),
                ("1.0", p.p_1_0_um_b),
                ("2.5", p.p_2_5_um_b),
                ("5.0", p.p_5_0_um_b),
                ("10.0", p.p_10_0_um_b),
            ],
        },
    ]
}

/// Map per-period particulate fields.
pub fn periodic_samples(payload: &SensorPayload, period: Period) -> Vec<Sample> {
    let id = payload.sensor_id.as_str();
    let tag = period.tag();
    let channels = channel_readings(payload);
    let mut samples = Vec::with_capacity(22);

    for ch in &channels {
        samples.push(Sample::new(&PM25_AQI, &[id, ch.channel, tag], ch.aqi));
    }

    for i in 0..4 {
        for ch in &channels {
            let (variant, size, value) = ch.mass[i];
            samples.push(Sample::new(
                &MASS,
                &[id, variant, size, ch.channel, tag],
                value,
            ));
        }
    }

    for i in 0..6 {
        for ch in &channels {
            let (size, value) = ch.counts[i];
            samples.push(Sample::new(
                &PARTICLE_COUNT,
                &[id, ch.channel, size, tag],
                value,
            ));
        }
    }

    samples
}
