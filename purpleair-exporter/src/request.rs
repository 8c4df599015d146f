//! Scrape requests: target validation and period selection.

use std::fmt;
use std::net::IpAddr;

use thiserror::Error;

/// Rejection of a scrape request before any sensor is contacted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestValidationError {
    #[error("'target' parameter must be specified once")]
    MissingTarget,
    #[error("'target' parameter must be an IP address")]
    InvalidTarget,
}

/// A sensor averaging period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Period {
    /// Readings averaged over the last second.
    Live,
    /// Readings averaged over the last two minutes.
    Averaged,
}

impl Period {
    /// Periods in the order they are fetched; earlier periods supply device metrics.
    pub const PRIORITY: [Period; 2] = [Period::Live, Period::Averaged];

    /// Value of the `period` label.
    pub fn tag(&self) -> &'static str {
        match self {
            Period::Live => "1s",
            Period::Averaged => "2m",
        }
    }

    /// Value of the sensor's `live` query parameter.
    pub fn live_param(&self) -> &'static str {
        match self {
            Period::Live => "true",
            Period::Averaged => "false",
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

/// The non-empty set of periods requested for a scrape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodSelection {
    live: bool,
    averaged: bool,
}

impl PeriodSelection {
    pub const BOTH: Self = Self {
        live: true,
        averaged: true,
    };
    pub const LIVE: Self = Self {
        live: true,
        averaged: false,
    };
    pub const AVERAGED: Self = Self {
        live: false,
        averaged: true,
    };

    /// Interpret the `period` query parameter.
    ///
    /// Unrecognized or absent values select both periods.
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("1" | "1s" | "live") => Self::LIVE,
            Some("2" | "2m" | "avg" | "average") => Self::AVERAGED,
            _ => Self::BOTH,
        }
    }

    pub fn contains(&self, period: Period) -> bool {
        match period {
            Period::Live => self.live,
            Period::Averaged => self.averaged,
        }
    }

    /// Selected periods in priority order.
    pub fn iter(&self) -> impl Iterator<Item = Period> + '_ {
        Period::PRIORITY
            .into_iter()
            .filter(move |period| self.contains(*period))
    }
}

impl Default for PeriodSelection {
    fn default() -> Self {
        Self::BOTH
    }
}

/// A validated scrape request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeRequest {
    pub target: IpAddr,
    pub periods: PeriodSelection,
}

impl ScrapeRequest {
    pub fn new(target: IpAddr, periods: PeriodSelection) -> Self {
        Self { target, periods }
    }

    /// Build a request from decoded query string pairs.
    ///
    /// `target` must appear exactly once and be an IP literal. Only the
    /// first `period` value is considered.
    pub fn from_query<K, V>(pairs: &[(K, V)]) -> Result<Self, RequestValidationError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut targets = pairs
            .iter()
            .filter(|(k, _)| k.as_ref() == "target")
            .map(|(_, v)| v.as_ref());

        let target = match (targets.next(), targets.next()) {
            (Some(target), None) if !target.is_empty() => target,
            _ => return Err(RequestValidationError::MissingTarget),
        };

        let target: IpAddr = target
            .parse()
            .map_err(|_| RequestValidationError::InvalidTarget)?;

        let period = pairs
            .iter()
            .find(|(k, _)| k.as_ref() == "period")
            .map(|(_, v)| v.as_ref());

        Ok(Self::new(target, PeriodSelection::from_param(period)))
    }
}
