/// Core data types for the NWIS model adapter.
///
/// This module defines the shared domain model imported by all other modules:
/// the service enumeration, the assembled time-series table, and the error
/// type raised while fetching and persisting NWIS data.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};

// ---------------------------------------------------------------------------
// Parameter codes
// ---------------------------------------------------------------------------

/// USGS parameter code for discharge (streamflow), in cubic feet per second.
pub const PARAM_DISCHARGE: &str = "00060";

/// USGS parameter code for gage height (stage), in feet.
pub const PARAM_STAGE: &str = "00065";

/// Known USGS parameter codes and the variable names they are exposed under.
/// Codes not listed here become `param_<code>`.
pub const PARAMETER_NAMES: &[(&str, &str)] = &[
    (PARAM_DISCHARGE, "discharge"),
    (PARAM_STAGE, "gage_height"),
    ("00010", "water_temperature"),
    ("00045", "precipitation"),
    ("00095", "specific_conductance"),
    ("00300", "dissolved_oxygen"),
    ("00400", "ph"),
    ("63680", "turbidity"),
    ("72019", "depth_to_water"),
];

/// Statistic code carried by instantaneous series.
pub const STAT_INSTANTANEOUS: &str = "00000";

/// Statistic code for the daily mean.
pub const STAT_MEAN: &str = "00003";

/// Builds the variable name for a parameter/statistic pair.
///
/// Instantaneous values and daily means use the bare parameter name; other
/// daily statistics get a suffix so they don't collide with the mean.
pub fn variable_name(parameter_code: &str, statistic_code: &str) -> String {
    let base = PARAMETER_NAMES
        .iter()
        .find(|(code, _)| *code == parameter_code)
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| format!("param_{}", parameter_code));

    match statistic_code {
        "" | STAT_INSTANTANEOUS | STAT_MEAN => base,
        "00001" => format!("{}_max", base),
        "00002" => format!("{}_min", base),
        "00006" => format!("{}_sum", base),
        other => format!("{}_stat{}", base, other),
    }
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// NWIS data product selected by the service tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    /// Instantaneous values (`iv`), typically 15-minute readings.
    Instantaneous,
    /// Daily values (`dv`), aggregated per calendar day.
    Daily,
}

impl Service {
    /// The tag used in NWIS URLs.
    pub fn tag(&self) -> &'static str {
        match self {
            Service::Instantaneous => "iv",
            Service::Daily => "dv",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Service {
    type Err = NwisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "iv" | "instantaneous" => Ok(Service::Instantaneous),
            "dv" | "daily" => Ok(Service::Daily),
            _ => Err(NwisError::InvalidInput(format!(
                "service '{}' is not supported; use 'iv' or 'dv'",
                s
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// Time-series table
// ---------------------------------------------------------------------------

/// A monitoring location on the site axis of a result.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteInfo {
    pub site_code: String,
    pub site_name: String,
    /// WGS84 latitude.
    pub latitude: f64,
    /// WGS84 longitude.
    pub longitude: f64,
}

/// One named column of a result: a value per (timestamp, site) pair.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub parameter_code: String,
    pub unit: String,
    pub description: String,
    /// Time-major storage, `values[t * n_sites + s]`. Missing values are NaN.
    pub values: Vec<f64>,
}

/// NWIS time series assembled into a (time × site) table.
///
/// Produced by `fetcher::NwisData::get_data`. The time axis is strictly
/// increasing; every variable holds exactly `times.len() * sites.len()`
/// values.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesResult {
    pub service: Service,
    pub start: String,
    pub end: String,
    pub times: Vec<DateTime<Utc>>,
    pub sites: Vec<SiteInfo>,
    pub variables: Vec<Variable>,
}

impl TimeSeriesResult {
    pub fn n_times(&self) -> usize {
        self.times.len()
    }

    pub fn n_sites(&self) -> usize {
        self.sites.len()
    }

    pub fn variable_names(&self) -> Vec<String> {
        self.variables.iter().map(|v| v.name.clone()).collect()
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn variable_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.variables.iter_mut().find(|v| v.name == name)
    }

    /// Values of `name` at time index `t`, one per site.
    pub fn row(&self, name: &str, t: usize) -> Option<&[f64]> {
        let n = self.n_sites();
        if t >= self.n_times() {
            return None;
        }
        self.variable(name).map(|v| &v.values[t * n..(t + 1) * n])
    }

    pub fn row_mut(&mut self, name: &str, t: usize) -> Option<&mut [f64]> {
        let n = self.n_sites();
        if t >= self.n_times() {
            return None;
        }
        self.variable_mut(name).map(|v| &mut v.values[t * n..(t + 1) * n])
    }

    /// Time axis as seconds since the Unix epoch.
    pub fn epoch_seconds(&self) -> Vec<f64> {
        self.times.iter().map(epoch_seconds).collect()
    }

    pub fn latitudes(&self) -> Vec<f64> {
        self.sites.iter().map(|s| s.latitude).collect()
    }

    pub fn longitudes(&self) -> Vec<f64> {
        self.sites.iter().map(|s| s.longitude).collect()
    }
}

/// Seconds since 1970-01-01T00:00:00Z, with millisecond resolution.
pub fn epoch_seconds(t: &DateTime<Utc>) -> f64 {
    t.timestamp_millis() as f64 / 1000.0
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise when fetching, assembling or persisting NWIS data.
#[derive(Debug, thiserror::Error)]
pub enum NwisError {
    /// A query parameter broke a validation rule. Raised before any I/O.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The underlying transport failed. Forwarded as-is.
    #[error(transparent)]
    Transport(Box<dyn std::error::Error + Send + Sync>),
    /// Non-2xx HTTP response from the USGS API.
    #[error("HTTP error: {0}")]
    HttpError(u16),
    /// The response body could not be deserialized.
    #[error("Parse error: {0}")]
    ParseError(String),
    /// The response parsed but contained no time series for the sites.
    #[error("No data available for sites: {0}")]
    NoDataAvailable(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("NetCDF error: {0}")]
    NetCdf(String),
}

impl From<netcdf3::InvalidDataSet> for NwisError {
    fn from(e: netcdf3::InvalidDataSet) -> Self {
        NwisError::NetCdf(format!("{:?}", e))
    }
}

impl From<netcdf3::WriteError> for NwisError {
    fn from(e: netcdf3::WriteError) -> Self {
        NwisError::NetCdf(format!("{:?}", e))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn two_by_two() -> TimeSeriesResult {
        TimeSeriesResult {
            service: Service::Instantaneous,
            start: "2022-01-01".to_string(),
            end: "2022-01-01".to_string(),
            times: vec![
                Utc.with_ymd_and_hms(2022, 1, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2022, 1, 1, 0, 15, 0).unwrap(),
            ],
            sites: vec![
                SiteInfo {
                    site_code: "03339000".to_string(),
                    site_name: "Vermilion River near Danville, IL".to_string(),
                    latitude: 40.1,
                    longitude: -87.6,
                },
                SiteInfo {
                    site_code: "05568500".to_string(),
                    site_name: "Illinois River at Kingston Mines, IL".to_string(),
                    latitude: 40.56,
                    longitude: -89.99,
                },
            ],
            variables: vec![Variable {
                name: "discharge".to_string(),
                parameter_code: PARAM_DISCHARGE.to_string(),
                unit: "ft3/s".to_string(),
                description: "Streamflow".to_string(),
                values: vec![1.0, 2.0, 3.0, 4.0],
            }],
        }
    }

    #[test]
    fn test_service_parses_tags_and_aliases() {
        assert_eq!("iv".parse::<Service>().unwrap(), Service::Instantaneous);
        assert_eq!("IV".parse::<Service>().unwrap(), Service::Instantaneous);
        assert_eq!("instantaneous".parse::<Service>().unwrap(), Service::Instantaneous);
        assert_eq!("dv".parse::<Service>().unwrap(), Service::Daily);
        assert_eq!("daily".parse::<Service>().unwrap(), Service::Daily);
    }

    #[test]
    fn test_service_rejects_unknown_tag() {
        let err = "invalid_type".parse::<Service>().unwrap_err();
        assert!(matches!(err, NwisError::InvalidInput(_)));
        assert!(err.to_string().contains("invalid_type"));
    }

    #[test]
    fn test_variable_name_for_known_and_unknown_codes() {
        assert_eq!(variable_name(PARAM_DISCHARGE, STAT_INSTANTANEOUS), "discharge");
        assert_eq!(variable_name(PARAM_STAGE, STAT_MEAN), "gage_height");
        assert_eq!(variable_name("99999", STAT_INSTANTANEOUS), "param_99999");
    }

    #[test]
    fn test_variable_name_suffixes_non_mean_statistics() {
        assert_eq!(variable_name(PARAM_DISCHARGE, "00001"), "discharge_max");
        assert_eq!(variable_name(PARAM_DISCHARGE, "00002"), "discharge_min");
        assert_eq!(variable_name("00045", "00006"), "precipitation_sum");
        assert_eq!(variable_name(PARAM_DISCHARGE, "00008"), "discharge_stat00008");
    }

    #[test]
    fn test_row_slices_time_major_storage() {
        let result = two_by_two();
        assert_eq!(result.row("discharge", 0), Some(&[1.0, 2.0][..]));
        assert_eq!(result.row("discharge", 1), Some(&[3.0, 4.0][..]));
        assert_eq!(result.row("discharge", 2), None);
        assert_eq!(result.row("gage_height", 0), None);
    }

    #[test]
    fn test_row_mut_writes_only_that_step() {
        let mut result = two_by_two();
        result.row_mut("discharge", 1).unwrap().copy_from_slice(&[9.0, 8.0]);
        assert_eq!(result.variable("discharge").unwrap().values, vec![1.0, 2.0, 9.0, 8.0]);
    }

    #[test]
    fn test_epoch_seconds_and_coordinates() {
        let result = two_by_two();
        assert_eq!(result.epoch_seconds(), vec![1_640_995_200.0, 1_640_996_100.0]);
        assert_eq!(result.latitudes(), vec![40.1, 40.56]);
        assert_eq!(result.longitudes(), vec![-87.6, -89.99]);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(NwisError::HttpError(500).to_string(), "HTTP error: 500");
        assert_eq!(
            NwisError::InvalidInput("bad site".to_string()).to_string(),
            "invalid input: bad site"
        );
    }

    #[test]
    fn test_transport_error_is_forwarded_unchanged() {
        let inner = std::io::Error::new(std::io::ErrorKind::TimedOut, "connection timed out");
        let err = NwisError::Transport(Box::new(inner));
        assert_eq!(err.to_string(), "connection timed out");
    }
}
