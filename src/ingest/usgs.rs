/// USGS NWIS Water Services Client
///
/// Retrieves instantaneous (`iv`) and daily (`dv`) values from the USGS
/// National Water Information System in WaterML-JSON form and flattens each
/// `timeSeries` entry into a `ParsedSeries`.
///
/// API Documentation: https://waterservices.usgs.gov/docs/
/// Instantaneous values: https://waterservices.usgs.gov/nwis/iv/
/// Daily values: https://waterservices.usgs.gov/nwis/dv/

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Deserialize;
use tracing::{debug, instrument};

use super::NwisSource;
use crate::model::{NwisError, Service, SiteInfo};

pub const NWIS_BASE_URL: &str = "https://waterservices.usgs.gov/nwis";

/// Environment variable that overrides `NWIS_BASE_URL` in `UsgsClient::from_env`.
pub const NWIS_BASE_URL_VAR: &str = "NWIS_BASE_URL";

// ============================================================================
// NWIS API Response Structures
// ============================================================================

/// Top-level WaterML-JSON document.
#[derive(Debug, Deserialize)]
pub struct NwisResponse {
    pub value: NwisValue,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NwisValue {
    #[serde(default)]
    pub time_series: Vec<NwisTimeSeries>,
}

/// One (site, parameter, statistic) series.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NwisTimeSeries {
    pub source_info: SourceInfo,
    pub variable: NwisVariable,
    #[serde(default)]
    pub values: Vec<ValueBlock>,
    /// "USGS:<site>:<parameter>:<statistic>"
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    #[serde(default)]
    pub site_name: String,
    pub site_code: Vec<CodeValue>,
    pub geo_location: GeoLocation,
}

#[derive(Debug, Deserialize)]
pub struct CodeValue {
    pub value: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoLocation {
    pub geog_location: GeogLocation,
}

#[derive(Debug, Deserialize)]
pub struct GeogLocation {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NwisVariable {
    pub variable_code: Vec<CodeValue>,
    #[serde(default)]
    pub variable_name: String,
    #[serde(default)]
    pub variable_description: String,
    pub unit: NwisUnit,
    #[serde(default)]
    pub options: Option<VariableOptions>,
    pub no_data_value: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NwisUnit {
    pub unit_code: String,
}

#[derive(Debug, Deserialize)]
pub struct VariableOptions {
    #[serde(default)]
    pub option: Vec<VariableOption>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariableOption {
    pub name: String,
    pub option_code: Option<String>,
}

/// One method's worth of values. Sites with several sensors for the same
/// parameter return several blocks.
#[derive(Debug, Deserialize)]
pub struct ValueBlock {
    #[serde(default)]
    pub value: Vec<NwisPoint>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NwisPoint {
    pub value: String,
    pub date_time: String,
    #[serde(default)]
    pub qualifiers: Vec<String>,
}

/// A `timeSeries` entry flattened into typed values.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedSeries {
    pub site: SiteInfo,
    pub parameter_code: String,
    pub statistic_code: String,
    pub unit: String,
    pub description: String,
    /// Missing and sentinel values are NaN.
    pub points: Vec<(DateTime<Utc>, f64)>,
}

// ============================================================================
// URL Construction
// ============================================================================

/// Builds the NWIS request URL for `service` over the inclusive date window.
///
/// `siteStatus=all` keeps inactive sites in the response so that historical
/// windows still resolve.
pub fn build_url(
    base_url: &str,
    service: Service,
    sites: &[String],
    start: NaiveDate,
    end: NaiveDate,
) -> String {
    format!(
        "{}/{}/?format=json&sites={}&startDT={}&endDT={}&siteStatus=all",
        base_url.trim_end_matches('/'),
        service.tag(),
        sites.join(","),
        start.format("%Y-%m-%d"),
        end.format("%Y-%m-%d"),
    )
}

// ============================================================================
// Response Parsing
// ============================================================================

/// Parses a WaterML-JSON body into one `ParsedSeries` per `timeSeries` entry,
/// in response order.
pub fn parse_response(body: &str) -> Result<Vec<ParsedSeries>, NwisError> {
    let response: NwisResponse =
        serde_json::from_str(body).map_err(|e| NwisError::ParseError(e.to_string()))?;

    response
        .value
        .time_series
        .into_iter()
        .map(parse_series)
        .collect()
}

fn parse_series(ts: NwisTimeSeries) -> Result<ParsedSeries, NwisError> {
    let site_code = ts
        .source_info
        .site_code
        .first()
        .map(|c| c.value.clone())
        .ok_or_else(|| NwisError::ParseError(format!("series '{}' has no site code", ts.name)))?;

    let parameter_code = ts
        .variable
        .variable_code
        .first()
        .map(|c| c.value.clone())
        .ok_or_else(|| {
            NwisError::ParseError(format!("series '{}' has no variable code", ts.name))
        })?;

    let statistic_code = statistic_code(&ts);

    let description = if ts.variable.variable_description.is_empty() {
        ts.variable.variable_name.clone()
    } else {
        ts.variable.variable_description.clone()
    };

    let no_data = ts.variable.no_data_value;
    let mut points = Vec::new();
    for block in &ts.values {
        for point in &block.value {
            let timestamp = parse_nwis_datetime(&point.date_time)?;
            points.push((timestamp, parse_value(&point.value, no_data)));
        }
    }

    Ok(ParsedSeries {
        site: SiteInfo {
            site_code,
            site_name: ts.source_info.site_name,
            latitude: ts.source_info.geo_location.geog_location.latitude,
            longitude: ts.source_info.geo_location.geog_location.longitude,
        },
        parameter_code,
        statistic_code,
        unit: ts.variable.unit.unit_code,
        description,
        points,
    })
}

/// Statistic code from the series name, falling back to the variable's
/// "Statistic" option.
fn statistic_code(ts: &NwisTimeSeries) -> String {
    if let Some(code) = ts.name.split(':').nth(3) {
        return code.to_string();
    }
    ts.variable
        .options
        .as_ref()
        .and_then(|opts| opts.option.iter().find(|o| o.name == "Statistic"))
        .and_then(|o| o.option_code.clone())
        .unwrap_or_default()
}

/// Parses an NWIS value string. Sentinels and non-numeric markers
/// ("Ice", "Eqp", "") become NaN.
fn parse_value(raw: &str, no_data: Option<f64>) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(v) if Some(v) == no_data => f64::NAN,
        Ok(v) => v,
        Err(_) => f64::NAN,
    }
}

/// Parses an NWIS timestamp.
///
/// IV timestamps carry an offset ("2022-01-01T00:00:00.000-06:00"); DV
/// timestamps do not ("2022-01-01T00:00:00.000") and are taken as UTC.
pub fn parse_nwis_datetime(s: &str) -> Result<DateTime<Utc>, NwisError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
        .map_err(|e| NwisError::ParseError(format!("bad timestamp '{}': {}", s, e)))
}

// ============================================================================
// API Client
// ============================================================================

/// Blocking HTTP client for the NWIS water services.
pub struct UsgsClient {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl UsgsClient {
    pub fn new() -> Self {
        Self::with_client(reqwest::blocking::Client::new())
    }

    /// Uses a caller-configured client, e.g. one with a request timeout.
    pub fn with_client(client: reqwest::blocking::Client) -> Self {
        Self {
            client,
            base_url: NWIS_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Loads `.env` if present and honours `NWIS_BASE_URL`.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        match std::env::var(NWIS_BASE_URL_VAR) {
            Ok(url) if !url.trim().is_empty() => Self::new().with_base_url(url),
            _ => Self::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Default for UsgsClient {
    fn default() -> Self {
        Self::new()
    }
}

impl NwisSource for UsgsClient {
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    fn fetch(
        &self,
        sites: &[String],
        start: NaiveDate,
        end: NaiveDate,
        service: Service,
    ) -> Result<String, NwisError> {
        let url = build_url(&self.base_url, service, sites, start, end);
        debug!(%url, "Sending NWIS request");

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .map_err(|e| NwisError::Transport(Box::new(e)))?;

        let status = response.status();
        debug!("Received HTTP response with status: {}", status);
        if !status.is_success() {
            return Err(NwisError::HttpError(status.as_u16()));
        }

        let body = response
            .text()
            .map_err(|e| NwisError::Transport(Box::new(e)))?;
        debug!(bytes = body.len(), "Retrieved NWIS response body");
        Ok(body)
    }
}

// ============================================================================
// Tests
// ============================================================================
