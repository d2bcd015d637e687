/// Query validation and table assembly for NWIS time series.
///
/// `NwisData::get_data` is the single entry point: it validates the query,
/// makes exactly one call to the injected `NwisSource`, assembles the
/// response into a `TimeSeriesResult`, and optionally persists it.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, instrument};

use crate::ingest::NwisSource;
use crate::ingest::usgs::{self, ParsedSeries, UsgsClient};
use crate::model::{NwisError, Service, SiteInfo, TimeSeriesResult, Variable, variable_name};
use crate::persist;
use crate::sites;

/// File extension required for `output` paths.
pub const OUTPUT_EXTENSION: &str = "nc";

// ---------------------------------------------------------------------------
// Query parameters
// ---------------------------------------------------------------------------

/// A validated NWIS query. Only `NwisQuery::new` builds one.
#[derive(Debug, Clone, PartialEq)]
pub struct NwisQuery {
    sites: Vec<String>,
    start: NaiveDate,
    end: NaiveDate,
    service: Service,
    output: Option<PathBuf>,
}

impl NwisQuery {
    /// Validates raw parameters. Rules are checked in this order, and every
    /// failure is `NwisError::InvalidInput`:
    ///
    /// 1. every site code is 8 or 15 digits
    /// 2. the service tag is supported
    /// 3. the dates are `YYYY-MM-DD` and `start <= end`
    /// 4. `output`, if given, ends in `.nc` and its parent directory exists
    pub fn new<I, S>(
        sites: I,
        start: &str,
        end: &str,
        service: &str,
        output: Option<&Path>,
    ) -> Result<Self, NwisError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let sites = sites::normalize_sites(sites)?;
        let service: Service = service.parse()?;

        let start_date = parse_date("start", start)?;
        let end_date = parse_date("end", end)?;
        if start_date > end_date {
            return Err(NwisError::InvalidInput(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }

        if let Some(path) = output {
            check_output_path(path)?;
        }

        Ok(Self {
            sites,
            start: start_date,
            end: end_date,
            service,
            output: output.map(Path::to_path_buf),
        })
    }

    /// De-duplicated, in request order.
    pub fn sites(&self) -> &[String] {
        &self.sites
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn service(&self) -> Service {
        self.service
    }

    pub fn output(&self) -> Option<&Path> {
        self.output.as_deref()
    }
}

fn parse_date(which: &str, s: &str) -> Result<NaiveDate, NwisError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|_| {
        NwisError::InvalidInput(format!("{} date '{}' must be in YYYY-MM-DD form", which, s))
    })
}

fn check_output_path(path: &Path) -> Result<(), NwisError> {
    let has_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(OUTPUT_EXTENSION));
    if !has_extension {
        return Err(NwisError::InvalidInput(format!(
            "output '{}' must be a .{} file",
            path.display(),
            OUTPUT_EXTENSION
        )));
    }

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !dir.is_dir() {
        return Err(NwisError::InvalidInput(format!(
            "output directory '{}' does not exist",
            dir.display()
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// Fetches NWIS data through a `NwisSource`.
pub struct NwisData<S> {
    source: S,
}

impl Default for NwisData<UsgsClient> {
    fn default() -> Self {
        Self::new(UsgsClient::from_env())
    }
}

impl<S: NwisSource> NwisData<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Validates the parameters, queries NWIS once, and returns the assembled
    /// table. With `output`, the table is also written there as NetCDF.
    pub fn get_data<I, T>(
        &self,
        sites: I,
        start: &str,
        end: &str,
        service: &str,
        output: Option<&Path>,
    ) -> Result<TimeSeriesResult, NwisError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let query = NwisQuery::new(sites, start, end, service, output)?;
        self.get_query(&query)
    }

    /// `get_data` for an already validated query.
    #[instrument(skip(self), fields(service = %query.service))]
    pub fn get_query(&self, query: &NwisQuery) -> Result<TimeSeriesResult, NwisError> {
        let body = self
            .source
            .fetch(&query.sites, query.start, query.end, query.service)?;

        let series = usgs::parse_response(&body)?;
        let result = assemble(query, series)?;
        info!(
            times = result.n_times(),
            sites = result.n_sites(),
            variables = result.variables.len(),
            "Assembled NWIS time series"
        );

        if let Some(path) = &query.output {
            persist::write_result(&result, path)?;
        }
        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// Lays parsed series out on a shared (time × site) grid.
///
/// - time axis: union of all timestamps, ascending
/// - site axis: requested sites that appear in the response, in request
///   order, then any unrequested sites the service returned
/// - variables: in order of first appearance
///
/// Cells with no reading are NaN. When several series land on the same cell
/// (multiple sensors), the first non-missing value wins.
pub fn assemble(
    query: &NwisQuery,
    series: Vec<ParsedSeries>,
) -> Result<TimeSeriesResult, NwisError> {
    if series.is_empty() {
        return Err(NwisError::NoDataAvailable(query.sites.join(",")));
    }

    let mut sites: Vec<SiteInfo> = Vec::new();
    for code in &query.sites {
        if let Some(s) = series.iter().find(|s| &s.site.site_code == code) {
            sites.push(s.site.clone());
        }
    }
    for s in &series {
        if !sites.iter().any(|known| known.site_code == s.site.site_code) {
            debug!(site = %s.site.site_code, "Response contains unrequested site");
            sites.push(s.site.clone());
        }
    }

    let times: Vec<DateTime<Utc>> = series
        .iter()
        .flat_map(|s| s.points.iter().map(|(t, _)| *t))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    if times.is_empty() {
        return Err(NwisError::NoDataAvailable(query.sites.join(",")));
    }

    let n_times = times.len();
    let n_sites = sites.len();
    let mut variables: Vec<Variable> = Vec::new();

    for s in &series {
        let name = variable_name(&s.parameter_code, &s.statistic_code);
        let idx = match variables.iter().position(|v| v.name == name) {
            Some(idx) => idx,
            None => {
                variables.push(Variable {
                    name,
                    parameter_code: s.parameter_code.clone(),
                    unit: s.unit.clone(),
                    description: s.description.clone(),
                    values: vec![f64::NAN; n_times * n_sites],
                });
                variables.len() - 1
            }
        };

        let site_idx = sites
            .iter()
            .position(|known| known.site_code == s.site.site_code)
            .ok_or_else(|| NwisError::ParseError(format!("unplaced site {}", s.site.site_code)))?;

        let values = &mut variables[idx].values;
        for (t, v) in &s.points {
            let Ok(t_idx) = times.binary_search(t) else {
                continue;
            };
            let cell = &mut values[t_idx * n_sites + site_idx];
            if cell.is_nan() {
                *cell = *v;
            }
        }
    }

    Ok(TimeSeriesResult {
        service: query.service,
        start: query.start.format("%Y-%m-%d").to_string(),
        end: query.end.format("%Y-%m-%d").to_string(),
        times,
        sites,
        variables,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
