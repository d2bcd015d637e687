//! Remote data sources for NWIS time series.
//!
//! Submodules:
//! - `usgs`: USGS NWIS water services: URL construction, WaterML-JSON
//!   parsing, and the blocking HTTP client.

pub mod usgs;

use chrono::NaiveDate;

use crate::model::{NwisError, Service};

/// The one remote operation the fetcher needs: return the raw response body
/// for a query. Implemented by `usgs::UsgsClient`; tests substitute a stub.
///
/// Transport failures are returned as `NwisError::Transport` or
/// `NwisError::HttpError` and are passed through by callers untouched.
pub trait NwisSource {
    fn fetch(
        &self,
        sites: &[String],
        start: NaiveDate,
        end: NaiveDate,
        service: Service,
    ) -> Result<String, NwisError>;
}

impl<T: NwisSource + ?Sized> NwisSource for &T {
    fn fetch(
        &self,
        sites: &[String],
        start: NaiveDate,
        end: NaiveDate,
        service: Service,
    ) -> Result<String, NwisError> {
        (**self).fetch(sites, start, end, service)
    }
}

impl<T: NwisSource + ?Sized> NwisSource for Box<T> {
    fn fetch(
        &self,
        sites: &[String],
        start: NaiveDate,
        end: NaiveDate,
        service: Service,
    ) -> Result<String, NwisError> {
        (**self).fetch(sites, start, end, service)
    }
}
