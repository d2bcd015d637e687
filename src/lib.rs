//! nwis_bmi: USGS NWIS time series behind a Basic Model Interface.
//!
//! # Module structure
//!
//! ```text
//! nwis_bmi
//! ├── model        shared data types (TimeSeriesResult, Service, NwisError, …)
//! ├── sites        site code format rule, one-or-many site lists
//! ├── ingest       NwisSource, the fetch seam
//! │   └── usgs     NWIS water services: URL construction, JSON parsing, HTTP client
//! ├── fetcher      NwisData::get_data: validate, fetch, assemble, persist
//! ├── persist      NetCDF output
//! ├── config       TOML configuration for initialize
//! ├── bmi          the Bmi trait and BmiError
//! ├── bmi_nwis     BmiNwis, the Bmi implementation
//! └── logging      tracing subscriber setup
//! ```

pub mod bmi;
pub mod bmi_nwis;
pub mod config;
pub mod fetcher;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod persist;
pub mod sites;

pub use bmi::{Bmi, BmiError, BmiResult};
pub use bmi_nwis::BmiNwis;
pub use config::NwisConfig;
pub use fetcher::{NwisData, NwisQuery};
pub use ingest::NwisSource;
pub use ingest::usgs::UsgsClient;
pub use model::{NwisError, Service, SiteInfo, TimeSeriesResult, Variable};

/// Crate version, fixed at build time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
