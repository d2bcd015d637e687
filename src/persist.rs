/// NetCDF output for assembled NWIS results.
///
/// Layout (NetCDF classic, CF-style discrete sampling geometry):
///
/// ```text
/// dimensions:  time, site, name_strlen
/// variables:   time(time)               seconds since 1970-01-01 00:00:00
///              site_no(site, name_strlen) char
///              latitude(site), longitude(site)
///              <variable>(time, site)   one per data variable
/// ```
///
/// The file is written under a temporary name in the destination directory
/// and renamed into place.

use std::path::Path;

use netcdf3::{DataSet, FileWriter, Version};
use tracing::{debug, instrument};

use crate::model::{NwisError, TimeSeriesResult};

pub const TIME_DIM: &str = "time";
pub const SITE_DIM: &str = "site";
pub const STRLEN_DIM: &str = "name_strlen";

pub const TIME_UNITS: &str = "seconds since 1970-01-01 00:00:00";

/// Site codes are 8 or 15 characters.
const SITE_STRLEN: usize = 15;

/// Builds the NetCDF header for `result`.
pub fn build_data_set(result: &TimeSeriesResult) -> Result<DataSet, NwisError> {
    let mut ds = DataSet::new();

    ds.add_fixed_dim(TIME_DIM, result.n_times())?;
    ds.add_fixed_dim(SITE_DIM, result.n_sites())?;
    ds.add_fixed_dim(STRLEN_DIM, SITE_STRLEN)?;

    ds.add_global_attr_string("Conventions", "CF-1.6")?;
    ds.add_global_attr_string("featureType", "timeSeries")?;
    ds.add_global_attr_string("source", "USGS National Water Information System")?;
    ds.add_global_attr_string("service", result.service.tag())?;
    ds.add_global_attr_string("time_coverage_start", result.start.as_str())?;
    ds.add_global_attr_string("time_coverage_end", result.end.as_str())?;

    ds.add_var_f64("time", &[TIME_DIM])?;
    add_var_attrs(
        &mut ds,
        "time",
        &[
            ("standard_name", "time"),
            ("units", TIME_UNITS),
            ("calendar", "standard"),
        ],
    )?;

    ds.add_var_u8("site_no", &[SITE_DIM, STRLEN_DIM])?;
    add_var_attrs(
        &mut ds,
        "site_no",
        &[
            ("cf_role", "timeseries_id"),
            ("long_name", "USGS site number"),
        ],
    )?;

    ds.add_var_f64("latitude", &[SITE_DIM])?;
    add_var_attrs(
        &mut ds,
        "latitude",
        &[("standard_name", "latitude"), ("units", "degrees_north")],
    )?;

    ds.add_var_f64("longitude", &[SITE_DIM])?;
    add_var_attrs(
        &mut ds,
        "longitude",
        &[("standard_name", "longitude"), ("units", "degrees_east")],
    )?;

    for var in &result.variables {
        ds.add_var_f64(&var.name, &[TIME_DIM, SITE_DIM])?;
        add_var_attrs(
            &mut ds,
            &var.name,
            &[
                ("units", var.unit.as_str()),
                ("long_name", var.description.as_str()),
                ("parameter_code", var.parameter_code.as_str()),
                ("coordinates", "time latitude longitude site_no"),
            ],
        )?;
    }

    Ok(ds)
}

fn add_var_attrs(ds: &mut DataSet, var: &str, attrs: &[(&str, &str)]) -> Result<(), NwisError> {
    for (name, value) in attrs {
        ds.add_var_attr_string(var, name, value)?;
    }
    Ok(())
}

/// Site codes as a fixed-width, NUL-padded char matrix.
fn site_chars(result: &TimeSeriesResult) -> Vec<u8> {
    let mut chars = vec![0u8; result.n_sites() * SITE_STRLEN];
    for (i, site) in result.sites.iter().enumerate() {
        let bytes = site.site_code.as_bytes();
        let n = bytes.len().min(SITE_STRLEN);
        chars[i * SITE_STRLEN..i * SITE_STRLEN + n].copy_from_slice(&bytes[..n]);
    }
    chars
}

fn write_netcdf(result: &TimeSeriesResult, ds: &DataSet, path: &Path) -> Result<(), NwisError> {
    let mut writer = FileWriter::open(path)?;
    writer.set_def(ds, Version::Classic, 0)?;

    writer.write_var_f64("time", &result.epoch_seconds())?;
    writer.write_var_u8("site_no", &site_chars(result))?;
    writer.write_var_f64("latitude", &result.latitudes())?;
    writer.write_var_f64("longitude", &result.longitudes())?;
    for var in &result.variables {
        writer.write_var_f64(&var.name, &var.values)?;
    }

    writer.close()?;
    Ok(())
}

/// Writes `result` to `path`, replacing any existing file.
#[instrument(skip(result), fields(times = result.n_times(), sites = result.n_sites()))]
pub fn write_result(result: &TimeSeriesResult, path: &Path) -> Result<(), NwisError> {
    let ds = build_data_set(result)?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let tmp = tempfile::Builder::new()
        .prefix(".nwis-")
        .suffix(".nc.part")
        .tempfile_in(dir)?;

    write_netcdf(result, &ds, tmp.path())?;
    tmp.persist(path).map_err(|e| NwisError::Io(e.error))?;

    debug!(path = %path.display(), "Wrote NetCDF file");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
