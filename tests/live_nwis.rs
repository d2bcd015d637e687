/// Tests against the live USGS NWIS service.
///
/// These make real HTTP requests and depend on the service being up, so they
/// are ignored by default. Run manually with:
///   cargo test --test live_nwis -- --ignored

use nwis_bmi::{Bmi, BmiNwis, NwisData, NwisError, Service, UsgsClient};

#[test]
#[ignore] // Only run manually - makes real API calls
fn test_live_iv_fetch_writes_one_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.nc");
    let fetcher = NwisData::<UsgsClient>::default();

    let result = fetcher
        .get_data(["03339000"], "2022-01-01", "2022-01-03", "iv", Some(path.as_path()))
        .expect("live fetch should succeed");

    assert_eq!(result.service, Service::Instantaneous);
    assert_eq!(result.sites[0].site_code, "03339000");
    assert!(result.n_times() > 0);
    assert!(result.variable("discharge").is_some());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    assert!(path.is_file());
}

#[test]
#[ignore] // Only run manually - makes real API calls
fn test_live_dv_fetch() {
    let fetcher = NwisData::<UsgsClient>::default();
    let result = fetcher
        .get_data(["03339000"], "2022-01-01", "2022-01-03", "dv", None)
        .expect("live fetch should succeed");

    assert_eq!(result.n_times(), 3);
}

#[test]
#[ignore] // Only run manually - makes real API calls
fn test_live_unknown_site_has_no_data() {
    let fetcher = NwisData::<UsgsClient>::default();
    let err = fetcher
        .get_data(["00000000"], "2022-01-01", "2022-01-03", "iv", None)
        .unwrap_err();
    assert!(
        matches!(err, NwisError::NoDataAvailable(_) | NwisError::HttpError(_)),
        "unexpected error: {:?}",
        err
    );
}

#[test]
#[ignore] // Only run manually - makes real API calls
fn test_live_bmi_walks_to_the_end() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("nwis.toml");
    std::fs::write(
        &config,
        "sites = \"03339000\"\nstart = \"2022-01-01\"\nend = \"2022-01-01\"\nservice = \"iv\"\n",
    )
    .unwrap();

    let mut model = BmiNwis::new();
    model.initialize(config.to_str().unwrap()).unwrap();
    let end = model.get_end_time().unwrap();
    model.update_until(end).unwrap();
    assert_eq!(model.get_current_time().unwrap(), end);
    model.finalize().unwrap();
}
