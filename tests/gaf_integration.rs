//! Integration tests for regions of management units
//!
//! A region hands every unit the parameter rows tagged with the unit's name
//! and, for units that pull from it, the region's precipitation and
//! evaporation.

mod common;

use std::sync::{Arc, Mutex};

use common::*;
use polars::prelude::{Column, DataFrame, NamedFrom};
use waterbalance::schema::parameters::UNIT_CODE;
use waterbalance::timeseries;
use waterbalance::{
    BucketKind, CancelToken, Eag, FillNa, Gaf, OpenWater, ParameterRow, ParameterTable, SimWindow,
    WbError,
};

type Seen = Arc<Mutex<Vec<Vec<f64>>>>;

fn unit(name: &str, region: Option<&str>) -> (Eag, Seen) {
    let bucket = RecordingBucket::new(1, BucketKind::Paved, 10.0);
    let seen = bucket.seen.clone();
    let mut eag = Eag::new(None, name);
    if let Some(region) = region {
        eag = eag.with_region(region);
    }
    eag.add_bucket(Box::new(bucket), false).unwrap();
    eag.add_water(Box::new(OpenWater::new(9, 100.0)), false).unwrap();
    (eag, seen)
}

fn region_params() -> ParameterTable {
    let mut rows: Vec<ParameterRow> = Vec::new();
    for (unit, value) in [("A", 1.0), ("B", 2.0)] {
        rows.push(ParameterRow::new(1, "RFacOut", 1, value).in_unit(unit));
        rows.extend(levels(9).into_iter().map(|r| r.in_unit(unit)));
    }
    ParameterTable::from_rows(&rows).unwrap()
}

#[test]
fn test_units_get_only_their_own_parameters() {
    let (mut a, seen_a) = unit("A", None);
    let (mut b, seen_b) = unit("B", None);
    a.set_series(series(2, 0.0, 0.0)).unwrap();
    b.set_series(series(2, 0.0, 0.0)).unwrap();

    let mut gaf = Gaf::from_eags(Some(1), "gaf", vec![a, b]).unwrap();
    gaf.simulate(region_params(), &SimWindow::unbounded()).unwrap();

    assert_eq!(*seen_a.lock().unwrap(), vec![vec![1.0]]);
    assert_eq!(*seen_b.lock().unwrap(), vec![vec![2.0]]);

    let names: Vec<&str> = gaf.eags().iter().map(|e| e.name()).collect();
    assert_eq!(names, vec!["A", "B"]);
    assert!(gaf.eag("B").unwrap().water_state().is_some());
    assert_eq!(gaf.parameters().unwrap().len(), 6);
}

#[test]
fn test_units_pull_series_from_region() {
    let (a, _) = unit("A", Some("gaf"));
    let mut gaf = Gaf::new(None, "gaf");
    gaf.add_eag(a).unwrap();
    gaf.set_series(series(3, 0.1, 0.0)).unwrap();

    gaf.simulate(region_params(), &SimWindow::unbounded()).unwrap();

    let eag = gaf.eag("A").unwrap();
    assert_eq!(
        timeseries::values(eag.series(), "prec").unwrap(),
        vec![0.1, 0.1, 0.1]
    );
    assert_eq!(
        timeseries::values(eag.series(), "evap").unwrap(),
        vec![0.0, 0.0, 0.0]
    );
}

#[test]
fn test_first_failure_aborts_sequential_run() {
    let (mut a, _) = unit("A", None);
    a.set_series(series(1, 0.0, 0.0)).unwrap();
    let (mut b, _) = unit("B", None);
    b.set_series(series(1, 0.0, 0.0)).unwrap();
    b.add_bucket(Box::new(FailingBucket(2)), false).unwrap();
    let (mut c, _) = unit("C", None);
    c.set_series(series(1, 0.0, 0.0)).unwrap();

    let mut gaf = Gaf::from_eags(None, "gaf", vec![a, b, c]).unwrap();
    let err = gaf
        .simulate(region_params(), &SimWindow::unbounded())
        .unwrap_err();
    assert!(matches!(err, WbError::Unit { ref unit, .. } if unit == "B"));
    assert!(gaf.eag("A").unwrap().water_state().is_some());
    assert!(gaf.eag("C").unwrap().water_state().is_none());
}

#[test]
fn test_simulate_all_reports_failures_per_unit() {
    let (mut a, _) = unit("A", None);
    a.set_series(series(1, 0.0, 0.0)).unwrap();
    let (mut b, _) = unit("B", None);
    b.set_series(series(1, 0.0, 0.0)).unwrap();
    b.add_bucket(Box::new(FailingBucket(2)), false).unwrap();

    let mut gaf = Gaf::from_eags(None, "gaf", vec![a, b]).unwrap();
    let report = gaf.simulate_all(region_params(), &SimWindow::unbounded(), &CancelToken::new());

    assert!(!report.is_ok());
    assert_eq!(report.succeeded, vec!["A".to_string()]);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "B");
    assert!(gaf.eag("A").unwrap().calculate_chloride_concentration().is_ok());
}

#[test]
fn test_cancelled_region_runs_no_unit() {
    let (mut a, seen) = unit("A", None);
    a.set_series(series(1, 0.0, 0.0)).unwrap();
    let mut gaf = Gaf::from_eags(None, "gaf", vec![a]).unwrap();

    let cancel = CancelToken::new();
    cancel.cancel();
    let report = gaf.simulate_all(region_params(), &SimWindow::unbounded(), &cancel);
    assert!(matches!(report.failed[0].1, WbError::Cancelled));
    assert!(seen.lock().unwrap().is_empty());
}

#[test]
fn test_add_series_distributes_by_unit_code() {
    let (a, _) = unit("A", None);
    let (b, _) = unit("B", None);
    let mut gaf = Gaf::from_eags(None, "gaf", vec![a, b]).unwrap();

    let mut long = timeseries::frame(
        &[day(1), day(2), day(1)],
        vec![("prec", vec![1.0, 2.0, 5.0]), ("evap", vec![0.0, 0.0, 0.0])],
    )
    .unwrap();
    long.with_column(Column::new(UNIT_CODE.into(), &["A", "A", "B"]))
        .unwrap();
    gaf.add_series(&long).unwrap();

    let a = gaf.eag("A").unwrap();
    assert_eq!(timeseries::values(a.series(), "prec").unwrap(), vec![1.0, 2.0]);
    assert!(!a.series().schema().contains(UNIT_CODE));
    assert_eq!(
        timeseries::values(gaf.eag("B").unwrap().series(), "prec").unwrap(),
        vec![5.0]
    );
}

#[test]
fn test_add_eag_series_builds_daily_index_and_fills() {
    let mut gaf = Gaf::new(None, "gaf");
    let inlet = DataFrame::new(vec![
        timeseries::datetime_column(&[day(2), day(3), day(9)]).unwrap(),
        Column::new("inlet".into(), &[Some(-1.0), None, Some(4.0)]),
    ])
    .unwrap();

    let window = SimWindow::parse(Some("2000-01-01"), Some("2000-01-05")).unwrap();
    gaf.add_eag_series(&inlet, None, &window, Some(FillNa::Forward))
        .unwrap();

    assert_eq!(gaf.series().height(), 5);
    let values: Vec<Option<f64>> = gaf
        .series()
        .column("inlet")
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(values, vec![None, Some(-1.0), Some(-1.0), None, None]);

    // overwriting keeps rows outside the new series
    let patch = timeseries::frame(&[day(4)], vec![("inlet", vec![7.0])]).unwrap();
    gaf.add_eag_series(&patch, Some("inlet"), &window, None).unwrap();
    let values: Vec<Option<f64>> = gaf
        .series()
        .column("inlet")
        .unwrap()
        .f64()
        .unwrap()
        .into_iter()
        .collect();
    assert_eq!(values, vec![None, Some(-1.0), Some(-1.0), Some(7.0), None]);
}

#[test]
fn test_add_eag_series_needs_bounds_for_a_new_index() {
    let mut gaf = Gaf::new(None, "gaf");
    let s = timeseries::frame(&[day(1)], vec![("inlet", vec![1.0])]).unwrap();
    assert!(gaf
        .add_eag_series(&s, None, &SimWindow::unbounded(), None)
        .is_err());
}
