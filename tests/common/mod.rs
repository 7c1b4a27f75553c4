//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::DataFrame;

use waterbalance::timeseries;
use waterbalance::{
    Bucket, BucketId, BucketKind, CancelToken, ParameterRow, ParameterSlice, Result, SimWindow,
    WbError,
};

pub fn day(d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2000, 1, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

pub fn days(n: u32) -> Vec<NaiveDateTime> {
    (1..=n).map(day).collect()
}

/// Unit series with constant precipitation and evaporation.
pub fn series(n: u32, prec: f64, evap: f64) -> DataFrame {
    timeseries::frame(
        &days(n),
        vec![
            ("prec", vec![prec; n as usize]),
            ("evap", vec![evap; n as usize]),
        ],
    )
    .unwrap()
}

/// Water levels giving an initial volume of `area`.
pub fn levels(water_id: BucketId) -> Vec<ParameterRow> {
    vec![
        ParameterRow::new(water_id, "hTarget", 1, 0.0),
        ParameterRow::new(water_id, "hBottom", 1, -1.0),
    ]
}

/// Bucket returning constant fluxes and recording the parameters it was given.
pub struct RecordingBucket {
    pub id: BucketId,
    pub kind: BucketKind,
    pub area: f64,
    pub q_oa: f64,
    pub q_ui: f64,
    pub seen: Arc<Mutex<Vec<Vec<f64>>>>,
}

impl RecordingBucket {
    pub fn new(id: BucketId, kind: BucketKind, area: f64) -> Self {
        Self {
            id,
            kind,
            area,
            q_oa: 0.0,
            q_ui: 0.0,
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_fluxes(mut self, q_oa: f64, q_ui: f64) -> Self {
        self.q_oa = q_oa;
        self.q_ui = q_ui;
        self
    }
}

impl Bucket for RecordingBucket {
    fn id(&self) -> BucketId {
        self.id
    }

    fn kind(&self) -> BucketKind {
        self.kind
    }

    fn area(&self) -> f64 {
        self.area
    }

    fn simulate(
        &self,
        params: &ParameterSlice,
        window: &SimWindow,
        series: &DataFrame,
    ) -> Result<DataFrame> {
        self.seen.lock().unwrap().push(params.values());
        let series = timeseries::restrict(series, window)?;
        let index = timeseries::time_index(&series)?;
        let n = index.len();
        timeseries::frame(
            &index,
            vec![("q_oa", vec![self.q_oa; n]), ("q_ui", vec![self.q_ui; n])],
        )
    }
}

/// Bucket that always fails.
pub struct FailingBucket(pub BucketId);

impl Bucket for FailingBucket {
    fn id(&self) -> BucketId {
        self.0
    }

    fn kind(&self) -> BucketKind {
        BucketKind::Other
    }

    fn area(&self) -> f64 {
        1.0
    }

    fn simulate(&self, _: &ParameterSlice, _: &SimWindow, _: &DataFrame) -> Result<DataFrame> {
        Err(WbError::General("soil model diverged".into()))
    }
}

/// Bucket that cancels the run it is part of, then finishes normally.
pub struct CancellingBucket {
    pub inner: RecordingBucket,
    pub cancel: CancelToken,
}

impl Bucket for CancellingBucket {
    fn id(&self) -> BucketId {
        self.inner.id
    }

    fn kind(&self) -> BucketKind {
        self.inner.kind
    }

    fn area(&self) -> f64 {
        self.inner.area
    }

    fn simulate(
        &self,
        params: &ParameterSlice,
        window: &SimWindow,
        series: &DataFrame,
    ) -> Result<DataFrame> {
        self.cancel.cancel();
        self.inner.simulate(params, window, series)
    }
}
