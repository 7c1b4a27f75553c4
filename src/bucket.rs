//! The bucket contract.
//!
//! A bucket is a sub-area of a unit (paved surface, unpaved surface, drain,
//! ...) that turns parameters and the unit's input series into flux series.
//! The rainfall-runoff physics live in implementations of [`Bucket`]; the unit
//! only dispatches to them and reads back `q_oa` (outflow to open water) and
//! `q_ui` (vertical exchange).

use std::fmt;

use polars::prelude::*;

use crate::error::{Result, WbError};
use crate::parameters::{ParameterRow, ParameterSlice};
use crate::schema::{flux, timeseries::DATE_TIME};
use crate::timeseries;
use crate::window::SimWindow;

pub type BucketId = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BucketKind {
    Paved,
    Unpaved,
    Drain,
    Other,
}

impl BucketKind {
    /// Parse a structure-file label. Unknown labels map to `Other`.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "paved" | "verhard" => Self::Paved,
            "unpaved" | "onverhard" => Self::Unpaved,
            "drain" | "drainage" | "gedraineerd" => Self::Drain,
            _ => Self::Other,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Paved => "Paved",
            Self::Unpaved => "Unpaved",
            Self::Drain => "Drain",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for BucketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A flux-producing sub-area of a unit.
pub trait Bucket: Send + Sync {
    fn id(&self) -> BucketId;

    fn kind(&self) -> BucketKind;

    fn area(&self) -> f64;

    /// Parameter rows this bucket starts from when none are supplied.
    fn default_parameters(&self) -> Vec<ParameterRow> {
        Vec::new()
    }

    /// Produce the flux table for `window`.
    ///
    /// The result is time-indexed and holds at least `q_oa` and `q_ui`.
    /// An empty `params` slice is passed through; whether that is acceptable
    /// is up to the bucket.
    fn simulate(
        &self,
        params: &ParameterSlice,
        window: &SimWindow,
        series: &DataFrame,
    ) -> Result<DataFrame>;
}

/// What one bucket produced in a simulation run.
#[derive(Debug, Clone)]
pub struct BucketFluxes {
    pub id: BucketId,
    pub kind: BucketKind,
    pub area: f64,
    pub fluxes: DataFrame,
}

/// A bucket replaying a precomputed flux table.
///
/// Used when the fluxes come from an external model run.
#[derive(Debug, Clone)]
pub struct PrescribedBucket {
    id: BucketId,
    kind: BucketKind,
    area: f64,
    fluxes: DataFrame,
    defaults: Vec<ParameterRow>,
}

impl PrescribedBucket {
    /// Required columns: date_time, q_oa, q_ui.
    pub fn new(id: BucketId, kind: BucketKind, area: f64, fluxes: DataFrame) -> Result<Self> {
        for name in [DATE_TIME, flux::OUTFLOW, flux::VERTICAL] {
            if !fluxes.schema().contains(name) {
                return Err(WbError::MissingColumn(name.to_string()));
            }
        }
        Ok(Self {
            id,
            kind,
            area,
            fluxes,
            defaults: Vec::new(),
        })
    }

    pub fn with_defaults(mut self, defaults: Vec<ParameterRow>) -> Self {
        self.defaults = defaults;
        self
    }
}

impl Bucket for PrescribedBucket {
    fn id(&self) -> BucketId {
        self.id
    }

    fn kind(&self) -> BucketKind {
        self.kind
    }

    fn area(&self) -> f64 {
        self.area
    }

    fn default_parameters(&self) -> Vec<ParameterRow> {
        self.defaults
            .iter()
            .cloned()
            .map(|mut row| {
                row.bucket_id = self.id;
                row
            })
            .collect()
    }

    fn simulate(
        &self,
        _params: &ParameterSlice,
        window: &SimWindow,
        _series: &DataFrame,
    ) -> Result<DataFrame> {
        let fluxes = timeseries::restrict(&self.fluxes, window)?;
        Ok(fluxes.select([DATE_TIME, flux::OUTFLOW, flux::VERTICAL])?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2000, 1, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn labels_map_to_kinds() {
        assert_eq!(BucketKind::from_label("Verhard"), BucketKind::Paved);
        assert_eq!(BucketKind::from_label("Onverhard"), BucketKind::Unpaved);
        assert_eq!(BucketKind::from_label(" Drain "), BucketKind::Drain);
        assert_eq!(BucketKind::from_label("MengRiool"), BucketKind::Other);
        assert_eq!(BucketKind::Unpaved.to_string(), "Unpaved");
    }

    #[test]
    fn prescribed_bucket_requires_flux_columns() {
        let df = timeseries::frame(&[day(1)], vec![(flux::OUTFLOW, vec![1.0])]).unwrap();
        assert!(matches!(
            PrescribedBucket::new(1, BucketKind::Paved, 10.0, df),
            Err(WbError::MissingColumn(_))
        ));
    }

    #[test]
    fn prescribed_bucket_replays_window() {
        let index: Vec<_> = (1..=3).map(day).collect();
        let df = timeseries::frame(
            &index,
            vec![
                (flux::OUTFLOW, vec![1.0, 2.0, 3.0]),
                (flux::VERTICAL, vec![-1.0, 0.0, 1.0]),
                ("extra", vec![0.0, 0.0, 0.0]),
            ],
        )
        .unwrap();
        let bucket = PrescribedBucket::new(4, BucketKind::Unpaved, 90.0, df)
            .unwrap()
            .with_defaults(vec![ParameterRow::new(0, "por", 1, 0.3)]);

        let window = SimWindow::parse(Some("2000-01-02"), None).unwrap();
        let out = bucket
            .simulate(&ParameterSlice::default(), &window, &DataFrame::empty())
            .unwrap();
        assert_eq!(out.width(), 3);
        assert_eq!(timeseries::values(&out, flux::OUTFLOW).unwrap(), vec![2.0, 3.0]);
        assert_eq!(bucket.default_parameters()[0].bucket_id, 4);
    }
}
