//! The open-water aggregator.
//!
//! All bucket fluxes of a unit end up in its open water. The aggregator runs
//! after every bucket of the unit has been simulated and receives their flux
//! tables.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use polars::prelude::*;

use crate::bucket::{BucketFluxes, BucketId};
use crate::error::{Result, WbError};
use crate::parameters::ParameterSlice;
use crate::schema::series as input;
use crate::schema::{flux, parameters, storage::STORAGE};
use crate::timeseries;
use crate::window::SimWindow;

/// Fluxes and storage of the open water after a simulation run.
#[derive(Debug, Clone)]
pub struct WaterState {
    /// Time-indexed; own fluxes (`p`, `e`, ...) plus `q_oa_<id>`/`q_ui_<id>`
    /// per bucket.
    pub fluxes: DataFrame,
    /// Time-indexed `storage` column.
    pub storage: DataFrame,
}

impl WaterState {
    /// Storage keyed by timestamp.
    pub fn storage_by_time(&self) -> Result<HashMap<NaiveDateTime, f64>> {
        let index = timeseries::time_index(&self.storage)?;
        let values = timeseries::values(&self.storage, STORAGE)?;
        Ok(index.into_iter().zip(values).collect())
    }
}

/// Contract of the open-water element.
pub trait WaterModel: Send + Sync {
    fn id(&self) -> BucketId;

    fn area(&self) -> f64;

    fn simulate(
        &self,
        params: &ParameterSlice,
        window: &SimWindow,
        series: &DataFrame,
        inflows: &[BucketFluxes],
    ) -> Result<WaterState>;
}

/// Open water doing only the bookkeeping.
///
/// Own fluxes come from the unit series: `p = prec × area`,
/// `e = −evap × area`, and `s`, `w`, `x`, `q_out` as given in the `seepage`,
/// `leakage`, `intake` and `outtake` columns (zero when absent; volumes,
/// negative when leaving the water). Storage starts at
/// `(hTarget − hBottom) × area` and accumulates the sum of all columns.
#[derive(Debug, Clone)]
pub struct OpenWater {
    id: BucketId,
    area: f64,
}

impl OpenWater {
    pub fn new(id: BucketId, area: f64) -> Self {
        Self { id, area }
    }

    fn initial_volume(&self, params: &ParameterSlice) -> Result<f64> {
        let target = params.single(parameters::H_TARGET)?;
        let bottom = params.single(parameters::H_BOTTOM)?;
        Ok((target - bottom) * self.area)
    }
}

impl WaterModel for OpenWater {
    fn id(&self) -> BucketId {
        self.id
    }

    fn area(&self) -> f64 {
        self.area
    }

    fn simulate(
        &self,
        params: &ParameterSlice,
        window: &SimWindow,
        series: &DataFrame,
        inflows: &[BucketFluxes],
    ) -> Result<WaterState> {
        let series = timeseries::restrict(series, window)?;
        let index = timeseries::time_index(&series)?;
        if index.windows(2).any(|w| w[0] >= w[1]) {
            return Err(WbError::General(
                "series index must be strictly increasing".into(),
            ));
        }
        let n = index.len();
        let or_zero = |name: &str| -> Result<Vec<f64>> {
            Ok(timeseries::optional_values(&series, name)?.unwrap_or_else(|| vec![0.0; n]))
        };

        let prec = timeseries::values(&series, input::PRECIPITATION)?;
        let evap = timeseries::values(&series, input::EVAPORATION)?;

        let mut columns: Vec<(String, Vec<f64>)> = vec![
            (
                flux::PRECIPITATION.to_string(),
                prec.iter().map(|p| p * self.area).collect(),
            ),
            (
                flux::EVAPORATION.to_string(),
                evap.iter().map(|e| -e * self.area).collect(),
            ),
            (flux::SEEPAGE.to_string(), or_zero(input::SEEPAGE)?),
            (flux::LEAKAGE.to_string(), or_zero(input::LEAKAGE)?),
            (flux::INTAKE.to_string(), or_zero(input::INTAKE)?),
            (flux::OUTTAKE.to_string(), or_zero(input::OUTTAKE)?),
        ];

        for inflow in inflows {
            let times = timeseries::time_index(&inflow.fluxes)?;
            for kind in [flux::OUTFLOW, flux::VERTICAL] {
                let by_time: HashMap<NaiveDateTime, f64> = times
                    .iter()
                    .copied()
                    .zip(timeseries::values(&inflow.fluxes, kind)?)
                    .collect();
                let aligned = index
                    .iter()
                    .map(|t| by_time.get(t).copied().unwrap_or(0.0))
                    .collect();
                columns.push((flux::column(kind, inflow.id), aligned));
            }
        }

        let v0 = self.initial_volume(params)?;
        let storage: Vec<f64> = (0..n)
            .scan(v0, |volume, t| {
                *volume += columns.iter().map(|(_, v)| v[t]).sum::<f64>();
                Some(*volume)
            })
            .collect();

        tracing::debug!(
            water = self.id,
            steps = n,
            buckets = inflows.len(),
            "open water balance computed"
        );

        Ok(WaterState {
            fluxes: timeseries::frame(&index, columns)?,
            storage: timeseries::frame(&index, vec![(STORAGE, storage)])?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::BucketKind;
    use crate::parameters::ParameterValue;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2000, 1, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn levels() -> ParameterSlice {
        ParameterSlice::new(vec![
            ParameterValue {
                code: "hTarget".into(),
                layer_order: 1,
                value: 0.0,
            },
            ParameterValue {
                code: "hBottom".into(),
                layer_order: 1,
                value: -1.0,
            },
        ])
    }

    #[test]
    fn bucket_columns_are_suffixed_and_storage_accumulates() {
        let index = vec![day(1), day(2)];
        let series = timeseries::frame(
            &index,
            vec![
                ("prec", vec![0.01, 0.0]),
                ("evap", vec![0.0, 0.02]),
                ("outtake", vec![0.0, -1.0]),
            ],
        )
        .unwrap();
        let paved = BucketFluxes {
            id: 7,
            kind: BucketKind::Paved,
            area: 10.0,
            fluxes: timeseries::frame(
                &index[1..],
                vec![("q_oa", vec![3.0]), ("q_ui", vec![-0.5])],
            )
            .unwrap(),
        };

        let water = OpenWater::new(9, 100.0);
        let state = water
            .simulate(&levels(), &SimWindow::unbounded(), &series, &[paved])
            .unwrap();

        assert_eq!(
            timeseries::values(&state.fluxes, "q_oa_7").unwrap(),
            vec![0.0, 3.0]
        );
        assert_eq!(timeseries::values(&state.fluxes, "s").unwrap(), vec![0.0, 0.0]);

        let storage = timeseries::values(&state.storage, STORAGE).unwrap();
        assert!((storage[0] - 101.0).abs() < 1e-9);
        assert!((storage[1] - (101.0 - 2.0 - 1.0 + 3.0 - 0.5)).abs() < 1e-9);
    }

    #[test]
    fn levels_are_required() {
        let series = timeseries::frame(&[day(1)], vec![("prec", vec![0.0]), ("evap", vec![0.0])])
            .unwrap();
        let err = OpenWater::new(9, 100.0)
            .simulate(&ParameterSlice::default(), &SimWindow::unbounded(), &series, &[])
            .unwrap_err();
        assert!(matches!(err, WbError::MissingParameter(_)));
    }

    #[test]
    fn levels_on_two_layers_are_ambiguous() {
        let series = timeseries::frame(&[day(1)], vec![("prec", vec![0.0]), ("evap", vec![0.0])])
            .unwrap();
        let mut entries: Vec<ParameterValue> = levels().iter().cloned().collect();
        entries.push(ParameterValue {
            code: "hTarget".into(),
            layer_order: 2,
            value: 0.5,
        });
        let err = OpenWater::new(9, 100.0)
            .simulate(
                &ParameterSlice::new(entries),
                &SimWindow::unbounded(),
                &series,
                &[],
            )
            .unwrap_err();
        assert!(matches!(err, WbError::AmbiguousParameter { count: 2, .. }));
    }
}
