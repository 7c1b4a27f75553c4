//! The region ("Gaf"): a named collection of management units.

use std::collections::HashMap;

use chrono::{Duration, NaiveDateTime};
use polars::prelude::*;
use rayon::prelude::*;

use crate::cancel::CancelToken;
use crate::eag::Eag;
use crate::error::{Result, WbError};
use crate::parameters::ParameterTable;
use crate::schema::{parameters::UNIT_CODE, timeseries::DATE_TIME};
use crate::timeseries;
use crate::window::SimWindow;

/// How gaps in an added series are filled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FillNa {
    Value(f64),
    Forward,
    Backward,
}

impl FillNa {
    fn apply(self, values: &mut [Option<f64>]) {
        let missing = |v: &Option<f64>| v.is_none_or(f64::is_nan);
        match self {
            FillNa::Value(fill) => values
                .iter_mut()
                .filter(|v| missing(v))
                .for_each(|v| *v = Some(fill)),
            FillNa::Forward => carry(values.iter_mut(), missing),
            FillNa::Backward => carry(values.iter_mut().rev(), missing),
        }
    }
}

fn carry<'a>(
    values: impl Iterator<Item = &'a mut Option<f64>>,
    missing: impl Fn(&Option<f64>) -> bool,
) {
    let mut last = None;
    for v in values {
        if missing(v) {
            *v = last;
        } else {
            last = *v;
        }
    }
}

/// Outcome of [`Gaf::simulate_all`].
#[derive(Debug, Default)]
pub struct RegionReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, WbError)>,
}

impl RegionReport {
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct Gaf {
    id: Option<i64>,
    name: String,
    eags: Vec<Eag>,
    /// Unit name → position in `eags`
    eag_index: HashMap<String, usize>,
    series: DataFrame,
    parameters: Option<ParameterTable>,
}

impl Gaf {
    pub fn new(id: Option<i64>, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            eags: Vec::new(),
            eag_index: HashMap::new(),
            series: DataFrame::empty(),
            parameters: None,
        }
    }

    pub fn from_eags(id: Option<i64>, name: &str, eags: Vec<Eag>) -> Result<Self> {
        let mut gaf = Self::new(id, name);
        for eag in eags {
            gaf.add_eag(eag)?;
        }
        Ok(gaf)
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Add a unit under its name. Names are unique within the region.
    pub fn add_eag(&mut self, eag: Eag) -> Result<()> {
        if self.eag_index.contains_key(eag.name()) {
            return Err(WbError::DuplicateUnit(eag.name().to_string()));
        }
        self.eag_index.insert(eag.name().to_string(), self.eags.len());
        self.eags.push(eag);
        Ok(())
    }

    pub fn eag(&self, name: &str) -> Option<&Eag> {
        self.eag_index.get(name).map(|&pos| &self.eags[pos])
    }

    pub fn eag_mut(&mut self, name: &str) -> Option<&mut Eag> {
        self.eag_index.get(name).map(|&pos| &mut self.eags[pos])
    }

    /// Units in insertion order.
    pub fn eags(&self) -> &[Eag] {
        &self.eags
    }

    pub fn series(&self) -> &DataFrame {
        &self.series
    }

    pub fn set_series(&mut self, series: DataFrame) -> Result<()> {
        timeseries::time_index(&series)?;
        self.series = series;
        Ok(())
    }

    pub fn parameters(&self) -> Option<&ParameterTable> {
        self.parameters.as_ref()
    }

    // ── Series distribution ─────────────────────────────────────────────────

    /// Hand each unit the rows of `series` tagged with its name.
    ///
    /// Required columns: unit_code, date_time.
    pub fn add_series(&mut self, series: &DataFrame) -> Result<()> {
        if !series.schema().contains(UNIT_CODE) {
            return Err(WbError::MissingColumn(UNIT_CODE.to_string()));
        }
        for eag in &mut self.eags {
            let rows = series
                .clone()
                .lazy()
                .filter(col(UNIT_CODE).eq(lit(eag.name())))
                .collect()?
                .drop(UNIT_CODE)?;
            eag.set_series(rows)?;
        }
        Ok(())
    }

    /// Add a volume series to the region table.
    ///
    /// Volumes are negative when leaving a unit. Without an existing table a
    /// daily index spanning `window` is created. Only timestamps present in
    /// both the table and `series` are written; `name` defaults to the first
    /// value column of `series`.
    pub fn add_eag_series(
        &mut self,
        series: &DataFrame,
        name: Option<&str>,
        window: &SimWindow,
        fill: Option<FillNa>,
    ) -> Result<()> {
        if self.series.height() == 0 {
            let (Some(tmin), Some(tmax)) = (window.tmin, window.tmax) else {
                return Err(WbError::General(
                    "a bounded window is needed to create the region index".into(),
                ));
            };
            let index = daily_index(tmin, tmax);
            self.series = DataFrame::new(vec![timeseries::datetime_column(&index)?])?;
        }

        let name = match name {
            Some(name) => name.to_string(),
            None => series
                .get_column_names_str()
                .into_iter()
                .find(|c| *c != DATE_TIME)
                .map(|c| c.to_string())
                .ok_or_else(|| WbError::MissingColumn("value column".into()))?,
        };

        let mut incoming = nullable_values(series, &name)?;
        if let Some(fill) = fill {
            let before = incoming.iter().filter(|v| v.is_none_or(f64::is_nan)).count();
            fill.apply(&mut incoming);
            if before > 0 {
                tracing::info!(series = %name, filled = before, ?fill, "filled missing values");
            }
        }
        let incoming: HashMap<NaiveDateTime, Option<f64>> = timeseries::time_index(series)?
            .into_iter()
            .zip(incoming)
            .collect();

        let index = timeseries::time_index(&self.series)?;
        let mut values = if self.series.schema().contains(&name) {
            tracing::warn!(series = %name, "series already present, overwriting data");
            nullable_values(&self.series, &name)?
        } else {
            vec![None; index.len()]
        };
        for (t, slot) in index.iter().zip(values.iter_mut()) {
            if let Some(v) = incoming.get(t) {
                *slot = *v;
            }
        }

        self.series
            .with_column(Column::new(name.as_str().into(), &values))?;
        Ok(())
    }

    // ── Simulation ──────────────────────────────────────────────────────────

    pub fn simulate(&mut self, parameters: ParameterTable, window: &SimWindow) -> Result<()> {
        self.simulate_with(parameters, window, &CancelToken::new())
    }

    /// Simulate every unit in order with its own parameter rows.
    ///
    /// The first failing unit aborts the run; units simulated before it keep
    /// their results.
    pub fn simulate_with(
        &mut self,
        parameters: ParameterTable,
        window: &SimWindow,
        cancel: &CancelToken,
    ) -> Result<()> {
        for eag in &mut self.eags {
            cancel.checkpoint()?;
            simulate_unit(eag, &self.name, &self.series, &parameters, window, cancel)?;
        }
        self.parameters = Some(parameters);
        Ok(())
    }

    /// Simulate all units in parallel and report per unit.
    ///
    /// A failing unit does not stop the others.
    pub fn simulate_all(
        &mut self,
        parameters: ParameterTable,
        window: &SimWindow,
        cancel: &CancelToken,
    ) -> RegionReport {
        let region = &self.name;
        let series = &self.series;
        let outcomes: Vec<(String, Result<()>)> = self
            .eags
            .par_iter_mut()
            .map(|eag| {
                let outcome = cancel
                    .checkpoint()
                    .and_then(|_| simulate_unit(eag, region, series, &parameters, window, cancel));
                (eag.name().to_string(), outcome)
            })
            .collect();

        let mut report = RegionReport::default();
        for (unit, outcome) in outcomes {
            match outcome {
                Ok(()) => report.succeeded.push(unit),
                Err(err) => {
                    tracing::warn!(region = %self.name, %unit, error = %err, "unit failed");
                    report.failed.push((unit, err));
                }
            }
        }
        self.parameters = Some(parameters);
        report
    }
}

fn simulate_unit(
    eag: &mut Eag,
    region: &str,
    region_series: &DataFrame,
    parameters: &ParameterTable,
    window: &SimWindow,
    cancel: &CancelToken,
) -> Result<()> {
    let name = eag.name().to_string();
    let run = |eag: &mut Eag| -> Result<()> {
        if eag.region() == Some(region) {
            eag.load_series_from_region(region_series)?;
        }
        let params = parameters.for_unit(&name)?;
        tracing::info!(%region, unit = %name, rows = params.len(), "simulating unit");
        eag.simulate_with(params, window, cancel)
    };
    run(eag).map_err(|e| e.in_unit(&name))
}

fn daily_index(tmin: NaiveDateTime, tmax: NaiveDateTime) -> Vec<NaiveDateTime> {
    let start = tmin.date().and_time(chrono::NaiveTime::MIN);
    let start = if start < tmin { start + Duration::days(1) } else { start };
    std::iter::successors(Some(start), |t| Some(*t + Duration::days(1)))
        .take_while(|t| *t <= tmax)
        .collect()
}

fn nullable_values(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = df
        .column(name)
        .map_err(|_| WbError::MissingColumn(name.to_string()))?
        .cast(&DataType::Float64)?;
    Ok(column.f64()?.into_iter().collect())
}
