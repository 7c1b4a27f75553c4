//! The management unit ("EAG").
//!
//! An `Eag` owns its buckets, exactly one open water and its input series.
//! It can be used on its own or as part of a [`Gaf`](crate::gaf::Gaf).

use std::collections::HashMap;

use polars::prelude::*;
use rayon::prelude::*;

use crate::aggregation;
use crate::bucket::{Bucket, BucketFluxes, BucketId, BucketKind};
use crate::cancel::CancelToken;
use crate::chloride;
use crate::config::ChlorideConfig;
use crate::error::{Result, WbError};
use crate::parameters::{ParameterRow, ParameterTable};
use crate::schema::series as input;
use crate::schema::{parameters, timeseries::DATE_TIME};
use crate::timeseries;
use crate::water::{WaterModel, WaterState};
use crate::window::SimWindow;

pub struct Eag {
    id: Option<i64>,
    name: String,
    /// Name of the region this unit pulls its series from
    region: Option<String>,
    buckets: Vec<Box<dyn Bucket>>,
    /// Bucket id → position in `buckets`
    bucket_index: HashMap<BucketId, usize>,
    water: Option<Box<dyn WaterModel>>,
    series: DataFrame,
    parameters: Option<ParameterTable>,
    bucket_fluxes: Vec<BucketFluxes>,
    water_state: Option<WaterState>,
    /// Open water that produced `water_state`
    water_run: Option<WaterRun>,
}

/// Id and area of the open water at simulation time.
#[derive(Debug, Clone, Copy)]
struct WaterRun {
    id: BucketId,
    area: f64,
}

impl Eag {
    pub fn new(id: Option<i64>, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            region: None,
            buckets: Vec::new(),
            bucket_index: HashMap::new(),
            water: None,
            series: DataFrame::empty(),
            parameters: None,
            bucket_fluxes: Vec::new(),
            water_state: None,
            water_run: None,
        }
    }

    /// Pull `prec` and `evap` from the named region before each simulation.
    pub fn with_region(mut self, region: &str) -> Self {
        self.region = Some(region.to_string());
        self
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn region(&self) -> Option<&str> {
        self.region.as_deref()
    }

    // ── Structure ───────────────────────────────────────────────────────────

    /// Add a bucket. Fails on a duplicate id unless `replace` is set.
    pub fn add_bucket(&mut self, bucket: Box<dyn Bucket>, replace: bool) -> Result<()> {
        let id = bucket.id();
        if self.water.as_ref().is_some_and(|w| w.id() == id) {
            return Err(WbError::DuplicateBucket(id));
        }
        match self.bucket_index.get(&id) {
            Some(&pos) if replace => self.buckets[pos] = bucket,
            Some(_) => return Err(WbError::DuplicateBucket(id)),
            None => {
                self.bucket_index.insert(id, self.buckets.len());
                self.buckets.push(bucket);
            }
        }
        Ok(())
    }

    /// Set the open water. Fails if one is present unless `replace` is set.
    pub fn add_water(&mut self, water: Box<dyn WaterModel>, replace: bool) -> Result<()> {
        if self.water.is_some() && !replace {
            return Err(WbError::DuplicateWater);
        }
        if self.bucket_index.contains_key(&water.id()) {
            return Err(WbError::DuplicateBucket(water.id()));
        }
        self.water = Some(water);
        Ok(())
    }

    pub fn bucket(&self, id: BucketId) -> Option<&dyn Bucket> {
        self.bucket_index.get(&id).map(|&pos| self.buckets[pos].as_ref())
    }

    pub fn buckets(&self) -> impl Iterator<Item = &dyn Bucket> {
        self.buckets.iter().map(|b| b.as_ref())
    }

    pub fn water(&self) -> Option<&dyn WaterModel> {
        self.water.as_deref()
    }

    /// Bucket ids with their kinds, in insertion order.
    pub fn bucket_kinds(&self) -> Vec<(BucketId, BucketKind)> {
        self.buckets.iter().map(|b| (b.id(), b.kind())).collect()
    }

    // ── Series ──────────────────────────────────────────────────────────────

    pub fn series(&self) -> &DataFrame {
        &self.series
    }

    pub fn set_series(&mut self, series: DataFrame) -> Result<()> {
        timeseries::time_index(&series)?;
        self.series = series;
        Ok(())
    }

    /// Copy `prec` and `evap` from the region series.
    ///
    /// Takes the region's index when the unit has no series yet; otherwise
    /// both indices must match.
    pub fn load_series_from_region(&mut self, region_series: &DataFrame) -> Result<()> {
        let columns = [DATE_TIME, input::PRECIPITATION, input::EVAPORATION];
        if self.series.width() == 0 {
            self.series = region_series.select(columns)?;
            return Ok(());
        }
        if timeseries::time_index(&self.series)? != timeseries::time_index(region_series)? {
            return Err(WbError::General(format!(
                "series index of unit '{}' differs from its region",
                self.name
            )));
        }
        for name in [input::PRECIPITATION, input::EVAPORATION] {
            let column = region_series
                .column(name)
                .map_err(|_| WbError::MissingColumn(name.to_string()))?
                .clone();
            self.series.with_column(column)?;
        }
        Ok(())
    }

    // ── Parameters ──────────────────────────────────────────────────────────

    pub fn parameters(&self) -> Option<&ParameterTable> {
        self.parameters.as_ref()
    }

    /// The default parameter rows declared by the buckets, tagged with their ids.
    pub fn get_init_parameters(&self) -> Result<ParameterTable> {
        let rows: Vec<ParameterRow> = self
            .buckets
            .iter()
            .flat_map(|b| {
                let id = b.id();
                b.default_parameters().into_iter().map(move |mut row| {
                    row.bucket_id = id;
                    row
                })
            })
            .collect();
        ParameterTable::from_rows(&rows)
    }

    // ── Simulation ──────────────────────────────────────────────────────────

    pub fn simulate(&mut self, parameters: ParameterTable, window: &SimWindow) -> Result<()> {
        self.simulate_with(parameters, window, &CancelToken::new())
    }

    /// Simulate all buckets, then the open water.
    ///
    /// Buckets run in parallel, each with the parameter rows it owns. The open
    /// water runs once all buckets are done and receives their fluxes. Any
    /// failure aborts the run and leaves the unit without results.
    pub fn simulate_with(
        &mut self,
        parameters: ParameterTable,
        window: &SimWindow,
        cancel: &CancelToken,
    ) -> Result<()> {
        let water = self
            .water
            .as_deref()
            .ok_or_else(|| WbError::MissingWater(self.name.clone()))?;

        self.bucket_fluxes.clear();
        self.water_state = None;
        self.water_run = None;

        let mut known: Vec<BucketId> = self.buckets.iter().map(|b| b.id()).collect();
        known.push(water.id());
        let unresolved = parameters.unresolved(&known);
        if !unresolved.is_empty() {
            tracing::warn!(
                unit = %self.name,
                rows = unresolved.len(),
                "parameter rows owned by no bucket are ignored"
            );
        }

        cancel.checkpoint()?;
        let series = &self.series;
        let fluxes = self
            .buckets
            .par_iter()
            .map(|bucket| -> Result<BucketFluxes> {
                let id = bucket.id();
                let params = parameters.for_bucket(id);
                if params.is_empty() {
                    tracing::warn!(unit = %self.name, "{}", WbError::UnresolvedParameter(id));
                }
                tracing::info!(unit = %self.name, bucket = id, kind = %bucket.kind(), "simulating bucket");
                let fluxes = bucket
                    .simulate(&params, window, series)
                    .map_err(|e| e.in_bucket(id))?;
                Ok(BucketFluxes {
                    id,
                    kind: bucket.kind(),
                    area: bucket.area(),
                    fluxes,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        cancel.checkpoint()?;
        tracing::info!(unit = %self.name, water = water.id(), "simulating open water");
        let state = water
            .simulate(&parameters.for_bucket(water.id()), window, series, &fluxes)
            .map_err(|e| e.in_bucket(water.id()))?;
        let run = WaterRun {
            id: water.id(),
            area: water.area(),
        };

        self.parameters = Some(parameters);
        self.bucket_fluxes = fluxes;
        self.water_state = Some(state);
        self.water_run = Some(run);
        Ok(())
    }

    /// Bucket fluxes of the last run, in bucket order.
    pub fn bucket_fluxes(&self) -> &[BucketFluxes] {
        &self.bucket_fluxes
    }

    pub fn water_state(&self) -> Option<&WaterState> {
        self.water_state.as_ref()
    }

    /// State of the last run together with the water that produced it.
    fn simulated(&self) -> Result<(WaterRun, &WaterState)> {
        match (self.water_run, self.water_state.as_ref()) {
            (Some(run), Some(state)) => Ok((run, state)),
            _ => Err(WbError::General(format!(
                "unit '{}' has not been simulated",
                self.name
            ))),
        }
    }

    // ── Derived series ──────────────────────────────────────────────────────

    /// Category fluxes of the last run. See [`aggregation::aggregate_fluxes`].
    ///
    /// Buckets are classified as they were when simulated; structure changes
    /// made since then take effect on the next run.
    pub fn aggregate_fluxes(&self) -> Result<DataFrame> {
        let (_, state) = self.simulated()?;
        let kinds: Vec<(BucketId, BucketKind)> =
            self.bucket_fluxes.iter().map(|b| (b.id, b.kind)).collect();
        aggregation::aggregate_fluxes(&state.fluxes, &kinds)
    }

    pub fn calculate_chloride_concentration(&self) -> Result<DataFrame> {
        self.calculate_chloride_concentration_with(&ChlorideConfig::default())
    }

    /// Chloride mass and concentration of the open water.
    ///
    /// The initial volume is `(hTarget − hBottom) × area` of the open water.
    pub fn calculate_chloride_concentration_with(&self, config: &ChlorideConfig) -> Result<DataFrame> {
        let (water, state) = self.simulated()?;
        let params = self
            .parameters
            .as_ref()
            .ok_or_else(|| WbError::MissingParameter(parameters::H_TARGET.to_string()))?;

        let h_target = params.single(parameters::H_TARGET, Some(water.id))?;
        let h_bottom = params.single(parameters::H_BOTTOM, Some(water.id))?;
        let initial_volume = (h_target - h_bottom) * water.area;

        let fluxes = self.aggregate_fluxes()?;
        chloride::chloride_balance(&fluxes, &state.storage_by_time()?, initial_volume, config)
    }

    /// Index-only frame for water fractions; no fractions are computed yet.
    pub fn calculate_fractions(&self) -> Result<DataFrame> {
        let fluxes = self.aggregate_fluxes()?;
        Ok(fluxes.select([DATE_TIME])?)
    }
}
