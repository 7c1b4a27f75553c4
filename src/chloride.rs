//! Chloride mass balance of the open water.
//!
//! Mass enters with each category flux at that category's source
//! concentration and leaves with the outgoing volume at the concentration of
//! the previous step. Each step depends on the previous one, so the balance is
//! a left fold over the time index in row order.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use polars::prelude::*;

use crate::config::ChlorideConfig;
use crate::error::{Result, WbError};
use crate::schema::{category, chloride};
use crate::timeseries;

/// State carried from one step to the next.
#[derive(Debug, Clone, Copy)]
struct MassState {
    mass: f64,
    c_out: f64,
}

/// Compute chloride mass and concentration for each row of `aggregated`.
///
/// `aggregated` is the category table from
/// [`aggregate_fluxes`](crate::aggregation::aggregate_fluxes); `storage` is
/// looked up by timestamp. The water starts at
/// `initial_volume × config.initial_concentration`.
pub fn chloride_balance(
    aggregated: &DataFrame,
    storage: &HashMap<NaiveDateTime, f64>,
    initial_volume: f64,
    config: &ChlorideConfig,
) -> Result<DataFrame> {
    let index = timeseries::time_index(aggregated)?;
    let n = index.len();

    let mut incoming = vec![0.0; n];
    for (name, concentration) in &config.source_concentrations {
        let values = timeseries::values(aggregated, name)?;
        for (acc, v) in incoming.iter_mut().zip(values) {
            *acc += v * concentration;
        }
    }

    let mut outgoing = vec![0.0; n];
    for name in category::OUTGOING {
        for (acc, v) in outgoing.iter_mut().zip(timeseries::values(aggregated, name)?) {
            *acc += v;
        }
    }

    let storage_at = |t: &NaiveDateTime| -> Result<f64> {
        let s = *storage.get(t).ok_or(WbError::MissingStorage(*t))?;
        if s > config.storage_epsilon {
            Ok(s)
        } else {
            Err(WbError::DegenerateStorage { at: *t, storage: s })
        }
    };

    let initial = MassState {
        mass: config.initial_concentration * initial_volume,
        c_out: config.initial_concentration,
    };

    let (_, mass) = index
        .iter()
        .zip(incoming.iter().zip(&outgoing))
        .try_fold(
            (initial, Vec::with_capacity(n)),
            |(state, mut recorded), (t, (m_in, v_out))| -> Result<_> {
                let mass = state.mass + m_in + v_out * state.c_out;
                recorded.push(mass);
                let next = MassState {
                    mass,
                    c_out: mass / storage_at(t)?,
                };
                Ok((next, recorded))
            },
        )?;

    let concentration = index
        .iter()
        .zip(&mass)
        .map(|(t, m)| -> Result<f64> { Ok(m / storage_at(t)?) })
        .collect::<Result<Vec<f64>>>()?;

    timeseries::frame(
        &index,
        vec![
            (chloride::MASS, mass),
            (chloride::CONCENTRATION, concentration),
        ],
    )
}
