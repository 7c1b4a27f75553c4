//! Mapping of raw aggregator fluxes onto reporting categories.

use polars::prelude::*;

use crate::bucket::{BucketId, BucketKind};
use crate::error::Result;
use crate::schema::{category, flux};
use crate::timeseries;

/// Own aggregator fluxes that map one-to-one onto a category.
const DIRECT: [(&str, &str); 6] = [
    (flux::PRECIPITATION, category::PRECIPITATION),
    (flux::EVAPORATION, category::EVAPORATION),
    (flux::SEEPAGE, category::SEEPAGE_IN),
    (flux::LEAKAGE, category::SEEPAGE_OUT),
    (flux::INTAKE, category::INTAKE),
    (flux::OUTTAKE, category::OUTTAKE),
];

/// Which part of a bucket flux enters a category sum.
#[derive(Debug, Clone, Copy)]
enum Part {
    All,
    /// Negative values clamped to zero
    Positive,
    /// Positive values clamped to zero
    Negative,
}

impl Part {
    fn apply(self, v: f64) -> f64 {
        match self {
            Part::All => v,
            Part::Positive => v.max(0.0),
            Part::Negative => v.min(0.0),
        }
    }
}

/// Aggregate the aggregator's flux table into category fluxes.
///
/// `buckets` lists the unit's buckets (excluding the aggregator). The result
/// has the aggregator's time index and the columns of [`category::ALL`]:
///
/// * paved_runoff: `q_oa` of paved buckets
/// * leaching: positive `q_ui` of paved and unpaved buckets
/// * infiltration: negative `q_ui` of all buckets
/// * surface_runoff: `q_oa` of unpaved buckets
/// * drainage: zero
pub fn aggregate_fluxes(fluxes: &DataFrame, buckets: &[(BucketId, BucketKind)]) -> Result<DataFrame> {
    let index = timeseries::time_index(fluxes)?;
    let n = index.len();

    let mut columns: Vec<(&str, Vec<f64>)> = DIRECT
        .iter()
        .map(|(raw, name)| -> Result<(&str, Vec<f64>)> {
            Ok((*name, timeseries::values(fluxes, raw)?))
        })
        .collect::<Result<_>>()?;

    let of_kind = |kinds: &[BucketKind]| -> Vec<BucketId> {
        buckets
            .iter()
            .filter(|(_, kind)| kinds.contains(kind))
            .map(|(id, _)| *id)
            .collect()
    };
    let all: Vec<BucketId> = buckets.iter().map(|(id, _)| *id).collect();

    columns.push((
        category::PAVED_RUNOFF,
        sum_bucket_flux(fluxes, n, flux::OUTFLOW, &of_kind(&[BucketKind::Paved]), Part::All)?,
    ));
    columns.push((
        category::LEACHING,
        sum_bucket_flux(
            fluxes,
            n,
            flux::VERTICAL,
            &of_kind(&[BucketKind::Paved, BucketKind::Unpaved]),
            Part::Positive,
        )?,
    ));
    columns.push((
        category::INFILTRATION,
        sum_bucket_flux(fluxes, n, flux::VERTICAL, &all, Part::Negative)?,
    ));
    columns.push((
        category::SURFACE_RUNOFF,
        sum_bucket_flux(fluxes, n, flux::OUTFLOW, &of_kind(&[BucketKind::Unpaved]), Part::All)?,
    ));
    // TODO: drainage should become drain q_oa minus its positive q_ui once
    // drain buckets report that split.
    columns.push((category::DRAINAGE, vec![0.0; n]));

    columns.sort_by_key(|(name, _)| category::ALL.iter().position(|c| c == name));
    timeseries::frame(&index, columns)
}

/// Sum `<kind>_<id>` over `ids`, taking only `part` of each value.
fn sum_bucket_flux(
    fluxes: &DataFrame,
    n: usize,
    kind: &str,
    ids: &[BucketId],
    part: Part,
) -> Result<Vec<f64>> {
    let mut total = vec![0.0; n];
    for id in ids {
        let values = timeseries::values(fluxes, &flux::column(kind, *id))?;
        for (acc, v) in total.iter_mut().zip(values) {
            *acc += part.apply(v);
        }
    }
    Ok(total)
}
