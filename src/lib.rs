//! Water balance of drainage units ("EAG") and regions of units ("Gaf").
//!
//! A unit is built from buckets (paved, unpaved, drain, ...) and one open
//! water. Simulating a unit runs every bucket and then the open water; the
//! open-water fluxes are then aggregated into reporting categories, from which
//! the chloride concentration of the water follows.

pub mod aggregation;
pub mod bucket;
pub mod cancel;
pub mod chloride;
pub mod config;
pub mod eag;
pub mod error;
pub mod gaf;
pub mod parameters;
pub mod schema;
pub mod timeseries;
pub mod water;
pub mod window;

#[cfg(feature = "python")]
mod python;

pub use bucket::{Bucket, BucketFluxes, BucketId, BucketKind, PrescribedBucket};
pub use cancel::CancelToken;
pub use config::ChlorideConfig;
pub use eag::Eag;
pub use error::{Result, WbError};
pub use gaf::{FillNa, Gaf, RegionReport};
pub use parameters::{ParameterRow, ParameterSlice, ParameterTable};
pub use water::{OpenWater, WaterModel, WaterState};
pub use window::{SimWindow, TimeBound};

#[cfg(feature = "python")]
mod py_module {
    use pyo3::prelude::*;
    use pyo3::types::PyModule;

    use crate::schema;

    /// Export schema constants as Python submodules
    fn add_schema_exports(m: &Bound<'_, PyModule>) -> PyResult<()> {
        // Parameters
        let parameters = PyModule::new(m.py(), "parameters")?;
        parameters.add("BUCKET_ID", schema::parameters::BUCKET_ID)?;
        parameters.add("CODE", schema::parameters::CODE)?;
        parameters.add("LAYER_ORDER", schema::parameters::LAYER_ORDER)?;
        parameters.add("VALUE", schema::parameters::VALUE)?;
        parameters.add("UNIT_CODE", schema::parameters::UNIT_CODE)?;
        m.add_submodule(&parameters)?;

        // Series
        let series = PyModule::new(m.py(), "series")?;
        series.add("PRECIPITATION", schema::series::PRECIPITATION)?;
        series.add("EVAPORATION", schema::series::EVAPORATION)?;
        series.add("SEEPAGE", schema::series::SEEPAGE)?;
        series.add("LEAKAGE", schema::series::LEAKAGE)?;
        series.add("INTAKE", schema::series::INTAKE)?;
        series.add("OUTTAKE", schema::series::OUTTAKE)?;
        m.add_submodule(&series)?;

        // Flux kinds
        let flux = PyModule::new(m.py(), "flux")?;
        flux.add("OUTFLOW", schema::flux::OUTFLOW)?;
        flux.add("VERTICAL", schema::flux::VERTICAL)?;
        m.add_submodule(&flux)?;

        // Categories
        let category = PyModule::new(m.py(), "category")?;
        category.add("ALL", schema::category::ALL.to_vec())?;
        m.add_submodule(&category)?;

        // Chloride
        let chloride = PyModule::new(m.py(), "chloride")?;
        chloride.add("MASS", schema::chloride::MASS)?;
        chloride.add("CONCENTRATION", schema::chloride::CONCENTRATION)?;
        m.add_submodule(&chloride)?;

        // TimeSeries
        let timeseries = PyModule::new(m.py(), "timeseries")?;
        timeseries.add("DATE_TIME", schema::timeseries::DATE_TIME)?;
        m.add_submodule(&timeseries)?;

        Ok(())
    }

    #[pymodule]
    fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
        m.add_class::<crate::python::PyEag>()?;
        add_schema_exports(m)?;
        Ok(())
    }
}
