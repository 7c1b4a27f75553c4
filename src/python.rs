//! Python bindings.

use polars::prelude::DataFrame;
use pyo3::prelude::*;
use pyo3_polars::PyDataFrame;

use crate::bucket::{Bucket, BucketId, BucketKind};
use crate::config::ChlorideConfig;
use crate::eag::Eag;
use crate::error::{Result, WbError};
use crate::parameters::{ParameterSlice, ParameterTable};
use crate::water::OpenWater;
use crate::window::SimWindow;

/// Bucket backed by a Python object.
///
/// The object provides `simulate(params, tmin, tmax, series)` where `params`
/// is a list of `(key, value)` tuples, and returns a polars DataFrame with
/// `date_time`, `q_oa` and `q_ui`.
struct PyBucket {
    id: BucketId,
    kind: BucketKind,
    area: f64,
    model: PyObject,
}

impl Bucket for PyBucket {
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
        Python::with_gil(|py| -> PyResult<DataFrame> {
            let keyed: Vec<(String, f64)> = params.iter().map(|p| (p.key(), p.value)).collect();
            let result = self.model.call_method1(
                py,
                "simulate",
                (keyed, window.tmin, window.tmax, PyDataFrame(series.clone())),
            )?;
            let df: PyDataFrame = result.extract(py)?;
            Ok(df.0)
        })
        .map_err(WbError::from)
    }
}

#[pyclass(name = "Eag")]
pub struct PyEag {
    inner: Eag,
}

#[pymethods]
impl PyEag {
    #[new]
    #[pyo3(signature = (name, id=None))]
    fn new(name: &str, id: Option<i64>) -> Self {
        Self {
            inner: Eag::new(id, name),
        }
    }

    #[getter]
    fn name(&self) -> String {
        self.inner.name().to_string()
    }

    /// Add a bucket backed by a Python model object.
    #[pyo3(signature = (id, kind, area, model, replace=false))]
    fn add_bucket(
        &mut self,
        id: BucketId,
        kind: &str,
        area: f64,
        model: PyObject,
        replace: bool,
    ) -> PyResult<()> {
        let bucket = PyBucket {
            id,
            kind: BucketKind::from_label(kind),
            area,
            model,
        };
        Ok(self.inner.add_bucket(Box::new(bucket), replace)?)
    }

    #[pyo3(signature = (id, area, replace=false))]
    fn add_water(&mut self, id: BucketId, area: f64, replace: bool) -> PyResult<()> {
        Ok(self
            .inner
            .add_water(Box::new(OpenWater::new(id, area)), replace)?)
    }

    fn set_series(&mut self, series: PyDataFrame) -> PyResult<()> {
        Ok(self.inner.set_series(series.0)?)
    }

    /// Run the water balance. Bounds are strings such as "2000" or "2015-12-31".
    #[pyo3(signature = (params, tmin=None, tmax=None))]
    fn simulate(
        &mut self,
        py: Python<'_>,
        params: PyDataFrame,
        tmin: Option<&str>,
        tmax: Option<&str>,
    ) -> PyResult<()> {
        let window = SimWindow::parse(tmin, tmax)?;
        let params = ParameterTable::new(params.0)?;
        let inner = &mut self.inner;
        // Buckets call back into Python from worker threads
        py.allow_threads(move || inner.simulate(params, &window))?;
        Ok(())
    }

    fn aggregate_fluxes(&self) -> PyResult<PyDataFrame> {
        Ok(PyDataFrame(self.inner.aggregate_fluxes()?))
    }

    /// Chloride mass and concentration; `config` is an optional TOML file.
    #[pyo3(signature = (config=None))]
    fn calculate_chloride_concentration(&self, config: Option<&str>) -> PyResult<PyDataFrame> {
        let config = match config {
            Some(path) => ChlorideConfig::load(path)?,
            None => ChlorideConfig::default(),
        };
        Ok(PyDataFrame(
            self.inner.calculate_chloride_concentration_with(&config)?,
        ))
    }
}
