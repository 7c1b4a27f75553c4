use chrono::NaiveDateTime;
use thiserror::Error;

use crate::bucket::BucketId;

#[derive(Error, Debug)]
pub enum WbError {
    // ── Structure ───────────────────────────────────────────────────────────
    #[error("bucket with id {0} is already in the unit")]
    DuplicateBucket(BucketId),

    #[error("there is already a water bucket present in the unit")]
    DuplicateWater,

    #[error("unit '{0}' has no water bucket")]
    MissingWater(String),

    #[error("unit '{0}' is already in the region")]
    DuplicateUnit(String),

    // ── Unresolved references ───────────────────────────────────────────────
    #[error("no parameter rows for bucket {0}")]
    UnresolvedParameter(BucketId),

    #[error("missing parameter: {0}")]
    MissingParameter(String),

    #[error("parameter '{code}' matches {count} rows")]
    AmbiguousParameter { code: String, count: usize },

    // ── Arithmetic ──────────────────────────────────────────────────────────
    #[error("storage {storage} at {at} is too small to divide by")]
    DegenerateStorage { at: NaiveDateTime, storage: f64 },

    #[error("no storage value at {0}")]
    MissingStorage(NaiveDateTime),

    // ── Propagation ─────────────────────────────────────────────────────────
    #[error("bucket {id} failed: {source}")]
    Bucket {
        id: BucketId,
        #[source]
        source: Box<WbError>,
    },

    #[error("unit '{unit}' failed: {source}")]
    Unit {
        unit: String,
        #[source]
        source: Box<WbError>,
    },

    #[error("simulation cancelled")]
    Cancelled,

    // ── Input ───────────────────────────────────────────────────────────────
    #[error("invalid time bound: {0}")]
    InvalidTimeBound(String),

    #[error("invalid window: {tmin} is after {tmax}")]
    InvalidWindow {
        tmin: NaiveDateTime,
        tmax: NaiveDateTime,
    },

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Config: {0}")]
    Config(String),

    #[error("{0}")]
    General(String),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, WbError>;

impl WbError {
    pub(crate) fn in_bucket(self, id: BucketId) -> Self {
        match self {
            WbError::Cancelled => self,
            other => WbError::Bucket {
                id,
                source: Box::new(other),
            },
        }
    }

    pub(crate) fn in_unit(self, unit: &str) -> Self {
        match self {
            WbError::Cancelled => self,
            other => WbError::Unit {
                unit: unit.to_string(),
                source: Box::new(other),
            },
        }
    }
}

#[cfg(feature = "python")]
impl From<WbError> for pyo3::PyErr {
    fn from(err: WbError) -> pyo3::PyErr {
        pyo3::exceptions::PyRuntimeError::new_err(err.to_string())
    }
}

#[cfg(feature = "python")]
impl From<pyo3::PyErr> for WbError {
    fn from(err: pyo3::PyErr) -> Self {
        WbError::General(err.to_string())
    }
}
