//! Parameter tables.
//!
//! A parameter frame has one row per (bucket, code, layer) with columns
//! `bucket_id`, `code`, `layer_order` and `value`; region-level frames also
//! carry `unit_code`. Rows are addressed by the composite key
//! `<code>_<layer_order>`, which may repeat across buckets.

use std::collections::HashMap;

use polars::prelude::*;

use crate::bucket::BucketId;
use crate::error::{Result, WbError};
use crate::schema::parameters::*;

/// One row of a parameter table.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterRow {
    pub bucket_id: BucketId,
    pub code: String,
    pub layer_order: i64,
    pub value: f64,
    pub unit_code: Option<String>,
}

impl ParameterRow {
    pub fn new(bucket_id: BucketId, code: &str, layer_order: i64, value: f64) -> Self {
        Self {
            bucket_id,
            code: code.to_string(),
            layer_order,
            value,
            unit_code: None,
        }
    }

    pub fn in_unit(mut self, unit_code: &str) -> Self {
        self.unit_code = Some(unit_code.to_string());
        self
    }
}

/// Composite key `<code>_<layer_order>`.
pub fn parameter_key(code: &str, layer_order: i64) -> String {
    format!("{code}_{layer_order}")
}

/// A single value handed to a bucket, still carrying its key.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterValue {
    pub code: String,
    pub layer_order: i64,
    pub value: f64,
}

impl ParameterValue {
    pub fn key(&self) -> String {
        parameter_key(&self.code, self.layer_order)
    }
}

/// The parameter rows owned by one bucket, in table order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSlice {
    entries: Vec<ParameterValue>,
}

impl ParameterSlice {
    pub fn new(entries: Vec<ParameterValue>) -> Self {
        Self { entries }
    }

    pub fn values(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.value).collect()
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.entries.iter().find(|e| e.key() == key).map(|e| e.value)
    }

    /// The one value with this code, whatever its layer.
    pub fn single(&self, code: &str) -> Result<f64> {
        let mut matches = self.entries.iter().filter(|e| e.code == code);
        match (matches.next(), matches.count()) {
            (Some(e), 0) => Ok(e.value),
            (None, _) => Err(WbError::MissingParameter(code.to_string())),
            (Some(_), rest) => Err(WbError::AmbiguousParameter {
                code: code.to_string(),
                count: rest + 1,
            }),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterValue> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Validated parameter frame plus the composite key index.
#[derive(Debug, Clone)]
pub struct ParameterTable {
    df: DataFrame,
    owners: Vec<BucketId>,
    codes: Vec<String>,
    layers: Vec<i64>,
    values: Vec<f64>,
    /// `<code>_<layer_order>` → row positions
    index: HashMap<String, Vec<usize>>,
}

impl ParameterTable {
    /// Wrap a parameter frame.
    ///
    /// Required columns: bucket_id, code, layer_order, value.
    /// `bucket_id` and `layer_order` are cast to Int64 and `value` to Float64.
    pub fn new(df: DataFrame) -> Result<Self> {
        for name in REQUIRED {
            if !df.schema().contains(name) {
                return Err(WbError::MissingColumn(name.to_string()));
            }
        }

        let owner_col = df.column(BUCKET_ID)?.cast(&DataType::Int64)?;
        let code_col = df.column(CODE)?.cast(&DataType::String)?;
        let layer_col = df.column(LAYER_ORDER)?.cast(&DataType::Int64)?;
        let value_col = df.column(VALUE)?.cast(&DataType::Float64)?;

        let owner_ca = owner_col.i64()?;
        let code_ca = code_col.str()?;
        let layer_ca = layer_col.i64()?;
        let value_ca = value_col.f64()?;

        let height = df.height();
        let mut owners = Vec::with_capacity(height);
        let mut codes = Vec::with_capacity(height);
        let mut layers = Vec::with_capacity(height);
        let mut values = Vec::with_capacity(height);
        let mut index: HashMap<String, Vec<usize>> = HashMap::new();

        for i in 0..height {
            let owner = owner_ca
                .get(i)
                .ok_or_else(|| WbError::General(format!("Null {BUCKET_ID} at row {i}")))?;
            let code = code_ca
                .get(i)
                .ok_or_else(|| WbError::General(format!("Null {CODE} at row {i}")))?;
            let layer = layer_ca
                .get(i)
                .ok_or_else(|| WbError::General(format!("Null {LAYER_ORDER} at row {i}")))?;
            let value = value_ca
                .get(i)
                .ok_or_else(|| WbError::General(format!("Null {VALUE} at row {i}")))?;

            index.entry(parameter_key(code, layer)).or_default().push(i);
            owners.push(owner);
            codes.push(code.to_string());
            layers.push(layer);
            values.push(value);
        }

        Ok(Self {
            df,
            owners,
            codes,
            layers,
            values,
            index,
        })
    }

    /// Build a table from rows. A `unit_code` column is added when any row has one.
    pub fn from_rows(rows: &[ParameterRow]) -> Result<Self> {
        let owners: Vec<i64> = rows.iter().map(|r| r.bucket_id).collect();
        let codes: Vec<&str> = rows.iter().map(|r| r.code.as_str()).collect();
        let layers: Vec<i64> = rows.iter().map(|r| r.layer_order).collect();
        let values: Vec<f64> = rows.iter().map(|r| r.value).collect();

        let mut columns = vec![
            Column::new(BUCKET_ID.into(), &owners),
            Column::new(CODE.into(), &codes),
            Column::new(LAYER_ORDER.into(), &layers),
            Column::new(VALUE.into(), &values),
        ];
        if rows.iter().any(|r| r.unit_code.is_some()) {
            let units: Vec<Option<&str>> = rows.iter().map(|r| r.unit_code.as_deref()).collect();
            columns.push(Column::new(UNIT_CODE.into(), &units));
        }

        Self::new(DataFrame::new(columns)?)
    }

    pub fn frame(&self) -> &DataFrame {
        &self.df
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values stored under a composite key, across all owners.
    pub fn lookup(&self, key: &str) -> Vec<f64> {
        self.index
            .get(key)
            .map(|rows| rows.iter().map(|&i| self.values[i]).collect())
            .unwrap_or_default()
    }

    /// The rows owned by `id`, in table order.
    pub fn for_bucket(&self, id: BucketId) -> ParameterSlice {
        let entries = (0..self.len())
            .filter(|&i| self.owners[i] == id)
            .map(|i| ParameterValue {
                code: self.codes[i].clone(),
                layer_order: self.layers[i],
                value: self.values[i],
            })
            .collect();
        ParameterSlice::new(entries)
    }

    /// The rows tagged with `unit_code`, as a table of their own.
    pub fn for_unit(&self, unit_code: &str) -> Result<Self> {
        if !self.df.schema().contains(UNIT_CODE) {
            return Err(WbError::MissingColumn(UNIT_CODE.to_string()));
        }
        let df = self
            .df
            .clone()
            .lazy()
            .filter(col(UNIT_CODE).eq(lit(unit_code)))
            .collect()?;
        Self::new(df)
    }

    /// Resolve a parameter that must hold exactly one value.
    ///
    /// When several rows share the code, only the rows owned by `owner`
    /// are considered.
    pub fn single(&self, code: &str, owner: Option<BucketId>) -> Result<f64> {
        let rows: Vec<usize> = (0..self.len()).filter(|&i| self.codes[i] == code).collect();
        let rows = match (rows.len(), owner) {
            (0, _) => return Err(WbError::MissingParameter(code.to_string())),
            (1, _) | (_, None) => rows,
            (_, Some(owner)) => rows
                .into_iter()
                .filter(|&i| self.owners[i] == owner)
                .collect(),
        };
        match rows.as_slice() {
            [i] => Ok(self.values[*i]),
            [] => Err(WbError::MissingParameter(code.to_string())),
            _ => Err(WbError::AmbiguousParameter {
                code: code.to_string(),
                count: rows.len(),
            }),
        }
    }

    /// Row positions whose owner is not among `known`.
    pub fn unresolved(&self, known: &[BucketId]) -> Vec<usize> {
        (0..self.len())
            .filter(|&i| !known.contains(&self.owners[i]))
            .collect()
    }
}
