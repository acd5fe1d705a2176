//! Feature encoding and alignment for churn model inference.
//!
//! Customer records are encoded with the same convention the training
//! pipeline used: numeric attributes keep their name, categorical attributes
//! (including the engineered `TenureBucket`) become `{attribute}_{value}`
//! indicator columns. The encoded columns are then aligned onto the canonical
//! feature list so the model always sees the schema it was fit on.

use crate::config::ValidationConfig;
use crate::error::{ModelError, ValidationError};
use crate::types::customer::{
    CustomerProfile, CATEGORICAL_FIELDS, NUMERIC_FIELDS, TENURE_BUCKET_FIELD,
};
use serde_json::Value;
use std::collections::HashMap;

/// Sparse encoded record: column name to value. Absent columns are zero.
pub type EncodedRecord = HashMap<String, f64>;

/// Column name for a categorical attribute value.
pub fn indicator_column(attribute: &str, value: &str) -> String {
    format!("{}_{}", attribute, value)
}

/// Canonical ordered feature list the model was trained on.
#[derive(Debug, Clone)]
pub struct FeatureSchema {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

impl FeatureSchema {
    /// Build a schema, rejecting empty lists and duplicate names.
    pub fn new(names: Vec<String>) -> Result<Self, ModelError> {
        if names.is_empty() {
            return Err(ModelError::invalid("feature name list is empty"));
        }

        let mut index = HashMap::with_capacity(names.len());
        for (position, name) in names.iter().enumerate() {
            if index.insert(name.clone(), position).is_some() {
                return Err(ModelError::invalid(format!(
                    "duplicate feature name `{}`",
                    name
                )));
            }
        }

        Ok(Self { names, index })
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Project an encoded record onto the canonical order.
    ///
    /// Missing columns are zero-filled; columns outside the schema are dropped.
    /// The output length always equals [`FeatureSchema::len`].
    pub fn align(&self, encoded: &EncodedRecord) -> Vec<f32> {
        self.names
            .iter()
            .map(|name| encoded.get(name).copied().unwrap_or(0.0) as f32)
            .collect()
    }

    /// Encoded columns the model does not know about.
    pub fn dropped_columns<'a>(&self, encoded: &'a EncodedRecord) -> Vec<&'a str> {
        let mut dropped: Vec<&str> = encoded
            .keys()
            .filter(|column| !self.contains(column))
            .map(|column| column.as_str())
            .collect();
        dropped.sort_unstable();
        dropped
    }

    /// Canonical names that the encoder can never produce.
    ///
    /// Non-empty output means training and inference disagree on the
    /// column naming convention.
    pub fn unrecognized_features(&self) -> Vec<&str> {
        let prefixes: Vec<String> = CATEGORICAL_FIELDS
            .iter()
            .chain(std::iter::once(&TENURE_BUCKET_FIELD))
            .map(|attribute| format!("{}_", attribute))
            .collect();

        self.names
            .iter()
            .filter(|name| {
                !NUMERIC_FIELDS.contains(&name.as_str())
                    && !prefixes.iter().any(|prefix| name.starts_with(prefix.as_str()))
            })
            .map(|name| name.as_str())
            .collect()
    }
}

/// Encodes customer records into model input features.
pub struct FeatureEncoder {
    limits: ValidationConfig,
}

impl FeatureEncoder {
    pub fn new(limits: ValidationConfig) -> Self {
        Self { limits }
    }

    /// Validate a raw record and apply defaults.
    pub fn validate(&self, record: &Value) -> Result<CustomerProfile, ValidationError> {
        CustomerProfile::from_json(record, &self.limits)
    }

    /// One-hot encode a profile.
    pub fn encode(&self, profile: &CustomerProfile) -> EncodedRecord {
        let mut encoded =
            EncodedRecord::with_capacity(NUMERIC_FIELDS.len() + CATEGORICAL_FIELDS.len() + 1);

        for (name, value) in profile.numeric_values() {
            encoded.insert(name.to_string(), value);
        }
        for (attribute, value) in profile.categorical_values() {
            encoded.insert(indicator_column(attribute, value), 1.0);
        }
        encoded.insert(
            indicator_column(TENURE_BUCKET_FIELD, profile.tenure_bucket().as_str()),
            1.0,
        );

        encoded
    }

    /// Validate, encode and align a raw record onto `schema`.
    pub fn align_features(
        &self,
        record: &Value,
        schema: &FeatureSchema,
    ) -> Result<Vec<f32>, ValidationError> {
        let profile = self.validate(record)?;
        Ok(schema.align(&self.encode(&profile)))
    }
}

impl Default for FeatureEncoder {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}
