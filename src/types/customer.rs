//! Customer record validation and defaults

use crate::config::ValidationConfig;
use crate::error::ValidationError;
use serde::Serialize;
use serde_json::{Map, Value};

/// Attributes one-hot encoded as `{attribute}_{value}`.
pub const CATEGORICAL_FIELDS: [&str; 15] = [
    "gender",
    "Partner",
    "Dependents",
    "PhoneService",
    "MultipleLines",
    "InternetService",
    "OnlineSecurity",
    "OnlineBackup",
    "DeviceProtection",
    "TechSupport",
    "StreamingTV",
    "StreamingMovies",
    "Contract",
    "PaperlessBilling",
    "PaymentMethod",
];

/// Attributes passed through to the model under their own name.
pub const NUMERIC_FIELDS: [&str; 4] = ["SeniorCitizen", "tenure", "MonthlyCharges", "TotalCharges"];

/// Name of the engineered tenure attribute.
pub const TENURE_BUCKET_FIELD: &str = "TenureBucket";

/// Coarse tenure grouping used as an engineered categorical feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TenureBucket {
    UpToYear,
    UpToTwoYears,
    UpToFourYears,
    Longer,
}

impl TenureBucket {
    pub fn from_tenure(months: u32) -> Self {
        if months <= 12 {
            TenureBucket::UpToYear
        } else if months <= 24 {
            TenureBucket::UpToTwoYears
        } else if months <= 48 {
            TenureBucket::UpToFourYears
        } else {
            TenureBucket::Longer
        }
    }

    /// Label used in the encoded column name, identical to training.
    pub fn as_str(&self) -> &'static str {
        match self {
            TenureBucket::UpToYear => "0-12m",
            TenureBucket::UpToTwoYears => "12-24m",
            TenureBucket::UpToFourYears => "24-48m",
            TenureBucket::Longer => "48m+",
        }
    }
}

/// A customer record with every recognized field resolved.
///
/// Built from loosely-structured JSON by [`CustomerProfile::from_json`], which
/// checks required fields and domains and fills documented defaults.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerProfile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    pub tenure: u32,
    #[serde(rename = "Contract")]
    pub contract: String,
    #[serde(rename = "InternetService")]
    pub internet_service: String,
    #[serde(rename = "TechSupport")]
    pub tech_support: String,
    #[serde(rename = "PaymentMethod")]
    pub payment_method: String,
    #[serde(rename = "PaperlessBilling")]
    pub paperless_billing: String,
    #[serde(rename = "MonthlyCharges")]
    pub monthly_charges: f64,
    #[serde(rename = "SeniorCitizen")]
    pub senior_citizen: u8,
    #[serde(rename = "MultipleLines")]
    pub multiple_lines: String,
    pub gender: String,
    #[serde(rename = "Partner")]
    pub partner: String,
    #[serde(rename = "Dependents")]
    pub dependents: String,
    #[serde(rename = "PhoneService")]
    pub phone_service: String,
    #[serde(rename = "OnlineSecurity")]
    pub online_security: String,
    #[serde(rename = "OnlineBackup")]
    pub online_backup: String,
    #[serde(rename = "DeviceProtection")]
    pub device_protection: String,
    #[serde(rename = "StreamingTV")]
    pub streaming_tv: String,
    #[serde(rename = "StreamingMovies")]
    pub streaming_movies: String,
    #[serde(rename = "TotalCharges", skip_serializing_if = "Option::is_none")]
    pub total_charges: Option<f64>,
}

impl CustomerProfile {
    /// Create a profile from the required fields, defaulting the rest.
    pub fn new(
        tenure: u32,
        contract: &str,
        internet_service: &str,
        tech_support: &str,
        payment_method: &str,
        paperless_billing: &str,
        monthly_charges: f64,
    ) -> Self {
        Self {
            customer_id: None,
            tenure,
            contract: contract.to_string(),
            internet_service: internet_service.to_string(),
            tech_support: tech_support.to_string(),
            payment_method: payment_method.to_string(),
            paperless_billing: paperless_billing.to_string(),
            monthly_charges,
            senior_citizen: 0,
            multiple_lines: "No".to_string(),
            gender: "Male".to_string(),
            partner: "No".to_string(),
            dependents: "No".to_string(),
            phone_service: "Yes".to_string(),
            online_security: "No".to_string(),
            online_backup: "No".to_string(),
            device_protection: "No".to_string(),
            streaming_tv: "No".to_string(),
            streaming_movies: "No".to_string(),
            total_charges: None,
        }
    }

    /// Validate a raw JSON record and apply defaults.
    pub fn from_json(value: &Value, limits: &ValidationConfig) -> Result<Self, ValidationError> {
        let obj = value.as_object().ok_or(ValidationError::NotAnObject)?;

        let tenure = required_number(obj, "tenure")?;
        check_range("tenure", tenure, 0.0, limits.max_tenure as f64)?;
        if tenure.fract() != 0.0 {
            return Err(ValidationError::InvalidType {
                field: "tenure",
                expected: "a whole number of months",
            });
        }

        let monthly_charges = required_number(obj, "MonthlyCharges")?;
        check_range("MonthlyCharges", monthly_charges, 0.0, limits.max_monthly_charges)?;

        let mut profile = Self::new(
            tenure as u32,
            &required_str(obj, "Contract")?,
            &required_str(obj, "InternetService")?,
            &required_str(obj, "TechSupport")?,
            &required_str(obj, "PaymentMethod")?,
            &required_str(obj, "PaperlessBilling")?,
            monthly_charges,
        );

        profile.customer_id = match obj.get("customer_id") {
            None | Some(Value::Null) => None,
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            Some(_) => {
                return Err(ValidationError::InvalidType {
                    field: "customer_id",
                    expected: "a string",
                })
            }
        };

        if let Some(senior) = optional_number(obj, "SeniorCitizen")? {
            if senior != 0.0 && senior != 1.0 {
                return Err(ValidationError::OutOfRange {
                    field: "SeniorCitizen",
                    value: senior,
                    min: 0.0,
                    max: 1.0,
                });
            }
            profile.senior_citizen = senior as u8;
        }

        if let Some(total) = optional_number(obj, "TotalCharges")? {
            check_range("TotalCharges", total, 0.0, f64::MAX)?;
            profile.total_charges = Some(total);
        }

        let optional = [
            ("MultipleLines", &mut profile.multiple_lines),
            ("gender", &mut profile.gender),
            ("Partner", &mut profile.partner),
            ("Dependents", &mut profile.dependents),
            ("PhoneService", &mut profile.phone_service),
            ("OnlineSecurity", &mut profile.online_security),
            ("OnlineBackup", &mut profile.online_backup),
            ("DeviceProtection", &mut profile.device_protection),
            ("StreamingTV", &mut profile.streaming_tv),
            ("StreamingMovies", &mut profile.streaming_movies),
        ];
        for (field, slot) in optional {
            if let Some(value) = optional_str(obj, field)? {
                *slot = value;
            }
        }

        Ok(profile)
    }

    pub fn tenure_bucket(&self) -> TenureBucket {
        TenureBucket::from_tenure(self.tenure)
    }

    /// Categorical attributes in encoder order, excluding the tenure bucket.
    pub fn categorical_values(&self) -> [(&'static str, &str); 15] {
        [
            ("gender", &self.gender),
            ("Partner", &self.partner),
            ("Dependents", &self.dependents),
            ("PhoneService", &self.phone_service),
            ("MultipleLines", &self.multiple_lines),
            ("InternetService", &self.internet_service),
            ("OnlineSecurity", &self.online_security),
            ("OnlineBackup", &self.online_backup),
            ("DeviceProtection", &self.device_protection),
            ("TechSupport", &self.tech_support),
            ("StreamingTV", &self.streaming_tv),
            ("StreamingMovies", &self.streaming_movies),
            ("Contract", &self.contract),
            ("PaperlessBilling", &self.paperless_billing),
            ("PaymentMethod", &self.payment_method),
        ]
    }

    /// Numeric attributes that are present. Absent `TotalCharges` is left out.
    pub fn numeric_values(&self) -> Vec<(&'static str, f64)> {
        let mut values = vec![
            ("SeniorCitizen", self.senior_citizen as f64),
            ("tenure", self.tenure as f64),
            ("MonthlyCharges", self.monthly_charges),
        ];
        if let Some(total) = self.total_charges {
            values.push(("TotalCharges", total));
        }
        values
    }
}

fn lookup<'a>(obj: &'a Map<String, Value>, field: &str) -> Option<&'a Value> {
    obj.get(field).filter(|v| !v.is_null())
}

fn required_number(obj: &Map<String, Value>, field: &'static str) -> Result<f64, ValidationError> {
    optional_number(obj, field)?.ok_or(ValidationError::MissingField { field })
}

fn optional_number(
    obj: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<f64>, ValidationError> {
    match lookup(obj, field) {
        None => Ok(None),
        Some(value) => value
            .as_f64()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or(ValidationError::InvalidType {
                field,
                expected: "a finite number",
            }),
    }
}

fn required_str(obj: &Map<String, Value>, field: &'static str) -> Result<String, ValidationError> {
    optional_str(obj, field)?.ok_or(ValidationError::MissingField { field })
}

fn optional_str(
    obj: &Map<String, Value>,
    field: &'static str,
) -> Result<Option<String>, ValidationError> {
    match lookup(obj, field) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(_) => Err(ValidationError::InvalidType {
            field,
            expected: "a string",
        }),
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    if value < min || value > max {
        return Err(ValidationError::OutOfRange {
            field,
            value,
            min,
            max,
        });
    }
    Ok(())
}
