//! Model serialization and persistence
//!
//! A trained model is written as a versioned JSON record. Loading parses the
//! record into typed fields first and checks every table shape against the
//! others, so a missing, mistyped or inconsistent field fails the whole load
//! with [`SVMError::MalformedModel`] instead of producing a half-built model.
//!
//! JSON numbers cannot hold infinities or NaN, so those are written as the
//! strings `"inf"`, `"-inf"` and `"nan"`.

use crate::core::{Result, SVMError, SparseVector, SvmType};
use crate::kernel::KernelParams;
use crate::model::{Calibration, SvmModel};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

/// Version written into every record; other versions are rejected
pub const MODEL_FORMAT_VERSION: u32 = 1;

/// Serializable representation of a trained SVM model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelRecord {
    pub format_version: u32,
    /// Problem type code, see [`SvmType::code`]
    pub svm_type: i32,
    pub kernel: KernelParams,
    pub nr_class: usize,
    pub labels: Vec<i32>,
    #[serde(with = "json_float::list")]
    pub rho: Vec<f64>,
    pub total_sv: usize,
    pub sv_counts: Vec<usize>,
    pub support_vectors: Vec<SerializableVector>,
    #[serde(with = "json_float::table")]
    pub sv_coef: Vec<Vec<f64>>,
    /// Platt parameters per class pair, empty when uncalibrated
    #[serde(with = "json_float::list")]
    pub prob_a: Vec<f64>,
    #[serde(with = "json_float::list")]
    pub prob_b: Vec<f64>,
    /// Laplace scale of a calibrated regression model
    #[serde(with = "json_float::optional")]
    pub sigma: Option<f64>,
    pub n_features: usize,
    pub sv_indices: Vec<usize>,
    pub metadata: ModelMetadata,
}

/// Serializable sparse vector
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SerializableVector {
    /// Feature indices
    pub indices: Vec<usize>,
    /// Feature values
    #[serde(with = "json_float::list")]
    pub values: Vec<f64>,
}

mod json_float {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    #[serde(untagged)]
    enum JsonFloat {
        Number(f64),
        Text(String),
    }

    impl From<f64> for JsonFloat {
        fn from(v: f64) -> Self {
            if v.is_finite() {
                JsonFloat::Number(v)
            } else if v.is_nan() {
                JsonFloat::Text("nan".to_string())
            } else if v > 0.0 {
                JsonFloat::Text("inf".to_string())
            } else {
                JsonFloat::Text("-inf".to_string())
            }
        }
    }

    impl JsonFloat {
        fn value<E: Error>(self) -> Result<f64, E> {
            match self {
                JsonFloat::Number(v) => Ok(v),
                JsonFloat::Text(text) => match text.as_str() {
                    "inf" => Ok(f64::INFINITY),
                    "-inf" => Ok(f64::NEG_INFINITY),
                    "nan" => Ok(f64::NAN),
                    _ => Err(E::custom(format!("invalid float '{}'", text))),
                },
            }
        }
    }

    fn encode(values: &[f64]) -> Vec<JsonFloat> {
        values.iter().map(|&v| JsonFloat::from(v)).collect()
    }

    fn decode<E: Error>(values: Vec<JsonFloat>) -> Result<Vec<f64>, E> {
        values.into_iter().map(JsonFloat::value).collect()
    }

    pub mod list {
        use super::*;

        pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
            encode(values).serialize(serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
            decode(Vec::deserialize(deserializer)?)
        }
    }

    pub mod table {
        use super::*;

        pub fn serialize<S: Serializer>(rows: &[Vec<f64>], serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_seq(rows.iter().map(|row| encode(row)))
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Vec<Vec<f64>>, D::Error> {
            Vec::<Vec<JsonFloat>>::deserialize(deserializer)?
                .into_iter()
                .map(decode)
                .collect()
        }
    }

    pub mod optional {
        use super::*;

        pub fn serialize<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
            value.map(JsonFloat::from).serialize(serializer)
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<f64>, D::Error> {
            Option::<JsonFloat>::deserialize(deserializer)?
                .map(JsonFloat::value)
                .transpose()
        }
    }
}

/// Model metadata for tracking
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    /// Library version used to create the model
    pub library_version: String,
    /// Creation timestamp
    pub created_at: String,
}

impl From<&SparseVector> for SerializableVector {
    fn from(v: &SparseVector) -> Self {
        Self {
            indices: v.indices.clone(),
            values: v.values.clone(),
        }
    }
}

impl TryFrom<&SerializableVector> for SparseVector {
    type Error = SVMError;

    fn try_from(v: &SerializableVector) -> Result<Self> {
        if v.indices.len() != v.values.len() {
            return Err(SVMError::MalformedModel(format!(
                "support vector has {} indices but {} values",
                v.indices.len(),
                v.values.len()
            )));
        }
        Ok(SparseVector::new(v.indices.clone(), v.values.clone()))
    }
}

impl From<&SvmModel> for ModelRecord {
    fn from(model: &SvmModel) -> Self {
        let (prob_a, prob_b, sigma) = match &model.calibration {
            Calibration::None => (Vec::new(), Vec::new(), None),
            Calibration::Pairwise { a, b } => (a.clone(), b.clone(), None),
            Calibration::Laplace { sigma } => (Vec::new(), Vec::new(), Some(*sigma)),
        };

        Self {
            format_version: MODEL_FORMAT_VERSION,
            svm_type: model.svm_type.code(),
            kernel: model.kernel,
            nr_class: model.nr_class,
            labels: model.labels.clone(),
            rho: model.rho.clone(),
            total_sv: model.support_vectors.len(),
            sv_counts: model.sv_counts.clone(),
            support_vectors: model
                .support_vectors
                .iter()
                .map(SerializableVector::from)
                .collect(),
            sv_coef: model.sv_coef.clone(),
            prob_a,
            prob_b,
            sigma,
            n_features: model.n_features,
            sv_indices: model.sv_indices.clone(),
            metadata: ModelMetadata {
                library_version: env!("CARGO_PKG_VERSION").to_string(),
                created_at: chrono::Utc::now().to_rfc3339(),
            },
        }
    }
}

fn malformed(message: impl Into<String>) -> SVMError {
    SVMError::MalformedModel(message.into())
}

impl TryFrom<ModelRecord> for SvmModel {
    type Error = SVMError;

    fn try_from(record: ModelRecord) -> Result<Self> {
        if record.format_version != MODEL_FORMAT_VERSION {
            return Err(malformed(format!(
                "unsupported format_version {}",
                record.format_version
            )));
        }
        let svm_type = SvmType::from_code(record.svm_type)
            .ok_or_else(|| malformed(format!("unknown svm_type {}", record.svm_type)))?;
        record
            .kernel
            .validate()
            .map_err(|e| malformed(format!("kernel: {}", e)))?;

        let k = record.nr_class;
        if k < 2 {
            return Err(malformed(format!("nr_class must be at least 2, got {}", k)));
        }
        let n_pairs = if svm_type.is_classification() {
            k * (k - 1) / 2
        } else {
            1
        };

        if svm_type.is_classification() {
            if record.labels.len() != k {
                return Err(malformed("labels must list nr_class entries"));
            }
            if record.sv_counts.len() != k {
                return Err(malformed("sv_counts must list nr_class entries"));
            }
        } else if !record.labels.is_empty() || record.sv_counts.len() != 1 {
            return Err(malformed(
                "one-class and regression models carry no labels and one sv_count",
            ));
        }
        if record.rho.len() != n_pairs {
            return Err(malformed(format!(
                "rho has {} entries, expected {}",
                record.rho.len(),
                n_pairs
            )));
        }

        let total_sv = record.total_sv;
        if record.sv_counts.iter().sum::<usize>() != total_sv {
            return Err(malformed("sum of sv_counts differs from total_sv"));
        }
        if record.support_vectors.len() != total_sv {
            return Err(malformed("support_vectors length differs from total_sv"));
        }
        let coef_rows = if svm_type.is_classification() { k - 1 } else { 1 };
        if record.sv_coef.len() != coef_rows
            || record.sv_coef.iter().any(|row| row.len() != total_sv)
        {
            return Err(malformed(format!(
                "sv_coef must be {} rows of {} coefficients",
                coef_rows, total_sv
            )));
        }
        if !record.sv_indices.is_empty() && record.sv_indices.len() != total_sv {
            return Err(malformed("sv_indices length differs from total_sv"));
        }

        let calibration = match (record.prob_a.len(), record.prob_b.len(), record.sigma) {
            (0, 0, None) => Calibration::None,
            (0, 0, Some(sigma)) if svm_type.is_regression() => Calibration::Laplace { sigma },
            (a, b, None) if a == n_pairs && b == n_pairs && svm_type.is_classification() => {
                Calibration::Pairwise {
                    a: record.prob_a,
                    b: record.prob_b,
                }
            }
            _ => return Err(malformed("inconsistent probability fields")),
        };

        let support_vectors = record
            .support_vectors
            .iter()
            .map(SparseVector::try_from)
            .collect::<Result<Vec<_>>>()?;
        if let Some(sv) = support_vectors.iter().find(|sv| sv.dim() > record.n_features) {
            return Err(malformed(format!(
                "support vector of dimension {} exceeds n_features {}",
                sv.dim(),
                record.n_features
            )));
        }

        Ok(SvmModel {
            svm_type,
            kernel: record.kernel,
            nr_class: k,
            labels: record.labels,
            rho: record.rho,
            support_vectors,
            sv_indices: record.sv_indices,
            sv_counts: record.sv_counts,
            sv_coef: record.sv_coef,
            calibration,
            n_features: record.n_features,
            warnings: Vec::new(),
        })
    }
}

impl ModelRecord {
    /// Write the record as pretty-printed JSON
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer_pretty(writer, self)
            .map_err(|e| SVMError::SerializationError(e.to_string()))
    }

    /// Parse a record; missing or mistyped keys are reported as malformed
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        serde_json::from_reader(reader).map_err(|e| {
            if e.is_io() {
                SVMError::SerializationError(e.to_string())
            } else {
                SVMError::MalformedModel(e.to_string())
            }
        })
    }
}

impl SvmModel {
    /// Save model to file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path).map_err(SVMError::IoError)?;
        let mut writer = BufWriter::new(file);
        ModelRecord::from(self).to_writer(&mut writer)?;
        writer.flush().map_err(SVMError::IoError)
    }

    /// Load model from file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path).map_err(SVMError::IoError)?;
        let record = ModelRecord::from_reader(BufReader::new(file))?;
        SvmModel::try_from(record)
    }
}
