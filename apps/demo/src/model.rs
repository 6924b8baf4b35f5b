//! Diabetes regression training.
//!
//! Fits an ordinary least squares model on the bundled diabetes dataset and
//! captures the fitted parameters in a library-neutral form for archiving.

use anyhow::{Result, anyhow};
use linfa::prelude::*;
use linfa_linear::LinearRegression;
use mdock::prelude::{ArchiveError, ModelArtifact, ModelSchema, ModelType};
use serde::Serialize;
use tracing::info;

/// Column names of the diabetes dataset, in training order.
const FEATURES: [&str; 10] = [
    "age",
    "sex",
    "body mass index",
    "blood pressure",
    "t-cells",
    "low-density lipoproteins",
    "high-density lipoproteins",
    "thyroid stimulating hormone",
    "lamotrigine",
    "blood sugar level",
];

const LIBRARY: &str = "linfa-linear";
const LIBRARY_VERSION: &str = "0.8.0";

/// Fitted parameters of the regression, decoupled from the training stack so
/// any consumer of the archive can deserialize them.
#[derive(Debug, Serialize)]
pub struct DiabetesModel {
    features: Vec<String>,
    weights: Vec<f64>,
    intercept: f64,
    r2: f64,
}

/// Fits an ordinary least squares regression on the diabetes dataset and
/// reports the in-sample r² score.
pub fn train() -> Result<DiabetesModel> {
    let dataset = linfa_datasets::diabetes();
    info!(
        samples = dataset.nsamples(),
        features = dataset.nfeatures(),
        "Training a linear regression on the diabetes dataset"
    );

    let fitted = LinearRegression::default()
        .fit(&dataset)
        .map_err(|e| anyhow!("Linear regression training failed: {e}"))?;

    let r2 = fitted
        .predict(&dataset)
        .r2(&dataset)
        .map_err(|e| anyhow!("Model evaluation failed: {e}"))?;
    info!(r2, "Training complete");

    Ok(DiabetesModel {
        features: FEATURES.iter().map(|&name| name.to_owned()).collect(),
        weights: fitted.params().to_vec(),
        intercept: fitted.intercept(),
        r2,
    })
}

impl ModelArtifact for DiabetesModel {
    fn model_type(&self) -> ModelType {
        ModelType::Linear
    }

    fn library(&self) -> &str {
        LIBRARY
    }

    fn library_version(&self) -> &str {
        LIBRARY_VERSION
    }

    fn serialize(&self) -> Result<Vec<u8>, ArchiveError> {
        serde_json::to_vec_pretty(self).map_err(|err| ArchiveError::Serialization {
            message: "Model state capture failed".into(),
            context: Some(err.to_string().into()),
        })
    }

    fn schema(&self) -> Option<ModelSchema> {
        Some(ModelSchema {
            inputs: self.features.clone(),
            output: "disease progression".to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_training_fits_every_feature() {
        let model = train().unwrap();

        assert_eq!(model.weights.len(), FEATURES.len());
        assert!(model.r2 > 0.4, "expected a meaningful fit, got r² = {}", model.r2);
        assert!(model.intercept > 0.0);
    }

    #[test]
    fn test_artifact_state_is_self_describing() {
        let model = train().unwrap();

        let schema = model.schema().unwrap();
        assert_eq!(schema.inputs.len(), model.weights.len());
        assert_eq!(schema.output, "disease progression");

        let bytes = ModelArtifact::serialize(&model).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["weights"].as_array().unwrap().len(), FEATURES.len());
        assert_eq!(value["features"][2], "body mass index");
    }
}
