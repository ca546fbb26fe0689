use std::{fmt, str::FromStr};

use color_eyre::{Result, eyre::eyre};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::Display;

/// `owner/name` or `owner/name:version`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRef {
    pub owner: String,
    pub name: String,
    pub version: Option<String>,
}

impl FromStr for ModelRef {
    type Err = color_eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        let (path, version) = match s.split_once(':') {
            Some((path, version)) => (path, Some(version)),
            None => (s, None),
        };
        let (owner, name) = path
            .split_once('/')
            .ok_or_else(|| eyre!("Model reference must look like owner/name[:version], got {s:?}"))?;

        let valid = |part: &str| !part.is_empty() && !part.contains('/');
        if !valid(owner) || !valid(name) || version.is_some_and(|v| v.is_empty()) {
            return Err(eyre!(
                "Model reference must look like owner/name[:version], got {s:?}"
            ));
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
            version: version.map(str::to_string),
        })
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)?;
        if let Some(version) = &self.version {
            write!(f, ":{version}")?;
        }
        Ok(())
    }
}

impl ModelRef {
    /// Versioned models go through the generic endpoint, others through the
    /// model's own one
    pub fn predictions_path(&self) -> String {
        match self.version {
            Some(_) => "/predictions".to_string(),
            None => format!("/models/{}/{}/predictions", self.owner, self.name),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CreatePrediction {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub input: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PredictionStatus {
    Starting,
    Processing,
    Succeeded,
    Failed,
    Canceled,
    Aborted,
    #[serde(other)]
    Unknown,
}

impl PredictionStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::Canceled | Self::Aborted
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionUrls {
    pub get: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stream: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    pub id: String,
    pub status: PredictionStatus,
    pub urls: PredictionUrls,
    #[serde(default)]
    pub output: Value,
    #[serde(default)]
    pub error: Value,
    /// Fields we pass along without looking at, like `logs` or `metrics`
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Prediction {
    pub fn error_message(&self) -> String {
        match &self.error {
            Value::Null => "no error message".to_string(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// The whole prediction as a json object
    pub fn into_object(self) -> Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(eyre!("Prediction serialized to a non-object: {other}")),
        }
    }
}
