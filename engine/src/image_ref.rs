use std::fmt;

use serde::Serialize;

use crate::GenerateError;

/// A reference the browser can use directly as an image source: either a
/// remote `http(s)` URL or a self-contained `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn is_data_uri(&self) -> bool {
        self.0.starts_with("data:")
    }

    /// Short form for logging, data URIs can be megabytes long
    pub fn summary(&self) -> String {
        if self.is_data_uri() {
            let head: String = self.0.chars().take(40).collect();
            format!("{head}... ({} chars)", self.0.len())
        } else {
            self.0.clone()
        }
    }
}

impl TryFrom<String> for ImageRef {
    type Error = GenerateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value.is_empty() {
            return Err(GenerateError::NoImageUrl);
        }
        if !value.starts_with("http") && !value.starts_with("data:") {
            return Err(GenerateError::InvalidUrlFormat);
        }
        Ok(Self(value))
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
