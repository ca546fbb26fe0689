use std::{fmt, pin::Pin};

use bytes::Bytes;
use color_eyre::Result;
use derive_more::From;
use serde_json::{Map, Value};
use strum::IntoStaticStr;
use tokio_stream::Stream;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// The output of a prediction, decoded once into one variant per shape the
/// provider is known to return.
#[derive(From, IntoStaticStr)]
pub enum PredictionOutput {
    /// File content, read chunk by chunk
    Stream(ByteStream),
    Text(String),
    Array(Vec<PredictionOutput>),
    Object(Map<String, Value>),
    /// null, numbers and booleans
    #[from(skip)]
    Other(Value),
}

impl PredictionOutput {
    pub fn from_json(value: Value) -> Self {
        match value {
            Value::String(s) => Self::Text(s),
            Value::Array(items) => Self::Array(items.into_iter().map(Self::from_json).collect()),
            Value::Object(map) => Self::Object(map),
            other => Self::Other(other),
        }
    }

    /// Wraps already available chunks into a stream
    pub fn from_chunks(chunks: impl IntoIterator<Item = Bytes>) -> Self {
        let chunks: Vec<_> = chunks.into_iter().map(Ok).collect();
        Self::Stream(Box::pin(tokio_stream::iter(chunks)))
    }

    pub fn shape(&self) -> &'static str {
        self.into()
    }

    /// Converts back into plain json, streams have no json representation
    pub fn into_json(self) -> Option<Value> {
        match self {
            Self::Stream(_) => None,
            Self::Text(s) => Some(Value::String(s)),
            Self::Array(items) => Some(Value::Array(
                items.into_iter().filter_map(Self::into_json).collect(),
            )),
            Self::Object(map) => Some(Value::Object(map)),
            Self::Other(value) => Some(value),
        }
    }
}

impl From<Value> for PredictionOutput {
    fn from(value: Value) -> Self {
        Self::from_json(value)
    }
}

impl fmt::Debug for PredictionOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stream(_) => f.write_str("Stream(..)"),
            Self::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Self::Array(items) => f.debug_tuple("Array").field(items).finish(),
            Self::Object(map) => f.debug_tuple("Object").field(map).finish(),
            Self::Other(value) => f.debug_tuple("Other").field(value).finish(),
        }
    }
}
