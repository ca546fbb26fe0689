//! Turns whatever the model returned into a single [`ImageRef`].
//!
//! Dispatch happens on the [`PredictionOutput`] variant:
//!
//! - `Stream`: the bytes are drained. Binary content becomes a base64 `data:`
//!   URI, textual content is read as json or searched for a delivery URL.
//! - `Text`: used as is.
//! - `Array`: a leading stream is handled like above, with a wider set of URL
//!   patterns. Otherwise the first element is used.
//! - `Object`: well known fields are probed in a fixed order.
//!
//! The result is validated last, see [`ImageRef`].

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use color_eyre::Result;
use log::{debug, info};
use serde_json::{Map, Value};
use strum::Display;
use tokio_stream::StreamExt;

use crate::{
    GenerateError, ImageRef,
    output::{ByteStream, PredictionOutput},
};

mod url_scan;
pub use url_scan::{ALL_PATTERNS, DELIVERY_ONLY, UrlPattern};

/// Buffers up to this size are never treated as image data
const MIN_BINARY_LEN: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ImageFormat {
    #[strum(to_string = "image/jpeg")]
    Jpeg,
    #[strum(to_string = "image/png")]
    Png,
    #[strum(to_string = "image/gif")]
    Gif,
    #[strum(to_string = "image/webp")]
    Webp,
}

impl ImageFormat {
    /// Detects the format from the leading bytes, falls back to PNG
    pub fn sniff(data: &[u8]) -> Self {
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Self::Jpeg
        } else if data.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            Self::Png
        } else if data.starts_with(b"GIF") {
            Self::Gif
        } else if data.starts_with(b"RIFF") {
            Self::Webp
        } else {
            Self::Png
        }
    }
}

pub async fn normalize(output: PredictionOutput) -> Result<ImageRef, GenerateError> {
    info!("Processing {} output", output.shape());
    match extract(output).await? {
        Some(Value::String(url)) => ImageRef::try_from(url),
        other => {
            debug!("No usable reference, extracted: {other:?}");
            Err(GenerateError::NoImageUrl)
        }
    }
}

async fn extract(output: PredictionOutput) -> Result<Option<Value>, GenerateError> {
    match output {
        PredictionOutput::Stream(stream) => from_stream(stream, DELIVERY_ONLY).await,
        PredictionOutput::Text(text) => Ok(Some(Value::String(text))),
        PredictionOutput::Array(items) => {
            debug!("Array length: {}", items.len());
            match items.into_iter().next() {
                Some(PredictionOutput::Stream(stream)) => from_stream(stream, ALL_PATTERNS).await,
                Some(first) => Ok(first.into_json()),
                None => Ok(None),
            }
        }
        PredictionOutput::Object(map) => {
            debug!("Object keys: {:?}", map.keys().collect::<Vec<_>>());
            Ok(probe_object(&map))
        }
        PredictionOutput::Other(_) => Ok(None),
    }
}

async fn drain(mut stream: ByteStream) -> Result<Vec<u8>> {
    let mut buffer = vec![];
    while let Some(chunk) = stream.try_next().await? {
        buffer.extend_from_slice(&chunk);
    }
    Ok(buffer)
}

async fn from_stream(
    stream: ByteStream,
    patterns: &[UrlPattern],
) -> Result<Option<Value>, GenerateError> {
    let buffer = drain(stream)
        .await
        .map_err(|e| GenerateError::stream_processing(&e))?;

    debug!(
        "Combined buffer length: {}, first bytes: {:02x?}",
        buffer.len(),
        &buffer[..buffer.len().min(20)]
    );

    if is_binary(&buffer) {
        let format = ImageFormat::sniff(&buffer);
        info!("Detected {format} image data, {} bytes", buffer.len());
        return Ok(Some(Value::String(data_uri(format, &buffer))));
    }

    let decoded = String::from_utf8_lossy(&buffer);
    let text = decoded.strip_prefix('\u{feff}').unwrap_or(&*decoded);
    match serde_json::from_str::<Value>(text) {
        Ok(doc) if !doc.is_null() => Ok(probe_stream_document(&doc)),
        _ => {
            debug!("Stream is not json, searching for a URL");
            let found = url_scan::find_first(text, patterns);
            if let Some((pattern, url)) = found {
                debug!("Found URL with pattern {pattern:?}: {url}");
            }
            Ok(found.map(|(_, url)| Value::String(url.to_string())))
        }
    }
}

/// Image data is assumed once the buffer is large and contains control
/// characters other than tab, LF and CR.
pub fn is_binary(buffer: &[u8]) -> bool {
    buffer.len() > MIN_BINARY_LEN
        && buffer
            .iter()
            .any(|&b| b < 0x20 && !matches!(b, b'\t' | b'\n' | b'\r'))
}

pub fn data_uri(format: ImageFormat, data: &[u8]) -> String {
    format!("data:{format};base64,{}", BASE64.encode(data))
}

/// Same notion of emptiness the provider's own client applies
fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn first_element(value: Option<&Value>) -> Option<&Value> {
    value.and_then(Value::as_array).and_then(|a| a.first())
}

fn first_if_array(value: Option<&Value>) -> Option<&Value> {
    match value {
        Some(Value::Array(items)) => items.first(),
        other => other,
    }
}

/// Json read from a textual stream
fn probe_stream_document(doc: &Value) -> Option<Value> {
    [
        first_element(doc.get("output")),
        first_element(doc.get("data")),
        doc.get("url"),
        doc.get("image"),
        doc.as_array().and_then(|a| a.first()),
    ]
    .into_iter()
    .flatten()
    .find(|v| truthy(v))
    .cloned()
}

fn probe_object(map: &Map<String, Value>) -> Option<Value> {
    let prediction_output = map.get("prediction").and_then(|p| p.get("output"));
    let found = [
        first_if_array(map.get("output")),
        first_if_array(map.get("data")),
        map.get("url"),
        map.get("image"),
        map.get("result"),
        first_if_array(prediction_output),
    ]
    .into_iter()
    .flatten()
    .find(|v| truthy(v))?;

    match found {
        Value::Array(items) => items.first().cloned(),
        other => Some(other.clone()),
    }
}
