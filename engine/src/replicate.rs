use std::time::Duration;

use async_stream::try_stream;
use bytes::Bytes;
use color_eyre::{Result, eyre::WrapErr as _};
use log::{debug, info, warn};
use reqwest::{Client, RequestBuilder, header::HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::time::sleep;
use tokio_stream::Stream;

use crate::output::{ByteStream, PredictionOutput};

mod error;
pub mod replicate_api;

pub use error::ReplicateApiError;
pub use replicate_api::{ModelRef, Prediction, PredictionStatus};

use replicate_api::CreatePrediction;

pub const DEFAULT_API_BASE: &str = "https://api.replicate.com/v1";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Clone)]
pub struct Replicate {
    client: Client,
    api_token: String,
    api_base: String,
    model: ModelRef,
    poll_interval: Duration,
    file_output: bool,
}

impl Replicate {
    pub fn new(api_token: String, model: ModelRef) -> Self {
        Self {
            client: Client::new(),
            api_token,
            api_base: DEFAULT_API_BASE.to_string(),
            model,
            poll_interval: DEFAULT_POLL_INTERVAL,
            file_output: true,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// When enabled, URLs in the output of [`Replicate::run`] are handed out as
    /// byte streams of the files they point to.
    pub fn with_file_output(mut self, file_output: bool) -> Self {
        self.file_output = file_output;
        self
    }

    pub fn model(&self) -> &ModelRef {
        &self.model
    }

    /// Creates a prediction job. With `prefer_wait` the API holds the
    /// connection open until the job finished or its own wait limit passed.
    pub async fn create_prediction(&self, prompt: &str, prefer_wait: bool) -> Result<Prediction> {
        let body = CreatePrediction {
            version: self.model.version.clone(),
            input: json!({ "prompt": prompt }),
        };
        let url = format!("{}{}", self.api_base, self.model.predictions_path());
        debug!("Creating prediction at {url}: {body:?}");

        let mut request = self.client.post(url).json(&body);
        if prefer_wait {
            request = request.header("Prefer", HeaderValue::from_static("wait"));
        }

        let prediction: Prediction = self.send(request).await?;
        info!(
            "Prediction {} created, status: {}",
            prediction.id, prediction.status
        );
        Ok(prediction)
    }

    /// Polls the prediction until it reaches a terminal state
    pub async fn wait(&self, mut prediction: Prediction) -> Result<Prediction> {
        while !prediction.status.is_terminal() {
            sleep(self.poll_interval).await;
            let request = self.client.get(&prediction.urls.get);
            prediction = self.send(request).await?;
            debug!("Prediction {} status: {}", prediction.id, prediction.status);
        }
        Ok(prediction)
    }

    /// Creates a job and waits for it, yielding the whole prediction object.
    /// A failed or canceled prediction is handed out as well, it simply carries
    /// no output.
    pub async fn create_and_wait(&self, prompt: &str) -> Result<PredictionOutput> {
        let prediction = self.create_prediction(prompt, false).await?;
        let prediction = self.wait(prediction).await?;
        if prediction.status != PredictionStatus::Succeeded {
            warn!(
                "Prediction {} ended as {}: {}",
                prediction.id,
                prediction.status,
                prediction.error_message()
            );
        }
        Ok(PredictionOutput::Object(prediction.into_object()?))
    }

    /// Runs the model synchronously, yielding only the prediction's output
    pub async fn run(&self, prompt: &str) -> Result<PredictionOutput> {
        let prediction = self.create_prediction(prompt, true).await?;
        let prediction = self.wait(prediction).await?;
        let prediction = Self::ensure_succeeded(prediction)?;
        Ok(self.decode_output(prediction.output))
    }

    fn ensure_succeeded(prediction: Prediction) -> Result<Prediction> {
        if prediction.status == PredictionStatus::Succeeded {
            Ok(prediction)
        } else {
            Err(ReplicateApiError::PredictionFailed {
                message: prediction.error_message(),
                id: prediction.id,
                status: prediction.status,
            }
            .into())
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let resp = request.bearer_auth(&self.api_token).send().await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(ReplicateApiError::from_response(status.as_u16(), &body).into());
        }

        serde_json::from_str(&body).wrap_err_with(|| format!("Unexpected response body:\n{body}"))
    }

    fn decode_output(&self, output: Value) -> PredictionOutput {
        if !self.file_output {
            return PredictionOutput::from_json(output);
        }

        match output {
            Value::String(url) if is_http_url(&url) => PredictionOutput::Stream(self.file(url)),
            Value::Array(items) => PredictionOutput::Array(
                items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(url) if is_http_url(&url) => {
                            PredictionOutput::Stream(self.file(url))
                        }
                        other => PredictionOutput::from_json(other),
                    })
                    .collect(),
            ),
            other => PredictionOutput::from_json(other),
        }
    }

    /// The file behind `url`, only requested once the stream is polled
    fn file(&self, url: String) -> ByteStream {
        Box::pin(fetch_file(self.client.clone(), url))
    }
}

fn fetch_file(client: Client, url: String) -> impl Stream<Item = Result<Bytes>> + Send {
    try_stream! {
        debug!("Fetching output file {url}");
        let resp = client.get(&url).send().await?.error_for_status()?;
        for await chunk in resp.bytes_stream() {
            yield chunk?;
        }
    }
}

fn is_http_url(s: &str) -> bool {
    s.starts_with("https://") || s.starts_with("http://")
}
