use std::pin::Pin;

use color_eyre::Result;
use log::{info, warn};
use nonempty::{NonEmpty, nonempty};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

use crate::{GenerateError, output::PredictionOutput, replicate::Replicate};

/// Something that turns a prompt into raw model output
pub trait Predictor {
    fn predict<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<PredictionOutput, GenerateError>> + Send + 'a>>;
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Display,
    EnumIter,
    clap::ValueEnum,
    Serialize,
    Deserialize,
)]
pub enum Strategy {
    /// Create a prediction job and poll it until it finishes
    CreateAndWait,
    /// Ask the API to answer synchronously, the model is run and waited for
    /// in a single call
    Run,
}

/// Ordered strategies, the first one to succeed wins
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RetryPolicy {
    strategies: NonEmpty<Strategy>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(nonempty![Strategy::CreateAndWait, Strategy::Run])
    }
}

impl RetryPolicy {
    pub fn new(strategies: NonEmpty<Strategy>) -> Self {
        Self { strategies }
    }

    pub fn strategies(&self) -> &NonEmpty<Strategy> {
        &self.strategies
    }

    /// Runs `attempt` for each strategy in order until one succeeds. When all
    /// of them fail, the error of the first (primary) strategy is reported.
    pub async fn execute<T, F, Fut>(&self, mut attempt: F) -> Result<T, GenerateError>
    where
        F: FnMut(Strategy) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let primary = self.strategies.head;
        let primary_err = match attempt(primary).await {
            Ok(value) => return Ok(value),
            Err(e) => e,
        };
        warn!("{primary} failed: {primary_err:?}");

        for &fallback in &self.strategies.tail {
            info!("Falling back to {fallback}");
            match attempt(fallback).await {
                Ok(value) => return Ok(value),
                Err(e) => warn!("{fallback} failed: {e:?}"),
            }
        }

        Err(GenerateError::provider(&primary_err))
    }
}

/// Calls Replicate according to a [`RetryPolicy`]
#[derive(Clone)]
pub struct PredictionClient {
    replicate: Replicate,
    policy: RetryPolicy,
}

impl PredictionClient {
    pub fn new(replicate: Replicate, policy: RetryPolicy) -> Self {
        Self { replicate, policy }
    }

    async fn attempt(&self, strategy: Strategy, prompt: &str) -> Result<PredictionOutput> {
        info!(
            "Running {} with strategy {strategy}",
            self.replicate.model()
        );
        match strategy {
            Strategy::CreateAndWait => self.replicate.create_and_wait(prompt).await,
            Strategy::Run => self.replicate.run(prompt).await,
        }
    }
}

impl Predictor for PredictionClient {
    fn predict<'a>(
        &'a self,
        prompt: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<PredictionOutput, GenerateError>> + Send + 'a>> {
        Box::pin(
            self.policy
                .execute(move |strategy| self.attempt(strategy, prompt)),
        )
    }
}
