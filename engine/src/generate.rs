use log::{debug, info};

use crate::{GenerateError, ImageRef, PredictorBox, normalize::normalize};

/// A non-empty user prompt, without the trigger word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt(String);

impl Prompt {
    pub fn parse(raw: Option<String>) -> Result<Self, GenerateError> {
        match raw {
            Some(prompt) if !prompt.is_empty() => Ok(Self(prompt)),
            _ => Err(GenerateError::MissingPrompt),
        }
    }

    /// The text actually sent to the model
    pub fn with_trigger_word(&self, trigger_word: &str) -> String {
        if trigger_word.is_empty() {
            self.0.clone()
        } else {
            format!("{trigger_word} {}", self.0)
        }
    }
}

pub struct Generator {
    predictor: PredictorBox,
    trigger_word: String,
}

impl Generator {
    pub fn new(predictor: PredictorBox, trigger_word: impl Into<String>) -> Self {
        Self {
            predictor,
            trigger_word: trigger_word.into(),
        }
    }

    pub async fn generate(&self, prompt: &Prompt) -> Result<ImageRef, GenerateError> {
        let prompt = prompt.with_trigger_word(&self.trigger_word);
        info!("Starting image generation, prompt: {prompt}");

        let output = self.predictor.predict(&prompt).await?;
        debug!("Raw output: {output:?}");

        let image = normalize(output).await?;
        info!("Extracted image reference: {}", image.summary());
        Ok(image)
    }
}
