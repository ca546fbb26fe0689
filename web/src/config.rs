use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use color_eyre::{
    Result,
    eyre::{WrapErr as _, eyre},
};
use engine::{
    DEFAULT_MODEL, DEFAULT_TRIGGER_WORD, Generator, PredictionClient, RetryPolicy,
    replicate::{DEFAULT_API_BASE, ModelRef, Replicate},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::cli::Cli;

const CONFIG_FILE_NAME: &str = "comic_cover.ron";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub api_token: Option<String>,
    pub model: String,
    pub trigger_word: String,
    pub api_base: String,
    pub file_output: bool,
    pub poll_interval_ms: u64,
    pub strategies: RetryPolicy,
    pub development: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 3000,
            api_token: None,
            model: DEFAULT_MODEL.into(),
            trigger_word: DEFAULT_TRIGGER_WORD.into(),
            api_base: DEFAULT_API_BASE.into(),
            file_output: true,
            poll_interval_ms: 500,
            strategies: RetryPolicy::default(),
            development: false,
        }
    }
}

impl Config {
    /// Command line flags and environment variables win over the file
    pub fn apply_cli(mut self, cli: &Cli) -> Self {
        if let Some(token) = &cli.api_token {
            self.api_token = Some(token.clone());
        }
        if let Some(host) = &cli.host {
            self.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.port = port;
        }
        if let Some(model) = &cli.model {
            self.model = model.clone();
        }
        if let Some(trigger_word) = &cli.trigger_word {
            self.trigger_word = trigger_word.clone();
        }
        self.development |= cli.development;
        self
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `None` when no API token is configured, generation requests are then
    /// answered with an error instead of refusing to start.
    pub fn build_generator(&self) -> Result<Option<Generator>> {
        let model: ModelRef = self.model.parse()?;
        let Some(token) = self.api_token.clone().filter(|t| !t.is_empty()) else {
            return Ok(None);
        };

        let replicate = Replicate::new(token, model)
            .with_api_base(&self.api_base)
            .with_poll_interval(Duration::from_millis(self.poll_interval_ms))
            .with_file_output(self.file_output);
        let client = PredictionClient::new(replicate, self.strategies.clone());
        Ok(Some(Generator::new(
            Box::new(client),
            self.trigger_word.clone(),
        )))
    }
}

pub fn config_path() -> Result<PathBuf> {
    Ok(dirs::config_local_dir()
        .ok_or(eyre!("Couldn't get config dir"))?
        .join(CONFIG_FILE_NAME))
}

pub fn load_ron_file<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let src = fs::read_to_string(path)?;
    Ok(ron::from_str(&src)?)
}

/// Reads the config file if there is one. An explicitly given path has to
/// exist.
pub fn load_config(explicit: Option<&Path>) -> Result<Option<Config>> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => config_path()?,
    };
    if explicit.is_none() && !path.exists() {
        Ok(None)
    } else {
        load_ron_file(&path)
            .map(Some)
            .wrap_err_with(|| format!("Couldn't load config from {}", path.display()))
    }
}
