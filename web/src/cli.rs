use std::path::PathBuf;

/// Serves the comic cover generator page and its generation endpoint.
///
/// Every flag overrides the corresponding entry of the config file.
#[derive(Debug, clap::Parser)]
#[command(version)]
pub struct Cli {
    /// Replicate API token
    #[arg(long, env = "REPLICATE_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    #[arg(short = 'H', long, env = "COMIC_COVER_HOST")]
    pub host: Option<String>,

    #[arg(short, long, env = "COMIC_COVER_PORT")]
    pub port: Option<u16>,

    /// Model as owner/name or owner/name:version
    #[arg(short, long)]
    pub model: Option<String>,

    /// Word prepended to every prompt, activates the model's trained style
    #[arg(long)]
    pub trigger_word: Option<String>,

    /// Include error details in responses
    #[arg(long, env = "COMIC_COVER_DEV")]
    pub development: bool,

    /// Path of the RON config file, defaults to the user's config directory
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
