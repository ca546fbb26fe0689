use clap::Parser;
use color_eyre::Result;
use comic_cover::{cli::Cli, config::load_config, serve};

#[tokio::main]
async fn main() -> Result<()> {
    pretty_env_logger::init();
    color_eyre::install()?;
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?
        .unwrap_or_default()
        .apply_cli(&cli);
    serve(config).await
}
