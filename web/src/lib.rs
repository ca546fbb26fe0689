use color_eyre::{Result, eyre::WrapErr as _};
use log::{info, warn};

use crate::{config::Config, routes::AppState};

pub mod cli;
pub mod config;
pub mod routes;

pub const APP_NAME: &str = "Comic Cover Generator";

pub async fn serve(config: Config) -> Result<()> {
    match config.api_token.as_deref().filter(|t| !t.is_empty()) {
        Some(token) => info!("API token configured ({} chars)", token.len()),
        None => warn!(
            "{}",
            indoc::indoc! {"
                No Replicate API token configured. The page is served, but every generation
                request will fail until REPLICATE_API_TOKEN or the api_token config entry is set.
            "}
            .trim_end()
        ),
    }
    info!("Using model {} with trigger word {:?}", config.model, config.trigger_word);

    let generator = config.build_generator()?;
    let state = AppState::new(generator, config.development);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .wrap_err_with(|| format!("Couldn't bind {addr}"))?;
    info!("{APP_NAME} listening on http://{addr}");
    axum::serve(listener, routes::router(state)).await?;
    Ok(())
}
