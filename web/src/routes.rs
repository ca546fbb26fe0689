use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use engine::{GenerateError, Generator, ImageRef, Prompt};
use log::{error, info};
use serde::{Deserialize, Serialize};

const PAGE: &str = include_str!("page.html");

#[derive(Clone)]
pub struct AppState {
    generator: Option<Arc<Generator>>,
    development: bool,
}

impl AppState {
    pub fn new(generator: Option<Generator>, development: bool) -> Self {
        Self {
            generator: generator.map(Arc::new),
            development,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub prompt: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub image_url: ImageRef,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/generate", post(generate))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(PAGE)
}

async fn generate(
    State(state): State<AppState>,
    body: Bytes,
) -> Response {
    match try_generate(&state, &body).await {
        Ok(image) => {
            info!("Returning image reference: {}", image.summary());
            (StatusCode::OK, Json(GenerateResponse { image_url: image })).into_response()
        }
        Err(e) => {
            error!("Generation failed: {e}");
            ApiError {
                error: e,
                development: state.development,
            }
            .into_response()
        }
    }
}

/// The body is read as json whatever content type the client declared
async fn try_generate(state: &AppState, body: &[u8]) -> Result<ImageRef, GenerateError> {
    let request: GenerateRequest =
        serde_json::from_slice(body).map_err(|e| GenerateError::InvalidBody(e.to_string()))?;
    let prompt = Prompt::parse(request.prompt)?;
    let generator = state.generator.as_ref().ok_or(GenerateError::MissingToken)?;
    generator.generate(&prompt).await
}

/// A failed generation, rendered as json. Details are only exposed in
/// development mode.
struct ApiError {
    error: GenerateError,
    development: bool,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.error.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let body = ErrorResponse {
            error: self.error.to_string(),
            details: self.development.then(|| self.error.details()),
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use std::pin::Pin;

    use engine::{Predictor, PredictionOutput};
    use expect_test::expect;
    use serde_json::{Value, json};

    use super::*;

    fn png_bytes() -> Vec<u8> {
        let mut data = vec![0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];
        data.extend((0..2000).map(|i| (i % 13) as u8));
        data
    }

    /// Produces the same output json for every prompt, or fails
    struct Fixed(Option<Value>);

    impl Predictor for Fixed {
        fn predict<'a>(
            &'a self,
            _prompt: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<PredictionOutput, GenerateError>> + Send + 'a>>
        {
            let output = self.0.clone();
            Box::pin(async move {
                output
                    .map(PredictionOutput::from_json)
                    .ok_or_else(|| GenerateError::Provider {
                        message: "Prediction p1 failed: boom".into(),
                        details: "boom at line 1".into(),
                    })
            })
        }
    }

    struct Png;

    impl Predictor for Png {
        fn predict<'a>(
            &'a self,
            _prompt: &'a str,
        ) -> Pin<Box<dyn Future<Output = Result<PredictionOutput, GenerateError>> + Send + 'a>>
        {
            let stream = PredictionOutput::from_chunks([png_bytes().into()]);
            Box::pin(async { Ok(PredictionOutput::Array(vec![stream])) })
        }
    }

    async fn serve(state: AppState) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move { axum::serve(listener, router(state)).await.unwrap() });
        base
    }

    fn with_output(output: Option<Value>, development: bool) -> AppState {
        AppState::new(
            Some(Generator::new(Box::new(Fixed(output)), "dccomic")),
            development,
        )
    }

    async fn post_json(base: &str, body: Value) -> (u16, Value) {
        let resp = reqwest::Client::new()
            .post(format!("{base}/api/generate"))
            .json(&body)
            .send()
            .await
            .unwrap();
        (resp.status().as_u16(), resp.json().await.unwrap())
    }

    #[tokio::test]
    async fn serves_page() {
        let base = serve(with_output(None, false)).await;
        let page = reqwest::get(&base).await.unwrap().text().await.unwrap();
        assert!(page.contains("/api/generate"));
        assert!(page.contains("Generate Cover"));
    }

    #[tokio::test]
    async fn returns_image_url() {
        let base = serve(with_output(Some(json!({"output": ["https://x/y.png"]})), false)).await;
        let (status, body) = post_json(&base, json!({"prompt": "a hero"})).await;
        assert_eq!(status, 200);
        expect![[r#"{"imageUrl":"https://x/y.png"}"#]].assert_eq(&body.to_string());
    }

    #[tokio::test]
    async fn returns_data_uri_for_streams() {
        let state = AppState::new(Some(Generator::new(Box::new(Png), "dccomic")), false);
        let base = serve(state).await;
        let (status, body) = post_json(&base, json!({"prompt": "a hero"})).await;
        assert_eq!(status, 200);
        assert!(
            body["imageUrl"]
                .as_str()
                .unwrap()
                .starts_with("data:image/png;base64,iVBORw0KGgo")
        );
    }

    #[tokio::test]
    async fn missing_prompt_is_bad_request() {
        let base = serve(with_output(Some(json!("https://x/y.png")), false)).await;
        for body in [json!({}), json!({"prompt": ""}), json!({"prompt": null})] {
            let (status, body) = post_json(&base, body).await;
            assert_eq!(status, 400);
            expect![[r#"{"error":"Prompt is required"}"#]].assert_eq(&body.to_string());
        }
    }

    #[tokio::test]
    async fn missing_prompt_wins_over_missing_token() {
        let base = serve(AppState::new(None, false)).await;
        let (status, _) = post_json(&base, json!({})).await;
        assert_eq!(status, 400);

        let (status, body) = post_json(&base, json!({"prompt": "a hero"})).await;
        assert_eq!(status, 500);
        assert!(body["error"].as_str().unwrap().starts_with("API token not configured"));
    }

    #[tokio::test]
    async fn nothing_extracted_is_server_error() {
        let base = serve(with_output(Some(json!({})), false)).await;
        let (status, body) = post_json(&base, json!({"prompt": "a hero"})).await;
        assert_eq!(status, 500);
        expect![[r#"{"error":"Model did not return a valid image URL"}"#]]
            .assert_eq(&body.to_string());
    }

    #[tokio::test]
    async fn details_only_in_development() {
        let base = serve(with_output(None, false)).await;
        let (status, body) = post_json(&base, json!({"prompt": "a hero"})).await;
        assert_eq!(status, 500);
        expect![[r#"{"error":"Replicate API error: Prediction p1 failed: boom"}"#]]
            .assert_eq(&body.to_string());

        let base = serve(with_output(None, true)).await;
        let (_, body) = post_json(&base, json!({"prompt": "a hero"})).await;
        assert_eq!(body["details"], "boom at line 1");
    }

    async fn post_raw(base: &str, content_type: &str, body: &'static str) -> (u16, Value) {
        let resp = reqwest::Client::new()
            .post(format!("{base}/api/generate"))
            .header("content-type", content_type)
            .body(body)
            .send()
            .await
            .unwrap();
        (resp.status().as_u16(), resp.json().await.unwrap())
    }

    #[tokio::test]
    async fn malformed_body_is_server_error() {
        let base = serve(with_output(Some(json!("https://x/y.png")), false)).await;
        let (status, body) = post_raw(&base, "application/json", "{not json").await;
        assert_eq!(status, 500);
        assert!(body["error"].as_str().unwrap().starts_with("Invalid request body"));
    }

    #[tokio::test]
    async fn content_type_is_ignored() {
        let base = serve(with_output(Some(json!("https://x/y.png")), false)).await;

        let (status, body) = post_raw(&base, "text/plain;charset=UTF-8", "{}").await;
        assert_eq!(status, 400);
        expect![[r#"{"error":"Prompt is required"}"#]].assert_eq(&body.to_string());

        let (status, body) =
            post_raw(&base, "text/plain;charset=UTF-8", r#"{"prompt":"a hero"}"#).await;
        assert_eq!(status, 200);
        assert_eq!(body["imageUrl"], "https://x/y.png");

        let (status, _) = post_raw(
            &base,
            "application/x-www-form-urlencoded",
            r#"{"prompt":"a hero"}"#,
        )
        .await;
        assert_eq!(status, 200);
    }
}
