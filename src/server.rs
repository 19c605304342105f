// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Animation lookup HTTP service.
//!
//! Exposes a single `POST /text-to-sign` route that maps a word to its
//! `<word>_animation.json` file and returns the parsed contents.

use std::future::Future;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::post;
use axum::Router;
use serde::Serialize;
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::error::{PipelineError, Result};
use crate::transform::DEFAULT_SUFFIX;

/// Default animation folder.
pub const DEFAULT_ANIMATION_DIR: &str = "animations";

/// Default bind host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default bind port.
pub const DEFAULT_PORT: u16 = 5000;

/// Shared, read-only request state.
#[derive(Debug, Clone)]
pub struct AppState {
    animation_dir: PathBuf,
}

impl AppState {
    /// Serve animations from `animation_dir`.
    pub fn new(animation_dir: impl Into<PathBuf>) -> Self {
        Self {
            animation_dir: animation_dir.into(),
        }
    }

    /// Folder animations are read from.
    #[must_use]
    pub fn animation_dir(&self) -> &Path {
        &self.animation_dir
    }

    /// Animation file for an already normalized word.
    #[must_use]
    pub fn animation_path(&self, word: &str) -> PathBuf {
        self.animation_dir.join(format!("{word}{DEFAULT_SUFFIX}"))
    }
}

/// Server settings, read from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// `ANIMATION_DIR`
    pub animation_dir: PathBuf,
    /// `HOST`
    pub host: String,
    /// `PORT`
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            animation_dir: PathBuf::from(DEFAULT_ANIMATION_DIR),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    /// Read `ANIMATION_DIR`, `HOST` and `PORT`.
    ///
    /// # Errors
    ///
    /// Returns an error if `PORT` isn't a valid port number.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns an error if `PORT` isn't a valid port number.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| PipelineError::ConfigError(format!("Invalid PORT value: {raw}")))?,
            None => defaults.port,
        };

        Ok(Self {
            animation_dir: lookup("ANIMATION_DIR").map_or(defaults.animation_dir, PathBuf::from),
            host: lookup("HOST").unwrap_or(defaults.host),
            port,
        })
    }

    /// `host:port` to bind.
    #[must_use]
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Error body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error message
    pub error: String,
}

/// Success body.
#[derive(Debug, Serialize)]
pub struct AnimationResponse {
    /// Parsed animation file
    pub animation: Value,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, error: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse { error: error.into() }))
}

/// Build the application router.
///
/// Cross-origin requests are allowed from any origin so a browser frontend
/// served elsewhere can call the API.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/text-to-sign", post(text_to_sign))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve on `listener` until `shutdown` resolves.
///
/// # Errors
///
/// Returns an error if the server fails while accepting connections.
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(
            "Serving animations from {} on http://{addr}",
            state.animation_dir().display()
        );
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

/// Normalize request text into a word: trimmed and lowercased.
///
/// Returns `None` when nothing is left.
#[must_use]
pub fn normalize_text(text: &str) -> Option<String> {
    let word = text.trim().to_lowercase();
    (!word.is_empty()).then_some(word)
}

/// Whether `word` names a single file inside the animation folder.
#[must_use]
pub fn is_safe_word(word: &str) -> bool {
    !word.contains(['/', '\\', '\0']) && !word.contains("..")
}

/// `POST /text-to-sign`
///
/// Body: `{"text": "<word>"}`, parsed as JSON whatever the content type.
pub async fn text_to_sign(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> std::result::Result<Json<AnimationResponse>, ApiError> {
    let payload: Value = serde_json::from_slice(&body)
        .map_err(|_| api_error(StatusCode::BAD_REQUEST, "Invalid JSON or no body provided"))?;
    let fields = payload
        .as_object()
        .filter(|obj| !obj.is_empty())
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "Invalid JSON or no body provided"))?;

    let word = fields
        .get("text")
        .and_then(Value::as_str)
        .and_then(normalize_text)
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, "No text provided"))?;

    if !is_safe_word(&word) {
        tracing::warn!("Rejected text {word:?}");
        return Err(api_error(StatusCode::BAD_REQUEST, "Invalid text"));
    }

    let path = state.animation_path(&word);
    let raw = match tokio::fs::read(&path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!("No animation for {word:?}");
            return Err(api_error(
                StatusCode::NOT_FOUND,
                format!("No animation found for \"{word}\""),
            ));
        }
        Err(e) => {
            tracing::error!("Failed to read {}: {e}", path.display());
            return Err(api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to read animation for \"{word}\""),
            ));
        }
    };

    let animation: Value = serde_json::from_slice(&raw).map_err(|e| {
        tracing::error!("{}", PipelineError::json(&path, e));
        api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Animation for \"{word}\" is not valid JSON"),
        )
    })?;

    tracing::debug!("Served animation for {word:?}");
    Ok(Json(AnimationResponse { animation }))
}
