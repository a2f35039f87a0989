//! # HTTP Server Module
//!
//! Espone l'upload handler via HTTP con `axum`.
//!
//! ## Endpoint:
//! - `POST /upload`: multipart, campo `modelFile` (max 50MB) → `201`
//!   `{message, model, optimized_path}`
//! - `GET /models/{id}`: stream del file servito per il modello, `404` se l'id
//!   non esiste
//!
//! ## Errori:
//! - `422`: campo mancante, file vuoto o troppo grande
//! - `413`: body oltre il limite del multipart
//! - `500`: errori di storage o persistence

use crate::error::{ErrorKind, OptimizeError};
use crate::upload::{UploadHandler, UploadedFile};
use axum::body::Body;
use axum::extract::multipart::MultipartError;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Multipart form field carrying the model
pub const UPLOAD_FIELD: &str = "modelFile";

/// Room for multipart boundaries and headers on top of the file limit
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(handler: Arc<UploadHandler>) -> Router {
    let body_limit = handler.max_upload_bytes() as usize + MULTIPART_OVERHEAD;

    Router::new()
        .route("/upload", post(upload))
        .route("/models/{id}", get(download))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(handler)
}

/// Serve until Ctrl-C
pub async fn serve(handler: Arc<UploadHandler>, listen: &str) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(handler))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;

    Ok(())
}

async fn upload(State(handler): State<Arc<UploadHandler>>, mut multipart: Multipart) -> Response {
    let mut file = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return multipart_error(e),
        };

        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let original_name = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "model.glb".to_string());
        let client_mime = field.content_type().map(str::to_string);

        match field.bytes().await {
            Ok(bytes) => {
                file = Some(UploadedFile {
                    original_name,
                    bytes: bytes.to_vec(),
                    client_mime,
                })
            }
            Err(e) => return multipart_error(e),
        }
    }

    let Some(file) = file else {
        return validation_error("The model file field is required.");
    };

    match handler.upload(file).await {
        Ok(outcome) => (
            StatusCode::CREATED,
            Json(json!({
                "message": "Model uploaded successfully",
                "model": outcome.model,
                "optimized_path": outcome.optimized_path,
            })),
        )
            .into_response(),
        Err(OptimizeError::Validation(message)) => validation_error(&message),
        Err(e) => {
            error!("Upload failed: {}", e);
            message_response(StatusCode::INTERNAL_SERVER_ERROR, "Upload failed")
        }
    }
}

async fn download(State(handler): State<Arc<UploadHandler>>, Path(id): Path<u64>) -> Response {
    let (record, path) = match handler.download(id).await {
        Ok(found) => found,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return message_response(StatusCode::NOT_FOUND, "Model not found");
        }
        Err(e) => {
            error!("Download of model {} failed: {}", id, e);
            return message_response(StatusCode::INTERNAL_SERVER_ERROR, "Download failed");
        }
    };

    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) => {
            error!("Failed to open {}: {}", path.display(), e);
            return message_response(StatusCode::INTERNAL_SERVER_ERROR, "Download failed");
        }
    };
    let length = file.metadata().await.map(|m| m.len()).ok();

    let content_type = HeaderValue::from_str(&record.mime_type)
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));

    let mut response = (
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, content_disposition(&record.name)),
        ],
        Body::from_stream(ReaderStream::new(file)),
    )
        .into_response();

    if let Some(length) = length {
        response.headers_mut().insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }
    response
}

fn content_disposition(file_name: &str) -> HeaderValue {
    let safe: String = file_name
        .chars()
        .filter(|c| c.is_ascii() && !c.is_ascii_control() && *c != '"' && *c != '\\')
        .collect();

    HeaderValue::from_str(&format!("attachment; filename=\"{}\"", safe))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

fn multipart_error(e: MultipartError) -> Response {
    let status = e.status();
    if status == StatusCode::PAYLOAD_TOO_LARGE {
        return message_response(status, "The model file is too large.");
    }
    message_response(status, &e.body_text())
}

fn validation_error(message: &str) -> Response {
    (
        StatusCode::UNPROCESSABLE_ENTITY,
        Json(json!({
            "message": message,
            "errors": { UPLOAD_FIELD: [message] },
        })),
    )
        .into_response()
}

fn message_response(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}
