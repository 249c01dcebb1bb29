use std::borrow::Cow;

use axum::body::Body;
use axum::extract::{Path, RawQuery, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use press_engine::{
    ConversionRequest, ConvertError, ConvertedDocument, DocumentFormat, ValidationError,
    FALLBACK_FILENAME,
};
use press_logging::{press_error, press_warn};
use serde::Serialize;
use url::Url;

use crate::app::AppState;

pub async fn preflight() -> StatusCode {
    StatusCode::NO_CONTENT
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    formats: Vec<DocumentFormat>,
    default_format: DocumentFormat,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        formats: state.renderers.formats(),
        default_format: state.default_format,
    })
}

pub async fn convert_default(
    State(state): State<AppState>,
    RawQuery(query): RawQuery,
) -> Response {
    let format = state.default_format;
    convert(&state, format, query.as_deref()).await
}

pub async fn convert_format(
    State(state): State<AppState>,
    Path(format): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    match format.parse::<DocumentFormat>() {
        Ok(format) => convert(&state, format, query.as_deref()).await,
        Err(_) => text_response(StatusCode::NOT_FOUND, format!("Unknown format: {format}")),
    }
}

async fn convert(state: &AppState, format: DocumentFormat, query: Option<&str>) -> Response {
    let Some(renderer) = state.renderers.get(format) else {
        return text_response(
            StatusCode::NOT_FOUND,
            format!("Format not enabled: {format}"),
        );
    };

    let request = match source_url_param(query).and_then(|raw| ConversionRequest::parse(&raw)) {
        Ok(request) => request,
        Err(err) => {
            press_warn!("Rejected request stage=validate query={:?}: {}", query, err);
            return text_response(StatusCode::BAD_REQUEST, err.to_string());
        }
    };

    let limits = &state.limits;
    let admitted = async {
        let _permit = limits.acquire().await?;
        Some(state.pipeline.convert(&request, renderer.as_ref()).await)
    };
    match tokio::time::timeout(limits.timeout(), admitted).await {
        Ok(Some(Ok(converted))) => document_response(converted),
        Ok(Some(Err(err))) => error_response(&err),
        Ok(None) => text_response(
            StatusCode::SERVICE_UNAVAILABLE,
            "Server is shutting down".to_string(),
        ),
        Err(_) => {
            press_error!(
                "Conversion timed out format={} url={} after {:?}",
                format,
                request.source_url(),
                limits.timeout()
            );
            text_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!(
                    "Error processing URL: request timed out after {:?}",
                    limits.timeout()
                ),
            )
        }
    }
}

/// Decoded `url` query parameter.
///
/// Clients that encode the target twice get it decoded a second time.
fn source_url_param(query: Option<&str>) -> Result<String, ValidationError> {
    let raw = query
        .unwrap_or_default()
        .split('&')
        .find_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (key == "url").then_some(value)
        })
        .filter(|value| !value.is_empty())
        .ok_or(ValidationError::MissingUrl)?;

    let once = decode_component(raw)?;
    if Url::parse(once.trim()).is_err() && once.contains('%') {
        if let Ok(twice) = decode_component(&once) {
            if Url::parse(twice.trim()).is_ok() {
                return Ok(twice);
            }
        }
    }
    Ok(once)
}

fn decode_component(value: &str) -> Result<String, ValidationError> {
    let spaced = value.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(Cow::into_owned)
        .map_err(|err| ValidationError::Undecodable(err.to_string()))
}

fn document_response(converted: ConvertedDocument) -> Response {
    let document = converted.document;
    let mut response = Response::new(Body::from(document.bytes.clone()));
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(document.mime_type()));
    headers.insert(CONTENT_DISPOSITION, content_disposition(&converted.filename));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(document.bytes.len()));
    response
}

/// `attachment; filename="<name>"`, plus an RFC 5987 `filename*` for non-ASCII names.
fn content_disposition(filename: &str) -> HeaderValue {
    let value = if filename.is_ascii() {
        format!("attachment; filename={}", quoted(filename))
    } else {
        format!(
            "attachment; filename={}; filename*=UTF-8''{}",
            quoted(&ascii_fallback(filename)),
            urlencoding::encode(filename)
        )
    };
    HeaderValue::from_str(&value)
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

/// RFC 6266 quoted-string; sanitized names keep `,` `;` and `=`, which a bare token cannot carry.
fn quoted(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for c in value.chars() {
        if matches!(c, '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    out
}

fn ascii_fallback(filename: &str) -> String {
    let (stem, extension) = filename.rsplit_once('.').unwrap_or((filename, ""));
    let ascii: String = stem.chars().filter(char::is_ascii).collect();
    let ascii = ascii.trim_matches('_');
    let stem = if ascii.is_empty() { FALLBACK_FILENAME } else { ascii };
    if extension.is_empty() {
        stem.to_string()
    } else {
        format!("{stem}.{extension}")
    }
}

fn error_response(err: &ConvertError) -> Response {
    let status = if err.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    text_response(status, format!("Error processing URL: {err}"))
}

fn text_response(status: StatusCode, message: String) -> Response {
    (
        status,
        [(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"))],
        message,
    )
        .into_response()
}
