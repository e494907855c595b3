//! HTTP response building helpers
//!
//! One place for status codes and error bodies so every handler answers the
//! same way.

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{self, HeaderValue};
use hyper::{Response, StatusCode};
use serde::Serialize;
use tracing::error;

use crate::error::CmsError;

/// Result type alias for handlers
pub type HandlerResult = Result<Response<Full<Bytes>>, CmsError>;

fn with_body(status: StatusCode, content_type: &'static str, body: Bytes) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

/// Build a JSON response with the given status code
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_vec(body).unwrap_or_else(|_| b"{}".to_vec());
    with_body(status, "application/json", Bytes::from(json))
}

pub fn ok<T: Serialize>(body: &T) -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, body)
}

pub fn created<T: Serialize>(body: &T) -> Response<Full<Bytes>> {
    json_response(StatusCode::CREATED, body)
}

pub fn no_content() -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::new()));
    *response.status_mut() = StatusCode::NO_CONTENT;
    response
}

pub fn not_found(message: &str) -> Response<Full<Bytes>> {
    json_response(StatusCode::NOT_FOUND, &serde_json::json!({ "error": message }))
}

pub fn bad_request(message: &str) -> Response<Full<Bytes>> {
    json_response(StatusCode::BAD_REQUEST, &serde_json::json!({ "error": message }))
}

pub fn method_not_allowed() -> Response<Full<Bytes>> {
    json_response(
        StatusCode::METHOD_NOT_ALLOWED,
        &serde_json::json!({ "error": "Method not allowed" }),
    )
}

/// 303 to `location` with a message the listing page can show
pub fn redirect_with_message(location: &str, message: &str) -> Response<Full<Bytes>> {
    let mut response = json_response(StatusCode::SEE_OTHER, &serde_json::json!({ "message": message }));
    if let Ok(value) = HeaderValue::from_str(location) {
        response.headers_mut().insert(header::LOCATION, value);
    }
    response
}

/// Convert a CmsError to an appropriate HTTP response
pub fn error_response(error: CmsError) -> Response<Full<Bytes>> {
    match error {
        CmsError::NotFound(msg) => not_found(&format!("Not found: {}", msg)),
        CmsError::Validation(fields) => json_response(
            StatusCode::UNPROCESSABLE_ENTITY,
            &serde_json::json!({ "error": "Validation failed", "fields": fields }),
        ),
        CmsError::BadRequest(msg) => bad_request(&msg),
        CmsError::Json(e) => bad_request(&format!("Invalid JSON: {}", e)),
        CmsError::Auth(msg) => {
            let mut response =
                json_response(StatusCode::UNAUTHORIZED, &serde_json::json!({ "error": msg }));
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
            response
        }
        other => {
            // Details stay in the log
            error!(error = %other, "Request failed");
            json_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                &serde_json::json!({ "error": "Internal server error" }),
            )
        }
    }
}

/// Build a binary response with the given content type
pub fn binary_response(content_type: &'static str, body: Vec<u8>) -> Response<Full<Bytes>> {
    let mut response = with_body(StatusCode::OK, content_type, Bytes::from(body));
    response.headers_mut().insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("public, max-age=31536000, immutable"),
    );
    response
}

/// 204 if deleted, 404 if there was nothing to delete
pub fn from_delete_bool_result(result: Result<bool, CmsError>, not_found_msg: &str) -> Response<Full<Bytes>> {
    match result {
        Ok(true) => no_content(),
        Ok(false) => not_found(not_found_msg),
        Err(e) => error_response(e),
    }
}
