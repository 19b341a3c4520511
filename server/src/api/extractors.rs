//! Request extractors for resource routes
//!
//! Every rejection renders the standard `GEN-WRONG-ARGS` error envelope.

use std::convert::Infallible;
use std::ops::Deref;

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Path, Query, Request};
use axum::http::request::Parts;
use axum::http::{HeaderMap, Method, Uri, header};
use axum::response::{IntoResponse, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use validator::Validate;

use super::types::ApiError;
use crate::data::Record;
use crate::data::filters::QueryParameters;

/// Maximum length for record keys in paths
pub const MAX_ID_LENGTH: usize = 256;

/// Validate generic ID length
pub fn is_valid_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= MAX_ID_LENGTH
}

/// Validated record key from the `/{id}` path segment
#[derive(Debug)]
pub struct ResourceId(pub String);

impl<S> FromRequestParts<S> for ResourceId
where
    S: Send + Sync,
{
    type Rejection = ValidationRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(ValidationRejection::Path)?;

        if !is_valid_id(&id) {
            return Err(ValidationRejection::InvalidId);
        }

        Ok(Self(id))
    }
}

/// Decoded query string with array and repeated-key handling
#[derive(Debug)]
pub struct QueryParams(pub QueryParameters);

impl<S> FromRequestParts<S> for QueryParams
where
    S: Send + Sync,
{
    type Rejection = ValidationRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        QueryParameters::from_uri(&parts.uri)
            .map(Self)
            .map_err(ValidationRejection::Query)
    }
}

/// JSON body that must be an object
#[derive(Debug)]
pub struct JsonObject(pub Record);

impl<S> FromRequest<S> for JsonObject
where
    S: Send + Sync,
{
    type Rejection = ValidationRejection;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(ValidationRejection::Json)?;
        match value {
            Value::Object(map) => Ok(Self(map)),
            _ => Err(ValidationRejection::NotAnObject),
        }
    }
}

/// Request metadata handed to policies
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

impl RequestContext {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Token from `Authorization: Bearer <token>`
    pub fn bearer_token(&self) -> Option<&str> {
        let value = self.header(header::AUTHORIZATION.as_str())?;
        let (scheme, token) = value.split_once(' ')?;
        if !scheme.eq_ignore_ascii_case("bearer") {
            return None;
        }
        let token = token.trim();
        (!token.is_empty()).then_some(token)
    }
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
        })
    }
}

/// Validation rejection rendered as a 400 envelope
#[derive(Debug)]
pub enum ValidationRejection {
    /// Failed to parse path parameters
    Path(PathRejection),
    /// Record key empty or too long
    InvalidId,
    /// Failed to parse query string
    Query(QueryRejection),
    /// Failed to parse JSON body
    Json(JsonRejection),
    /// JSON body is not an object
    NotAnObject,
    /// Validation constraints not satisfied
    Validation(validator::ValidationErrors),
}

impl ValidationRejection {
    fn message(&self) -> String {
        match self {
            Self::Path(rejection) => rejection.body_text(),
            Self::InvalidId => format!("Invalid id: must be 1-{MAX_ID_LENGTH} characters"),
            Self::Query(rejection) => rejection.body_text(),
            Self::Json(rejection) => rejection.body_text(),
            Self::NotAnObject => "Request body must be a JSON object".to_string(),
            Self::Validation(errors) => format_validation_errors(errors),
        }
    }
}

impl From<ValidationRejection> for ApiError {
    fn from(rejection: ValidationRejection) -> Self {
        let message = rejection.message();
        tracing::debug!(%message, "Rejected request");
        ApiError::wrong_args(message)
    }
}

impl IntoResponse for ValidationRejection {
    fn into_response(self) -> Response {
        ApiError::from(self).into_response()
    }
}

fn format_validation_errors(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("{}: validation failed", field))
            })
        })
        .collect::<Vec<_>>()
        .join("; ")
}

/// Query extractor with automatic validation.
///
/// Deserializes query parameters and validates them using the `validator` crate.
/// Unknown keys are ignored, so filter parameters pass through untouched.
#[derive(Debug)]
pub struct ValidatedQuery<T>(pub T);

impl<T> Deref for ValidatedQuery<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S, T> FromRequestParts<S> for ValidatedQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = ValidationRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(ValidationRejection::Query)?;
        value.validate().map_err(ValidationRejection::Validation)?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::PageRequest;
    use axum::body::Body;
    use axum::http::StatusCode;

    fn parts_for(uri: &str) -> Parts {
        let (parts, _) = Request::builder()
            .uri(uri)
            .header("authorization", "Bearer secret-key")
            .header("x-api-key", "other-key")
            .body(Body::empty())
            .unwrap()
            .into_parts();
        parts
    }

    #[test]
    fn test_is_valid_id() {
        assert!(is_valid_id("42"));
        assert!(is_valid_id(&"a".repeat(MAX_ID_LENGTH)));
        assert!(!is_valid_id(""));
        assert!(!is_valid_id(&"a".repeat(MAX_ID_LENGTH + 1)));
    }

    #[tokio::test]
    async fn test_request_context_tokens() {
        let mut parts = parts_for("/api/v1/users");
        let ctx = RequestContext::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(ctx.bearer_token(), Some("secret-key"));
        assert_eq!(ctx.header("x-api-key"), Some("other-key"));
        assert_eq!(ctx.header("x-missing"), None);
    }

    #[tokio::test]
    async fn test_bearer_token_requires_scheme() {
        let (mut parts, _) = Request::builder()
            .uri("/")
            .header("authorization", "Basic abc")
            .body(Body::empty())
            .unwrap()
            .into_parts();
        let ctx = RequestContext::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(ctx.bearer_token(), None);
    }

    #[tokio::test]
    async fn test_query_params_decode_arrays() {
        let mut parts = parts_for("/users?status_in[]=a&status_in[]=b&name=jo");
        let QueryParams(params) = QueryParams::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("name").and_then(|v| v.as_single()), Some("jo"));
    }

    #[tokio::test]
    async fn test_validated_query_ignores_filters() {
        let mut parts = parts_for("/users?page=2&per_page=10&name_contains=jo");
        let query = ValidatedQuery::<PageRequest>::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(query.page, 2);
        assert_eq!(query.per_page, Some(10));
    }

    #[tokio::test]
    async fn test_validated_query_rejects_out_of_range() {
        let mut parts = parts_for("/users?per_page=1000");
        let rejection = ValidatedQuery::<PageRequest>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert!(matches!(rejection, ValidationRejection::Validation(_)));
        assert_eq!(rejection.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_json_object_rejects_arrays() {
        let req = Request::builder()
            .method("POST")
            .uri("/users")
            .header("content-type", "application/json")
            .body(Body::from("[1, 2]"))
            .unwrap();
        let rejection = JsonObject::from_request(req, &()).await.unwrap_err();
        assert!(matches!(rejection, ValidationRejection::NotAnObject));
    }

    #[tokio::test]
    async fn test_json_object_accepts_objects() {
        let req = Request::builder()
            .method("POST")
            .uri("/users")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"name": "Ada"}"#))
            .unwrap();
        let JsonObject(record) = JsonObject::from_request(req, &()).await.unwrap();
        assert_eq!(record["name"], "Ada");
    }
}
