//! Shared API types
//!
//! Response envelopes, the error type every handler returns, and the
//! pagination parameters accepted by listing endpoints.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};
use utoipa::ToSchema;
use validator::Validate;

use crate::data::DataError;
use crate::data::filters::FilterError;

pub const CODE_SUCCESS: &str = "GEN-SUCCESS";
pub const CODE_WRONG_ARGS: &str = "GEN-WRONG-ARGS";
pub const CODE_UNAUTHORIZED: &str = "GEN-UNAUTHORIZED";
pub const CODE_NOT_FOUND: &str = "GEN-NOT-FOUND";
pub const CODE_UNPROCESSABLE: &str = "GEN-UNPROCESSABLE";
pub const CODE_INTERNAL_ERROR: &str = "GEN-INTERNAL-ERROR";

/// Default page number
pub const DEFAULT_PAGE: u64 = 1;

pub fn default_page() -> u64 {
    DEFAULT_PAGE
}

/// Validation messages per field, in the order fields were checked
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors {
    entries: Vec<(String, Vec<String>)>,
}

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        let field = field.into();
        let message = message.into();
        match self.entries.iter_mut().find(|(f, _)| *f == field) {
            Some((_, messages)) => messages.push(message),
            None => self.entries.push((field, vec![message])),
        }
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.entries
            .iter()
            .find(|(f, _)| f == field)
            .map(|(_, m)| m.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The message shown as the response's top-level `message`
    pub fn first_message(&self) -> Option<&str> {
        self.entries
            .first()
            .and_then(|(_, messages)| messages.first())
            .map(String::as_str)
    }
}

impl Serialize for FieldErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (field, messages) in &self.entries {
            map.serialize_entry(field, messages)?;
        }
        map.end()
    }
}

/// Standard API error response
#[derive(Debug)]
pub enum ApiError {
    WrongArgs {
        message: String,
    },
    Unauthorized {
        message: String,
    },
    NotFound {
        message: String,
    },
    Unprocessable {
        message: String,
        errors: FieldErrors,
    },
    Internal {
        message: String,
    },
}

impl ApiError {
    pub fn wrong_args(message: impl Into<String>) -> Self {
        Self::WrongArgs {
            message: message.into(),
        }
    }

    pub fn unauthorized() -> Self {
        Self::Unauthorized {
            message: "Unauthorized".to_string(),
        }
    }

    pub fn not_found() -> Self {
        Self::NotFound {
            message: "Resource Not Found".to_string(),
        }
    }

    /// 422 whose message is the first field message
    pub fn validation(errors: FieldErrors) -> Self {
        let message = errors
            .first_message()
            .unwrap_or("The given data was invalid")
            .to_string();
        Self::Unprocessable { message, errors }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn from_data(e: DataError) -> Self {
        tracing::error!(error = %e, "Data error");
        Self::Internal {
            message: "Database operation failed".to_string(),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::WrongArgs { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Unprocessable { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<FilterError> for ApiError {
    fn from(e: FilterError) -> Self {
        let mut errors = FieldErrors::new();
        match &e {
            FilterError::InvalidDateFormat { field, .. } => errors.add(field, e.to_string()),
        }
        Self::validation(errors)
    }
}

/// Body of an error envelope
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub code: String,
    pub http_code: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub errors: Option<FieldErrors>,
}

/// `{"error": {...}}`
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (code, message, errors) = match self {
            Self::WrongArgs { message } => (CODE_WRONG_ARGS, message, None),
            Self::Unauthorized { message } => (CODE_UNAUTHORIZED, message, None),
            Self::NotFound { message } => (CODE_NOT_FOUND, message, None),
            Self::Unprocessable { message, errors } => (CODE_UNPROCESSABLE, message, Some(errors)),
            Self::Internal { message } => (CODE_INTERNAL_ERROR, message, None),
        };
        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                http_code: status.as_u16(),
                message,
                errors,
            },
        };
        (status, Json(body)).into_response()
    }
}

/// Body of a success envelope
#[derive(Debug, Serialize, ToSchema)]
pub struct StatusBody {
    pub code: String,
    pub http_code: u16,
    pub message: String,
}

/// `{"success": {...}}`
#[derive(Debug, Serialize, ToSchema)]
pub struct SuccessResponse {
    pub success: StatusBody,
}

impl SuccessResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: StatusBody {
                code: CODE_SUCCESS.to_string(),
                http_code: StatusCode::OK.as_u16(),
                message: message.into(),
            },
        }
    }
}

impl IntoResponse for SuccessResponse {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// `{"data": {...}}`
#[derive(Debug, Serialize, ToSchema)]
pub struct ItemResponse {
    #[schema(value_type = Object)]
    pub data: Value,
}

/// Pagination metadata in collection responses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Pagination {
    pub total: u64,
    pub count: u64,
    pub per_page: u64,
    pub current_page: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(total: u64, count: u64, per_page: u64, current_page: u64) -> Self {
        Self {
            total,
            count,
            per_page,
            current_page,
            total_pages: total.div_ceil(per_page.max(1)).max(1),
        }
    }
}

/// Pagination plus entries contributed by the resource policy
#[derive(Debug, Serialize)]
pub struct CollectionMeta {
    pub pagination: Pagination,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// `{"data": [...], "meta": {"pagination": {...}}}`
#[derive(Debug, Serialize, ToSchema)]
pub struct CollectionResponse {
    #[schema(value_type = Vec<Object>)]
    pub data: Vec<Value>,
    #[schema(value_type = Object)]
    pub meta: CollectionMeta,
}

/// Paging parameters of a listing request
#[derive(Debug, Deserialize, Validate)]
pub struct PageRequest {
    #[serde(default = "default_page")]
    #[validate(range(min = 1, message = "Page must be >= 1"))]
    pub page: u64,

    /// Falls back to the resource's page size
    #[validate(range(min = 1, max = 500, message = "per_page must be between 1 and 500"))]
    pub per_page: Option<u64>,
}
