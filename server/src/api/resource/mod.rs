//! Generic resource endpoints
//!
//! Every configured resource is mounted at `/api/v1/{name}` with index, show,
//! store, update and delete routes over one table.

pub mod policy;
pub mod rules;
pub mod transform;

pub use policy::{API_KEY_HEADER, Action, AllowAll, ApiKeyPolicy, ResourcePolicy};
pub use rules::{Rule, RuleParseError, RuleSet};
pub use transform::{RecordTransformer, Transformer};

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};

use crate::api::extractors::{
    JsonObject, QueryParams, RequestContext, ResourceId, ValidatedQuery, ValidationRejection,
};
use crate::api::types::{
    ApiError, CollectionMeta, CollectionResponse, ItemResponse, PageRequest, Pagination,
    SuccessResponse,
};
use crate::core::config::{AuthConfig, ResourceConfig};
use crate::core::constants::{DEFAULT_PER_PAGE, PAGINATION_PARAMS};
use crate::data::filters::{
    FilterConfig, FilterError, QueryParameters, SqlQueryBuilder, Translation, translate,
};
use crate::data::{Page, Record, ResourceStore, TableRef};

/// A table exposed over HTTP
pub struct Resource {
    pub name: String,
    pub table: TableRef,
    pub filters: FilterConfig,
    /// Writable columns; empty allows every column but the primary key
    pub allowed_attributes: Vec<String>,
    pub per_page: u64,
    pub policy: Arc<dyn ResourcePolicy>,
    pub transformer: Arc<dyn Transformer>,
}

impl Resource {
    pub fn new(name: impl Into<String>, table: TableRef, filters: FilterConfig) -> Self {
        Self {
            name: name.into(),
            table,
            filters,
            allowed_attributes: Vec::new(),
            per_page: DEFAULT_PER_PAGE,
            policy: Arc::new(AllowAll),
            transformer: Arc::new(RecordTransformer::default()),
        }
    }

    /// Build a resource guarded by the shared API key
    pub fn from_config(config: &ResourceConfig, auth: &AuthConfig) -> Result<Self, RuleParseError> {
        let policy = ApiKeyPolicy::new(auth.api_key.clone(), auth.public_actions.clone())
            .with_rules(
                RuleSet::from_config(&config.create_rules)?,
                RuleSet::from_config(&config.update_rules)?,
            );

        let mut resource = Self::new(
            config.name.clone(),
            TableRef::new(config.table.clone(), config.primary_key.clone()),
            FilterConfig::new(config.allowed_fields.clone(), config.date_fields.clone()),
        )
        .with_policy(Arc::new(policy))
        .with_transformer(Arc::new(RecordTransformer::new(config.hidden.clone())));
        resource.allowed_attributes = config.allowed_attributes.clone();
        resource.per_page = config.per_page;
        Ok(resource)
    }

    pub fn with_policy(mut self, policy: Arc<dyn ResourcePolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_transformer(mut self, transformer: Arc<dyn Transformer>) -> Self {
        self.transformer = transformer;
        self
    }

    /// Translate listing parameters, ignoring the paging keys
    pub fn translate(&self, params: &QueryParameters) -> Result<Translation, FilterError> {
        translate(&params.without(PAGINATION_PARAMS), &self.filters)
    }

    /// Keep writable columns only
    fn fillable(&self, mut record: Record) -> Record {
        if !self.allowed_attributes.is_empty() {
            record.retain(|key, _| self.allowed_attributes.contains(key));
        }
        record.remove(&self.table.primary_key);
        record
    }

    fn authorize(&self, action: Action, request: &RequestContext) -> Result<(), ApiError> {
        if self.policy.authorize(action, request) {
            Ok(())
        } else {
            tracing::debug!(resource = %self.name, ?action, "Unauthorized");
            Err(ApiError::unauthorized())
        }
    }

    fn validate(&self, action: Action, record: &Record) -> Result<(), ApiError> {
        let errors = self.policy.validation_rules(action).validate(record);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::validation(errors))
        }
    }

    fn item(&self, record: Record) -> ItemResponse {
        ItemResponse {
            data: self.transformer.transform(record),
        }
    }
}

/// Shared state for one resource's endpoints
#[derive(Clone)]
pub struct ResourceApiState {
    pub resource: Arc<Resource>,
    pub store: Arc<dyn ResourceStore>,
}

/// Build the routes of one resource
pub fn routes(resource: Arc<Resource>, store: Arc<dyn ResourceStore>) -> Router<()> {
    let state = ResourceApiState { resource, store };

    Router::new()
        .route("/", get(index).post(store_record))
        .route(
            "/{id}",
            get(show)
                .put(update_record)
                .patch(update_record)
                .delete(delete_record),
        )
        .with_state(state)
}

/// List records matching the query string filters
#[utoipa::path(
    get,
    path = "/api/v1/{resource}",
    tag = "resources",
    params(
        ("resource" = String, Path, description = "Configured resource name"),
        ("page" = Option<u64>, Query, description = "Page number (default 1)"),
        ("per_page" = Option<u64>, Query, description = "Items per page (1-500)"),
        ("sort" = Option<String>, Query, description = "Sort as `field[,asc|desc]`"),
        ("limit" = Option<u64>, Query, description = "Cap on matching rows")
    ),
    responses(
        (status = 200, description = "Matching records", body = CollectionResponse),
        (status = 400, description = "Invalid paging parameters", body = crate::api::types::ErrorResponse),
        (status = 401, description = "Missing or invalid API key", body = crate::api::types::ErrorResponse),
        (status = 422, description = "Invalid date filter", body = crate::api::types::ErrorResponse)
    )
)]
pub async fn index(
    State(state): State<ResourceApiState>,
    ctx: RequestContext,
    paging: Result<ValidatedQuery<PageRequest>, ValidationRejection>,
    params: Result<QueryParams, ValidationRejection>,
) -> Result<Json<CollectionResponse>, ApiError> {
    let resource = &state.resource;
    resource.authorize(Action::ViewAny, &ctx)?;

    let ValidatedQuery(paging) = paging?;
    let QueryParams(params) = params?;
    let translation = resource.translate(&params)?;

    let mut scope = SqlQueryBuilder::new();
    for clause in resource.policy.index_scope(&ctx) {
        clause.apply(&mut scope);
    }
    let mut filter = SqlQueryBuilder::new();
    filter.and_group(scope);
    filter.and_group(SqlQueryBuilder::from_translation(&translation));

    let page = Page {
        number: paging.page,
        per_page: paging.per_page.unwrap_or(resource.per_page),
    };
    let (records, total) = state
        .store
        .list(&resource.table, &filter, page)
        .await
        .map_err(ApiError::from_data)?;

    let data: Vec<_> = records
        .into_iter()
        .map(|record| resource.transformer.transform(record))
        .collect();
    let pagination = Pagination::new(total, data.len() as u64, page.per_page, page.number);

    Ok(Json(CollectionResponse {
        data,
        meta: CollectionMeta {
            pagination,
            extra: resource.policy.meta(&ctx),
        },
    }))
}

/// Get a single record by primary key
#[utoipa::path(
    get,
    path = "/api/v1/{resource}/{id}",
    tag = "resources",
    params(
        ("resource" = String, Path, description = "Configured resource name"),
        ("id" = String, Path, description = "Primary key")
    ),
    responses(
        (status = 200, description = "Record", body = ItemResponse),
        (status = 401, description = "Missing or invalid API key", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Record not found", body = crate::api::types::ErrorResponse)
    )
)]
pub async fn show(
    State(state): State<ResourceApiState>,
    ctx: RequestContext,
    ResourceId(id): ResourceId,
) -> Result<Json<ItemResponse>, ApiError> {
    let resource = &state.resource;
    resource.authorize(Action::View, &ctx)?;

    let record = state
        .store
        .find(&resource.table, &id)
        .await
        .map_err(ApiError::from_data)?
        .ok_or_else(ApiError::not_found)?;

    Ok(Json(resource.item(record)))
}

/// Create a record
#[utoipa::path(
    post,
    path = "/api/v1/{resource}",
    tag = "resources",
    params(
        ("resource" = String, Path, description = "Configured resource name")
    ),
    request_body(content = Object, description = "Column values"),
    responses(
        (status = 201, description = "Record created", body = ItemResponse),
        (status = 400, description = "Body is not a JSON object", body = crate::api::types::ErrorResponse),
        (status = 401, description = "Missing or invalid API key", body = crate::api::types::ErrorResponse),
        (status = 422, description = "Validation failed", body = crate::api::types::ErrorResponse)
    )
)]
pub async fn store_record(
    State(state): State<ResourceApiState>,
    ctx: RequestContext,
    body: Result<JsonObject, ValidationRejection>,
) -> Result<(StatusCode, Json<ItemResponse>), ApiError> {
    let resource = &state.resource;
    resource.authorize(Action::Create, &ctx)?;

    let JsonObject(body) = body?;
    resource.validate(Action::Create, &body)?;

    let mut record = resource.fillable(body);
    resource.policy.prepare_create(&mut record, &ctx);

    let created = state
        .store
        .insert(&resource.table, &record)
        .await
        .map_err(ApiError::from_data)?;

    tracing::debug!(resource = %resource.name, "Record created");
    Ok((StatusCode::CREATED, Json(resource.item(created))))
}

/// Update a record (PUT and PATCH)
#[utoipa::path(
    put,
    path = "/api/v1/{resource}/{id}",
    tag = "resources",
    params(
        ("resource" = String, Path, description = "Configured resource name"),
        ("id" = String, Path, description = "Primary key")
    ),
    request_body(content = Object, description = "Column values"),
    responses(
        (status = 200, description = "Record updated", body = ItemResponse),
        (status = 400, description = "Body is not a JSON object", body = crate::api::types::ErrorResponse),
        (status = 401, description = "Missing or invalid API key", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Record not found", body = crate::api::types::ErrorResponse),
        (status = 422, description = "Validation failed", body = crate::api::types::ErrorResponse)
    )
)]
pub async fn update_record(
    State(state): State<ResourceApiState>,
    ctx: RequestContext,
    ResourceId(id): ResourceId,
    body: Result<JsonObject, ValidationRejection>,
) -> Result<Json<ItemResponse>, ApiError> {
    let resource = &state.resource;
    resource.authorize(Action::Update, &ctx)?;

    state
        .store
        .find(&resource.table, &id)
        .await
        .map_err(ApiError::from_data)?
        .ok_or_else(ApiError::not_found)?;

    let JsonObject(body) = body?;
    resource.validate(Action::Update, &body)?;

    let updated = state
        .store
        .update(&resource.table, &id, &resource.fillable(body))
        .await
        .map_err(ApiError::from_data)?
        .ok_or_else(ApiError::not_found)?;

    Ok(Json(resource.item(updated)))
}

/// Delete a record
#[utoipa::path(
    delete,
    path = "/api/v1/{resource}/{id}",
    tag = "resources",
    params(
        ("resource" = String, Path, description = "Configured resource name"),
        ("id" = String, Path, description = "Primary key")
    ),
    responses(
        (status = 200, description = "Record deleted", body = SuccessResponse),
        (status = 401, description = "Missing or invalid API key", body = crate::api::types::ErrorResponse),
        (status = 404, description = "Record not found", body = crate::api::types::ErrorResponse),
        (status = 500, description = "Delete failed", body = crate::api::types::ErrorResponse)
    )
)]
pub async fn delete_record(
    State(state): State<ResourceApiState>,
    ctx: RequestContext,
    ResourceId(id): ResourceId,
) -> Result<SuccessResponse, ApiError> {
    let resource = &state.resource;
    resource.authorize(Action::Delete, &ctx)?;

    match state.store.delete(&resource.table, &id).await {
        Ok(true) => Ok(SuccessResponse::new("Resource has been deleted.")),
        Ok(false) => Err(ApiError::not_found()),
        Err(e) => {
            tracing::error!(resource = %resource.name, error = %e, "Delete failed");
            Err(ApiError::internal(e.to_string()))
        }
    }
}
