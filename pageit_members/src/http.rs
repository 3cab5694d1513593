//! HTTP surface: `GET /members` pages member DTOs, `GET /health` answers `ok`.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use pageit::{Fetchable, PageSpec, PageSpecError, RepoError, Sort};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::config::PagingConfig;
use crate::dto::{MemberDto, PageBody};
use crate::entity::Member;
use crate::repository::MemberRepository;

#[derive(Clone)]
pub struct AppState {
    pub members: Arc<MemberRepository>,
    pub paging: PagingConfig,
}

impl AppState {
    pub fn new(members: MemberRepository, paging: PagingConfig) -> Self {
        Self {
            members: Arc::new(members),
            paging,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/members", get(list_members))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error(transparent)]
    Store(RepoError),
}

impl From<RepoError> for ApiError {
    fn from(e: RepoError) -> Self {
        match e {
            RepoError::UnknownColumn { column } => {
                ApiError::BadRequest(format!("unknown column `{}`", column))
            }
            other => ApiError::Store(other),
        }
    }
}

impl From<PageSpecError> for ApiError {
    fn from(e: PageSpecError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            ApiError::Store(e) => {
                tracing::error!(error = ?e, "member query failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal server error".to_string(),
                )
            }
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// `?page=&size=&sort=column[,asc|desc]`
#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u64>,
    pub size: Option<u64>,
    pub sort: Option<String>,
}

impl PageParams {
    /// Applies defaults and limits. Page 0, the configured default size and
    /// `username` ascending when unspecified.
    pub fn to_spec(&self, paging: &PagingConfig) -> Result<PageSpec, ApiError> {
        let size = self
            .size
            .unwrap_or(paging.default_size)
            .min(paging.max_size);
        let sort = match self.sort.as_deref() {
            None => Sort::asc("username"),
            Some(raw) => Sort::parse(raw)
                .ok_or_else(|| ApiError::BadRequest(format!("invalid sort `{}`", raw)))?,
        };
        if !Member::has_column(sort.column()) {
            return Err(ApiError::BadRequest(format!(
                "cannot sort by `{}`",
                sort.column()
            )));
        }
        Ok(PageSpec::of_page(self.page.unwrap_or(0), size, Some(sort))?)
    }
}

async fn health() -> &'static str {
    "ok"
}

async fn list_members(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<PageBody<MemberDto>>, ApiError> {
    let spec = params.to_spec(&state.paging)?;
    let page = state.members.page_dtos(&spec).await?;
    Ok(Json(PageBody::from(page)))
}
