//! User handlers

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Json, Path, Query, State};
use axum::http::{HeaderMap, StatusCode, Uri, header};
use axum::response::Response;
use uuid::Uuid;

use crate::application::repos::CacheControl;
use crate::domain::entities::UserRecord;

use super::HttpState;
use super::error::{ApiError, domain_to_api, user_to_api};
use super::models::{CreateUserRequest, Envelope, ListUsersQuery, UpdateUserRequest};

pub async fn create_user(
    State(state): State<HttpState>,
    uri: Uri,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload.map_err(malformed_body)?;
    let params = payload.into_params().map_err(domain_to_api)?;
    let user = state.users.create(params).await.map_err(user_to_api)?;

    Ok(
        Envelope::new(StatusCode::CREATED, uri.path(), "user created", Some(user))
            .into_response_with(StatusCode::CREATED),
    )
}

pub async fn get_user(
    State(state): State<HttpState>,
    uri: Uri,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    let user = state.users.find_by_id(id).await.map_err(user_to_api)?;

    Ok(
        Envelope::new(StatusCode::OK, uri.path(), "user retrieved", Some(user))
            .into_response_with(StatusCode::OK),
    )
}

pub async fn list_users(
    State(state): State<HttpState>,
    uri: Uri,
    headers: HeaderMap,
    query: Result<Query<ListUsersQuery>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(query) = query.map_err(|rejection| {
        ApiError::bad_request("Malformed query string", Some(rejection.body_text()))
    })?;
    let filter = query.into_filter().map_err(domain_to_api)?;
    let control = cache_control(&headers);
    let page = state
        .users
        .list(&filter, control)
        .await
        .map_err(user_to_api)?;

    Ok(
        Envelope::new(StatusCode::OK, uri.path(), "users retrieved", Some(page.items))
            .with_pagination(page.pagination)
            .into_response_with(StatusCode::OK),
    )
}

pub async fn update_user(
    State(state): State<HttpState>,
    uri: Uri,
    Path(id): Path<Uuid>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(payload) = payload.map_err(malformed_body)?;
    let command = payload.into_command().map_err(domain_to_api)?;
    let user = state
        .users
        .update(id, command)
        .await
        .map_err(user_to_api)?;

    Ok(
        Envelope::new(StatusCode::OK, uri.path(), "user updated", Some(user))
            .into_response_with(StatusCode::OK),
    )
}

pub async fn delete_user(
    State(state): State<HttpState>,
    uri: Uri,
    Path(id): Path<Uuid>,
) -> Result<Response, ApiError> {
    state.users.delete(id).await.map_err(user_to_api)?;

    Ok(
        Envelope::<UserRecord>::new(StatusCode::OK, uri.path(), "user deleted", None)
            .into_response_with(StatusCode::OK),
    )
}

fn malformed_body(rejection: JsonRejection) -> ApiError {
    ApiError::bad_request("Malformed request body", Some(rejection.body_text()))
}

/// `Cache-Control: no-cache` or `must-revalidate` forces a fresh listing.
pub(crate) fn cache_control(headers: &HeaderMap) -> CacheControl {
    let must_revalidate = headers
        .get_all(header::CACHE_CONTROL)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .any(|directive| {
            directive.eq_ignore_ascii_case("no-cache")
                || directive.eq_ignore_ascii_case("must-revalidate")
        });

    CacheControl { must_revalidate }
}
