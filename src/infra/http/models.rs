//! Request and response shapes for the user endpoints.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::application::pagination::Pagination;
use crate::application::repos::{CreateUserParams, UserFilter};
use crate::application::users::UpdateUserCommand;
use crate::domain::error::DomainError;
use crate::domain::users::{validate_age, validate_email, validate_name};

/// Largest page a client may request over HTTP.
pub const MAX_REQUEST_PAGE_SIZE: i64 = 100;

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub path: String,
    pub status_code: u16,
    pub status: String,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Uniform success body: metadata, optional data and optional pagination.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub metadata: ResponseMeta,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl<T: Serialize> Envelope<T> {
    pub fn new(status: StatusCode, path: &str, message: &str, data: Option<T>) -> Self {
        Self {
            metadata: ResponseMeta {
                path: path.to_string(),
                status_code: status.as_u16(),
                status: status.canonical_reason().unwrap_or("Unknown").to_string(),
                message: message.to_string(),
                timestamp: OffsetDateTime::now_utc(),
            },
            data,
            pagination: None,
        }
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    pub fn into_response_with(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub age: i32,
}

impl CreateUserRequest {
    pub fn into_params(self) -> Result<CreateUserParams, DomainError> {
        validate_name(&self.name)?;
        validate_email(&self.email)?;
        validate_age(self.age)?;
        Ok(CreateUserParams {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            age: self.age,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub age: Option<i32>,
}

impl UpdateUserRequest {
    /// Validate only the fields that are present and non-empty.
    pub fn into_command(self) -> Result<UpdateUserCommand, DomainError> {
        let name = self.name.filter(|name| !name.trim().is_empty());
        let email = self.email.filter(|email| !email.trim().is_empty());
        let age = self.age.filter(|age| *age != 0);

        if let Some(name) = name.as_deref() {
            validate_name(name)?;
        }
        if let Some(email) = email.as_deref() {
            validate_email(email)?;
        }
        if let Some(age) = age {
            validate_age(age)?;
        }

        Ok(UpdateUserCommand {
            name: name.map(|name| name.trim().to_string()),
            email: email.map(|email| email.trim().to_string()),
            age,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ListUsersQuery {
    pub name: Option<String>,
    pub email: Option<String>,
    pub min_age: Option<i32>,
    pub max_age: Option<i32>,
    pub page: Option<i64>,
    pub page_size: Option<i64>,
    pub sort_by: Option<String>,
    pub sort_dir: Option<String>,
}

impl ListUsersQuery {
    pub fn into_filter(self) -> Result<UserFilter, DomainError> {
        let page_size = self.page_size.unwrap_or_default();
        if page_size > MAX_REQUEST_PAGE_SIZE {
            return Err(DomainError::validation(
                "page_size",
                format!("must be at most {MAX_REQUEST_PAGE_SIZE}"),
            ));
        }
        if let Some(age) = self.min_age {
            validate_age(age)?;
        }
        if let Some(age) = self.max_age {
            validate_age(age)?;
        }

        Ok(UserFilter {
            name: self.name,
            email: self.email,
            min_age: self.min_age,
            max_age: self.max_age,
            page: self.page.unwrap_or_default(),
            page_size,
            sort_by: self.sort_by,
            sort_dir: self.sort_dir,
        })
    }
}
