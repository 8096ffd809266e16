//! Request extractors that reject with [`ApiError`]

use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::request::Parts;
use axum::Json;
use serde_json::Value;

use super::errors::ApiError;
use crate::query::QueryString;

/// The parsed query string of the request
#[derive(Debug, Clone)]
pub struct ApiQuery(pub QueryString);

impl<S: Send + Sync> FromRequestParts<S> for ApiQuery {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let raw = parts.uri.query().unwrap_or_default();
        Ok(ApiQuery(QueryString::parse(raw)?))
    }
}

/// A JSON request body
#[derive(Debug, Clone)]
pub struct ApiJson(pub Value);

impl<S: Send + Sync> FromRequest<S> for ApiJson {
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state)
            .await
            .map_err(|rejection| ApiError::InvalidBody(rejection.body_text()))?;
        Ok(ApiJson(value))
    }
}
