// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request body extractor.
//!
//! Use `ApiJson` instead of `axum::Json` for request bodies so malformed or
//! mistyped bodies answer with the JSON error body every other failure uses:
//!
//! ```rust,ignore
//! async fn my_handler(ApiJson(body): ApiJson<Value>) -> Result<..., ApiError> {
//!     // body parsed; rejections are already `{"error": ...}` responses
//! }
//! ```

use axum::{
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// JSON request body with [`ApiError`] rejections.
#[derive(Debug)]
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(ApiJson(value))
    }
}
