//! Request extractors whose rejections are reported as validation errors

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

/// `Json` body that rejects with [`AppError`] (400) instead of axum's plain-text 422
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// `Query` string that rejects with [`AppError`]
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);
