//! Extractors whose rejections render through `AppError`, so malformed ids and
//! bodies come back as 400 `VALIDATION_ERROR` instead of Axum's plain-text 4xx.

use axum::extract::{FromRequest, FromRequestParts};

use crate::errors::AppError;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);
