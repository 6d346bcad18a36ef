// Success envelope and extractors that fail with the error envelope

use crate::errors::AppError;
use axum::{
    extract::{FromRequest, FromRequestParts},
    Json,
};
use serde::Serialize;

/// `{ "ok": true, "data": ... }`
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub ok: bool,
    pub data: T,
}

pub fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope { ok: true, data })
}

/// JSON body; a missing content type is 415, a malformed body 400
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct ApiJson<T>(pub T);

/// Path parameters with envelope-shaped rejections
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(AppError))]
pub struct ApiPath<T>(pub T);
