use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;
use tracing::error;

use crate::api::common;

/// Unrecoverable request-level failure. Everything here surfaces as a 500;
/// a missing entity on a detail page is deliberately not turned into a 404.
#[derive(Debug, Error)]
pub enum LightenError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
    #[error("blocking task error: {0}")]
    Blocking(#[from] actix_web::error::BlockingError),
}

impl ResponseError for LightenError {
    fn status_code(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn error_response(&self) -> HttpResponse {
        error!(error = %self, "request failed");
        HttpResponse::InternalServerError().json(common::fail("internal server error"))
    }
}
