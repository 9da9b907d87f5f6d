use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::error::FetchError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("{0}")]
    BadRequest(String),
}

#[derive(Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Fetch(FetchError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Fetch(FetchError::UpstreamFailure(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Fetch(FetchError::Internal(_)) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("Request failed: {self}");
        }
        let body = Json(ErrorBody {
            code: status.as_u16(),
            message: self.to_string(),
        });
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fetch_errors_map_to_distinct_statuses() {
        let cases = [
            (FetchError::NotFound("ZZZ.NS".into()), StatusCode::NOT_FOUND),
            (
                FetchError::UpstreamFailure("TCS.NS: timed out".into()),
                StatusCode::BAD_GATEWAY,
            ),
            (
                FetchError::Internal("worker pool closed".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), expected);
        }
    }

    #[test]
    fn bad_request_is_client_error() {
        let response = ApiError::BadRequest("no symbols".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
