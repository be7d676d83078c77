//! AppError 到 HTTP 响应的映射

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use vita_errors::AppError;

/// REST 层错误包装（孤儿规则要求的 newtype）
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let problem = self.0.to_problem_details();
        let status = StatusCode::from_u16(problem.status)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(problem)).into_response()
    }
}
