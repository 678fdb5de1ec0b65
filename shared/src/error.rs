use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    // 予約リクエストの事前チェックで弾かれた場合。
    // code には "not_slot_aligned" など機械可読な理由を入れる
    #[error("{message}")]
    Validation {
        code: &'static str,
        message: String,
    },
    #[error("{0}")]
    ValidationError(#[from] garde::Report),
    #[error("{0}")]
    UnprocessableEntity(String),
    #[error("{0}")]
    EntityNotFound(String),
    // スロットの一意制約違反。レースで負けた側が受け取る想定の正常系エラー
    #[error("指定の時間帯はすでに予約されています: {0}")]
    SlotConflict(String),
    #[error("{0}")]
    AlreadyCanceled(String),
    // シリアライズ失敗・デッドロックなど、リトライすれば成功しうるエラー。
    // 呼び出し元へはそのまま返さず、リトライ層で処理する
    #[error("transient database error")]
    TransientError(#[source] sqlx::Error),
    #[error("{attempts} 回のリトライ後も処理を完了できませんでした")]
    RetryExhausted {
        attempts: u32,
        #[source]
        source: Box<AppError>,
    },
    #[error("ログインが必要です")]
    UnauthenticatedError,
    #[error("この操作を行う権限がありません")]
    ForbiddenOperation,
    #[error("{0}")]
    ConversionEntityError(String),
    #[error(transparent)]
    SpecificOperationError(sqlx::Error),
    #[error("No rows affected: {0}")]
    NoRowsAffectedError(String),
    #[error(transparent)]
    TransactionError(sqlx::Error),
}

impl AppError {
    // リトライ層が再試行してよいエラーかどうか
    pub fn is_transient(&self) -> bool {
        matches!(self, AppError::TransientError(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation { .. } | AppError::UnprocessableEntity(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::EntityNotFound(_) => StatusCode::NOT_FOUND,
            AppError::SlotConflict(_) | AppError::AlreadyCanceled(_) => StatusCode::CONFLICT,
            AppError::UnauthenticatedError => StatusCode::UNAUTHORIZED,
            AppError::ForbiddenOperation => StatusCode::FORBIDDEN,
            AppError::RetryExhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
            AppError::TransientError(_)
            | AppError::ConversionEntityError(_)
            | AppError::SpecificOperationError(_)
            | AppError::NoRowsAffectedError(_)
            | AppError::TransactionError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::Validation { code, .. } => code,
            AppError::ValidationError(_) => "invalid_request",
            AppError::UnprocessableEntity(_) => "unprocessable",
            AppError::EntityNotFound(_) => "not_found",
            AppError::SlotConflict(_) => "slot_conflict",
            AppError::AlreadyCanceled(_) => "already_canceled",
            AppError::UnauthenticatedError => "unauthenticated",
            AppError::ForbiddenOperation => "forbidden",
            AppError::RetryExhausted { .. } => "retry_exhausted",
            _ => "internal_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status_code = self.status_code();
        if status_code.is_server_error() {
            tracing::error!(
                error.cause_chain = ?self,
                error.message = %self,
                "Unexpected error happened"
            );
        }
        let body = Json(json!({
            "code": self.error_code(),
            "message": self.to_string(),
        }));
        (status_code, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_and_already_canceled_map_to_409() {
        assert_eq!(
            AppError::SlotConflict("room x".into()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::AlreadyCanceled("booking y".into()).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn validation_reports_reason_code() {
        let e = AppError::Validation {
            code: "not_slot_aligned",
            message: "開始時刻は 00 分または 30 分を指定してください".into(),
        };
        assert_eq!(e.error_code(), "not_slot_aligned");
        assert_eq!(e.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn only_transient_errors_are_retryable() {
        let transient = AppError::TransientError(sqlx::Error::PoolTimedOut);
        assert!(transient.is_transient());
        assert!(!AppError::SlotConflict("x".into()).is_transient());
        assert!(!AppError::EntityNotFound("x".into()).is_transient());
    }
}
