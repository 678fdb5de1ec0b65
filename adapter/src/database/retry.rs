//! トランザクション全体の再試行と、DB エラーの分類。
//!
//! SERIALIZABLE トランザクション同士が重なると、PostgreSQL は
//! 直列化失敗（40001）やデッドロック（40P01）でどちらかを落とす。
//! これらは再試行すれば成功しうるため、トランザクション全体を
//! 上限つき・指数バックオフで再実行する。
//! 一方、スロットの一意制約違反（23505）は「別の予約に先を越された」
//! という確定した結果なので再試行せず、そのまま衝突として返す。

use std::future::Future;
use std::time::Duration;

use shared::error::{AppError, AppResult};

const UNIQUE_VIOLATION: &str = "23505";
const FOREIGN_KEY_VIOLATION: &str = "23503";
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(50),
        }
    }
}

// operation はトランザクションの開始からコミットまでを含む 1 回分の試行。
// TransientError 以外のエラーはそのまま呼び出し元へ返す
pub async fn run<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> AppResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = AppResult<T>>,
{
    let mut delay = policy.base_delay;
    let mut attempt = 1;
    loop {
        match operation().await {
            Err(e) if e.is_transient() && attempt < policy.max_attempts => {
                tracing::warn!(attempt, "一時的な DB エラーのため再試行します");
                tokio::time::sleep(delay).await;
                delay *= 2;
                attempt += 1;
            }
            Err(e) if e.is_transient() => {
                return Err(AppError::RetryExhausted {
                    attempts: attempt,
                    source: Box::new(e),
                });
            }
            other => return other,
        }
    }
}

// sqlx のエラーを SQLSTATE で分類する。エラーコードの解釈はここに集約し、
// リポジトリ側では AppError の種別だけを見る
pub fn classify_db_error(err: sqlx::Error) -> AppError {
    let code = err
        .as_database_error()
        .and_then(|db| db.code())
        .map(|c| c.to_string());
    let constraint = err
        .as_database_error()
        .and_then(|db| db.constraint())
        .map(|c| c.to_string());
    match code.as_deref() {
        Some(UNIQUE_VIOLATION) => {
            AppError::SlotConflict(constraint.unwrap_or_else(|| "slot_units".into()))
        }
        Some(SERIALIZATION_FAILURE) | Some(DEADLOCK_DETECTED) => AppError::TransientError(err),
        Some(FOREIGN_KEY_VIOLATION) => AppError::UnprocessableEntity(format!(
            "参照先のレコードが存在しません: {}",
            constraint.unwrap_or_default()
        )),
        _ => AppError::SpecificOperationError(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    fn transient() -> AppError {
        AppError::TransientError(sqlx::Error::PoolTimedOut)
    }

    #[tokio::test]
    async fn transient_errors_are_retried_up_to_the_limit() {
        let calls = AtomicU32::new(0);
        let res: AppResult<()> = run(&fast_policy(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(transient()) }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let Err(AppError::RetryExhausted { attempts, .. }) = res else {
            panic!("expected RetryExhausted");
        };
        assert_eq!(attempts, 3);
    }

    #[tokio::test]
    async fn conflict_is_returned_immediately_without_retry() {
        let calls = AtomicU32::new(0);
        let res: AppResult<()> = run(&fast_policy(), || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AppError::SlotConflict("slot_units_pkey".into())) }
        })
        .await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(res, Err(AppError::SlotConflict(_))));
    }

    #[tokio::test]
    async fn succeeds_after_transient_failure() {
        let calls = AtomicU32::new(0);
        let res = run(&fast_policy(), || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(transient())
                } else {
                    Ok(42)
                }
            }
        })
        .await;
        assert_eq!(res.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn non_database_errors_are_not_conflicts() {
        let e = classify_db_error(sqlx::Error::RowNotFound);
        assert!(matches!(e, AppError::SpecificOperationError(_)));
        let e = classify_db_error(sqlx::Error::PoolTimedOut);
        assert!(matches!(e, AppError::SpecificOperationError(_)));
    }
}
