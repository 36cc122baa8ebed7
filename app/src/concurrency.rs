use std::{error::Error, future::Future, time::Duration};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("concurrency conflict")]
pub struct ConflictError;

const MAX_RETRIES: u64 = 10;

/// Retries the callback as long as it fails with an error whose chain contains
/// [`ConflictError`], sleeping a little longer before each attempt. Any other error is returned
/// immediately. After [`MAX_RETRIES`] attempts the final result is returned as-is, conflict or
/// not.
pub async fn retry_loop<F: Future<Output = Result<T, E>>, T, E: Error + 'static>(
    mut cb: impl FnMut() -> F,
) -> Result<T, E> {
    for i in 1..MAX_RETRIES {
        match cb().await {
            Ok(result) => return Ok(result),
            Err(e) if is_conflict(Some(&e)) => {
                let timeout = Duration::from_millis(50 * i);
                log::info!("got a conflict error, sleeping for {:?}", timeout);
                tokio::time::sleep(timeout).await;
            }
            Err(e) => return Err(e),
        }
    }
    cb().await
}

fn is_conflict(e: Option<&(dyn Error + 'static)>) -> bool {
    e.map(|e| e.is::<ConflictError>() || is_conflict(e.source()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    #[derive(Debug, Error)]
    enum TestError {
        #[error("{0:?}")]
        Conflict(#[from] ConflictError),
        #[error("permanent")]
        Permanent,
    }

    #[tokio::test]
    async fn returns_first_success() {
        let calls = AtomicU64::new(0);
        let result = retry_loop(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok::<_, TestError>(42)
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn retries_conflicts_until_success() {
        let calls = AtomicU64::new(0);
        let result = retry_loop(|| async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(TestError::Conflict(ConflictError))
            } else {
                Ok(7)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 7);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn other_errors_are_not_retried() {
        let calls = AtomicU64::new(0);
        let result = retry_loop(|| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(TestError::Permanent)
        })
        .await;
        assert!(matches!(result, Err(TestError::Permanent)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
