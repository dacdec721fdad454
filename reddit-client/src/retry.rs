use quoteit_core::{CoreError, ErrorExt};
use std::future::Future;
use tokio::time::sleep;
use tracing::{info, warn};

/// Runs `operation`; if Reddit answers with a rate limit, sleeps for the
/// cooldown it announced and runs the operation exactly once more.
///
/// The second result is returned as is, even if it is another rate limit.
pub async fn retry_once_after_cooldown<F, Fut, T>(
    operation_name: &str,
    mut operation: F,
) -> Result<T, CoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, CoreError>>,
{
    match operation().await {
        Ok(value) => Ok(value),
        Err(error) => match error.retry_after() {
            Some(cooldown) => {
                warn!(
                    "Rate limit exceeded for {}; must sleep for {:?}",
                    operation_name, cooldown
                );
                sleep(cooldown).await;

                let result = operation().await;
                match &result {
                    Ok(_) => info!("{} succeeded after rate-limit cooldown", operation_name),
                    Err(e) => warn!("{} failed again after cooldown: {}", operation_name, e),
                }
                result
            }
            None => Err(error),
        },
    }
}
