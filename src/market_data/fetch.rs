use std::future::Future;
use std::time::Duration;

use thiserror::Error;

/// Default upper bound on any single upstream call.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Why an upstream contributed nothing this cycle.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{venue} timed out after {timeout:?}")]
    Timeout { venue: String, timeout: Duration },
    #[error("{venue} request failed: {source:#}")]
    Failed {
        venue: String,
        #[source]
        source: anyhow::Error,
    },
}

impl FetchError {
    pub fn venue(&self) -> &str {
        match self {
            FetchError::Timeout { venue, .. } | FetchError::Failed { venue, .. } => venue,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }
}

/// Run `fut` with an upper bound of `timeout`, classifying the outcome.
pub async fn bounded<T, F>(venue: &str, timeout: Duration, fut: F) -> Result<T, FetchError>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(FetchError::Failed {
            venue: venue.to_string(),
            source,
        }),
        Err(_) => Err(FetchError::Timeout {
            venue: venue.to_string(),
            timeout,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[tokio::test]
    async fn classifies_timeouts_and_failures() {
        let slow = bounded("upbit", Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            anyhow::Ok(1)
        })
        .await
        .unwrap_err();
        assert!(slow.is_timeout());
        assert_eq!(slow.venue(), "upbit");

        let broken = bounded("binance", Duration::from_secs(1), async {
            Err::<u32, _>(anyhow!("418 I'm a teapot"))
        })
        .await
        .unwrap_err();
        assert!(!broken.is_timeout());
        assert!(broken.to_string().contains("418"));

        let ok = bounded("coinbase", Duration::from_secs(1), async { anyhow::Ok(3) }).await;
        assert_eq!(ok.unwrap(), 3);
    }
}
