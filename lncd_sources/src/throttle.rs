use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::debug;

/// Enforces a minimum spacing between requests across all tasks sharing it.
#[derive(Debug)]
pub struct Throttle {
    min_interval: Duration,
    last: Mutex<Option<Instant>>,
}

impl Throttle {
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last: Mutex::new(None),
        }
    }

    /// Wait until `min_interval` has passed since the previous caller was
    /// let through. Callers are released one at a time.
    pub async fn wait(&self) {
        let mut last = self.last.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let remaining = self.min_interval - elapsed;
                debug!("Throttling for {}ms", remaining.as_millis());
                sleep(remaining).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn first_call_passes_immediately() {
        let throttle = Throttle::new(Duration::from_secs(30));
        let start = Instant::now();
        throttle.wait().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn concurrent_callers_are_spaced() {
        let throttle = Arc::new(Throttle::new(Duration::from_millis(40)));
        let start = Instant::now();
        let mut handles = Vec::new();
        for _ in 0..3 {
            let throttle = throttle.clone();
            handles.push(tokio::spawn(async move { throttle.wait().await }));
        }
        for handle in handles {
            assert!(handle.await.is_ok());
        }
        assert!(start.elapsed() >= Duration::from_millis(80));
    }
}
