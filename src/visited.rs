use serde::Serialize;
use std::collections::HashMap;
use tokio::sync::Mutex;
use url::Url;

/// State of a canonical URL in the crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitStatus {
    /// Claimed: queued or in progress
    Pending,
    /// Completed successfully
    Done,
    /// Terminal failure, never retried
    Failed,
}

/// Process-scoped record of every canonical URL the crawl has claimed
///
/// Claiming is an atomic check-and-set: exactly one caller can move a URL out
/// of "unclaimed", and a URL never leaves `Done` or `Failed`.
#[derive(Debug, Default)]
pub struct VisitedSet {
    entries: Mutex<HashMap<String, VisitStatus>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `url` as `Pending`; returns false if it is already known in any state
    pub async fn try_claim(&self, url: &Url) -> bool {
        let mut entries = self.entries.lock().await;
        if entries.contains_key(url.as_str()) {
            ::log::trace!("Already claimed: {}", url);
            return false;
        }
        entries.insert(url.to_string(), VisitStatus::Pending);
        true
    }

    /// Moves a pending URL to `Done`
    pub async fn mark_done(&self, url: &Url) {
        self.finish(url, VisitStatus::Done).await;
    }

    /// Moves a pending URL to `Failed`
    pub async fn mark_failed(&self, url: &Url) {
        self.finish(url, VisitStatus::Failed).await;
    }

    async fn finish(&self, url: &Url, status: VisitStatus) {
        let mut entries = self.entries.lock().await;
        match entries.get(url.as_str()).copied() {
            Some(VisitStatus::Pending) => {
                entries.insert(url.to_string(), status);
            }
            Some(current) => {
                ::log::warn!(
                    "Ignoring transition of {} from {:?} to {:?}",
                    url,
                    current,
                    status
                );
            }
            None => {
                ::log::warn!("Finishing unclaimed URL {} as {:?}", url, status);
                entries.insert(url.to_string(), status);
            }
        }
    }

    /// Records a URL as already completed, e.g. from an earlier run
    pub async fn insert_done(&self, url: &Url) -> bool {
        let mut entries = self.entries.lock().await;
        if entries.contains_key(url.as_str()) {
            return false;
        }
        entries.insert(url.to_string(), VisitStatus::Done);
        true
    }

    pub async fn status(&self, url: &Url) -> Option<VisitStatus> {
        self.entries.lock().await.get(url.as_str()).copied()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_claim_once() {
        let visited = VisitedSet::new();
        let a = url("https://example.com/a");

        assert!(visited.try_claim(&a).await);
        assert!(!visited.try_claim(&a).await);
        assert_eq!(visited.status(&a).await, Some(VisitStatus::Pending));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_claims_exactly_one_wins() {
        for round in 0..20 {
            let visited = Arc::new(VisitedSet::new());
            let target = url(&format!("https://example.com/page/{}", round));

            let mut handles = Vec::new();
            for _ in 0..32 {
                let visited = Arc::clone(&visited);
                let target = target.clone();
                handles.push(tokio::spawn(
                    async move { visited.try_claim(&target).await },
                ));
            }

            let mut winners = 0;
            for handle in handles {
                if handle.await.unwrap() {
                    winners += 1;
                }
            }
            assert_eq!(winners, 1, "round {} had {} winners", round, winners);
            assert_eq!(visited.len().await, 1);
        }
    }

    #[tokio::test]
    async fn test_terminal_states_are_final() {
        let visited = VisitedSet::new();
        let a = url("https://example.com/a");

        visited.try_claim(&a).await;
        visited.mark_failed(&a).await;
        visited.mark_done(&a).await;
        assert_eq!(visited.status(&a).await, Some(VisitStatus::Failed));
        assert!(!visited.try_claim(&a).await);
    }

    #[tokio::test]
    async fn test_insert_done_blocks_claims() {
        let visited = VisitedSet::new();
        let a = url("https://example.com/a");

        assert!(visited.insert_done(&a).await);
        assert!(!visited.try_claim(&a).await);
        assert_eq!(visited.status(&a).await, Some(VisitStatus::Done));
    }
}
