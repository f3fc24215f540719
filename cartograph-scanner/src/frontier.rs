use std::collections::HashSet;
use tokio::sync::Mutex;
use url::Url;

/// Set of canonical URLs that have already been handed to the queue.
///
/// `try_claim` is the only way in, and it checks and inserts under one lock,
/// so concurrent workers can never both win the same URL.
#[derive(Default)]
pub struct Frontier {
    claimed: Mutex<HashSet<String>>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if this call claimed the URL, `false` if it was already claimed.
    pub async fn try_claim(&self, url: &Url) -> bool {
        self.claimed.lock().await.insert(url.as_str().to_string())
    }

    pub async fn contains(&self, url: &Url) -> bool {
        self.claimed.lock().await.contains(url.as_str())
    }

    pub async fn len(&self) -> usize {
        self.claimed.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.claimed.lock().await.is_empty()
    }
}
