use std::collections::HashSet;
use tokio::sync::RwLock;

/// Identities of every item seen so far in this process.
///
/// The set only grows. All access goes through `mark_and_check`, which tests
/// and inserts under one write lock, so two concurrent calls for the same
/// identity can never both report it as new.
#[derive(Debug, Default)]
pub struct DedupLedger {
    seen: RwLock<HashSet<String>>,
}

impl DedupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time `identity` is offered and `false` ever after.
    pub async fn mark_and_check(&self, identity: &str) -> bool {
        let mut seen = self.seen.write().await;
        if seen.contains(identity) {
            return false;
        }
        seen.insert(identity.to_string())
    }

    pub async fn contains(&self, identity: &str) -> bool {
        self.seen.read().await.contains(identity)
    }

    pub async fn len(&self) -> usize {
        self.seen.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.seen.read().await.is_empty()
    }
}
