use std::collections::HashMap;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::DateTime;
use chrono::Utc;
use tokio::runtime::Handle;
use tokio::sync::RwLock;

use crate::identity::models::UserId;

/// Access tokens invalidated before their natural expiry.
///
/// Maps token string to its `exp`. Every `sweep_every` insertions a
/// detached task drops entries whose expiry has passed; an expired entry
/// left behind is harmless, since the token fails verification anyway.
#[derive(Debug)]
pub struct RevocationSet {
    entries: Arc<RwLock<HashMap<String, DateTime<Utc>>>>,
    insertions: AtomicUsize,
    sweep_every: usize,
}

impl RevocationSet {
    pub fn new(sweep_every: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            insertions: AtomicUsize::new(0),
            sweep_every: sweep_every.max(1),
        }
    }

    /// Record a revoked token.
    pub async fn revoke(&self, token: String, expires_at: DateTime<Utc>) {
        self.entries.write().await.insert(token, expires_at);

        let inserted = self.insertions.fetch_add(1, Ordering::Relaxed) + 1;
        if inserted % self.sweep_every == 0 {
            self.schedule_sweep();
        }
    }

    pub async fn contains(&self, token: &str) -> bool {
        self.entries.read().await.contains_key(token)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Drop entries that expired at or before `now`.
    ///
    /// # Returns
    /// Number of entries removed
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        Self::sweep(&self.entries, now).await
    }

    fn schedule_sweep(&self) {
        let Ok(handle) = Handle::try_current() else {
            tracing::debug!("No async runtime, skipping revocation sweep");
            return;
        };

        let entries = Arc::clone(&self.entries);
        handle.spawn(async move {
            let removed = Self::sweep(&entries, Utc::now()).await;
            tracing::debug!(removed, "Revocation sweep completed");
        });
    }

    async fn sweep(entries: &RwLock<HashMap<String, DateTime<Utc>>>, now: DateTime<Utc>) -> usize {
        let mut entries = entries.write().await;
        let before = entries.len();
        entries.retain(|_, expires_at| *expires_at > now);
        before - entries.len()
    }
}

/// The single authoritative refresh token per subject.
///
/// Recording a new token overwrites the previous one (rotation).
#[derive(Debug, Default)]
pub struct RefreshTokenIndex {
    tokens: RwLock<HashMap<UserId, String>>,
}

impl RefreshTokenIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn record(&self, subject: UserId, token: String) {
        self.tokens.write().await.insert(subject, token);
    }

    pub async fn is_current(&self, subject: &UserId, token: &str) -> bool {
        self.tokens
            .read()
            .await
            .get(subject)
            .is_some_and(|current| current == token)
    }

    pub async fn forget(&self, subject: &UserId) {
        self.tokens.write().await.remove(subject);
    }
}

/// Pending password reset, as indexed in process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResetRecord {
    pub subject_id: UserId,
    pub expires_at: DateTime<Utc>,
}

/// In-process mirror of pending reset tokens, keyed by token string.
#[derive(Debug, Default)]
pub struct ResetTokenIndex {
    records: RwLock<HashMap<String, ResetRecord>>,
}

impl ResetTokenIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a reset token, dropping older tokens of the same subject and
    /// any that have expired.
    pub async fn insert(&self, token: String, record: ResetRecord) {
        let now = Utc::now();
        let mut records = self.records.write().await;
        records.retain(|_, existing| {
            existing.subject_id != record.subject_id && existing.expires_at > now
        });
        records.insert(token, record);
    }

    pub async fn get(&self, token: &str) -> Option<ResetRecord> {
        self.records.read().await.get(token).copied()
    }

    pub async fn remove(&self, token: &str) -> Option<ResetRecord> {
        self.records.write().await.remove(token)
    }

    /// Remove and return the record for `token` if it belongs to `subject`
    /// and is unexpired at `now`.
    ///
    /// Check and removal happen under one write lock, so of several
    /// concurrent callers at most one gets the record.
    pub async fn take(
        &self,
        token: &str,
        subject: &UserId,
        now: DateTime<Utc>,
    ) -> Option<ResetRecord> {
        let mut records = self.records.write().await;
        match records.get(token) {
            Some(record) if &record.subject_id == subject && record.expires_at > now => {
                records.remove(token)
            }
            _ => None,
        }
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration as StdDuration;

    use chrono::Duration;

    use super::*;

    #[tokio::test]
    async fn test_revoke_and_contains() {
        let revoked = RevocationSet::new(100);
        let expires_at = Utc::now() + Duration::hours(1);

        assert!(!revoked.contains("token-a").await);
        revoked.revoke("token-a".to_string(), expires_at).await;

        assert!(revoked.contains("token-a").await);
        assert!(!revoked.contains("token-b").await);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let revoked = RevocationSet::new(100);
        let now = Utc::now();

        revoked
            .revoke("expired".to_string(), now - Duration::seconds(1))
            .await;
        revoked
            .revoke("live".to_string(), now + Duration::hours(1))
            .await;

        assert_eq!(revoked.purge_expired(now).await, 1);
        assert!(!revoked.contains("expired").await);
        assert!(revoked.contains("live").await);
    }

    #[tokio::test]
    async fn test_sweep_triggered_by_insertions() {
        let revoked = RevocationSet::new(2);
        let now = Utc::now();

        revoked
            .revoke("expired".to_string(), now - Duration::seconds(1))
            .await;
        assert_eq!(revoked.len().await, 1);

        // Second insertion schedules a background sweep
        revoked
            .revoke("live".to_string(), now + Duration::hours(1))
            .await;

        let mut remaining = revoked.len().await;
        for _ in 0..100 {
            if remaining == 1 {
                break;
            }
            tokio::time::sleep(StdDuration::from_millis(10)).await;
            remaining = revoked.len().await;
        }

        assert_eq!(remaining, 1);
        assert!(revoked.contains("live").await);
    }

    #[tokio::test]
    async fn test_concurrent_revocations() {
        let revoked = Arc::new(RevocationSet::new(8));
        let expires_at = Utc::now() + Duration::hours(1);

        let tasks: Vec<_> = (0..32)
            .map(|i| {
                let revoked = Arc::clone(&revoked);
                tokio::spawn(async move { revoked.revoke(format!("token-{}", i), expires_at).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(revoked.len().await, 32);
    }

    #[tokio::test]
    async fn test_refresh_index_rotation() {
        let index = RefreshTokenIndex::new();
        let subject = UserId::new();

        assert!(!index.is_current(&subject, "r1").await);

        index.record(subject, "r1".to_string()).await;
        assert!(index.is_current(&subject, "r1").await);

        index.record(subject, "r2".to_string()).await;
        assert!(!index.is_current(&subject, "r1").await);
        assert!(index.is_current(&subject, "r2").await);

        index.forget(&subject).await;
        assert!(!index.is_current(&subject, "r2").await);
    }

    #[tokio::test]
    async fn test_reset_index_replaces_subject_tokens() {
        let index = ResetTokenIndex::new();
        let subject = UserId::new();
        let other = UserId::new();
        let expires_at = Utc::now() + Duration::hours(1);

        let record = ResetRecord {
            subject_id: subject,
            expires_at,
        };
        index.insert("t1".to_string(), record).await;
        index
            .insert(
                "o1".to_string(),
                ResetRecord {
                    subject_id: other,
                    expires_at,
                },
            )
            .await;
        index.insert("t2".to_string(), record).await;

        assert_eq!(index.get("t1").await, None);
        assert_eq!(index.get("t2").await, Some(record));
        assert!(index.get("o1").await.is_some());

        assert_eq!(index.remove("t2").await, Some(record));
        assert_eq!(index.len().await, 1);
    }

    #[tokio::test]
    async fn test_reset_index_take_is_single_use() {
        let index = ResetTokenIndex::new();
        let subject = UserId::new();
        let now = Utc::now();
        let record = ResetRecord {
            subject_id: subject,
            expires_at: now + Duration::hours(1),
        };
        index.insert("t1".to_string(), record).await;

        // Wrong subject or past expiry leaves the record in place
        assert_eq!(index.take("t1", &UserId::new(), now).await, None);
        assert_eq!(
            index.take("t1", &subject, now + Duration::hours(2)).await,
            None
        );
        assert_eq!(index.len().await, 1);

        assert_eq!(index.take("t1", &subject, now).await, Some(record));
        assert_eq!(index.take("t1", &subject, now).await, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_reset_index_concurrent_take() {
        let index = Arc::new(ResetTokenIndex::new());
        let subject = UserId::new();
        let now = Utc::now();
        index
            .insert(
                "t1".to_string(),
                ResetRecord {
                    subject_id: subject,
                    expires_at: now + Duration::hours(1),
                },
            )
            .await;

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let index = Arc::clone(&index);
                tokio::spawn(async move { index.take("t1", &subject, now).await.is_some() })
            })
            .collect();

        let mut claimed = 0;
        for task in tasks {
            if task.await.unwrap() {
                claimed += 1;
            }
        }
        assert_eq!(claimed, 1);
    }
}
