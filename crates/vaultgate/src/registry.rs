//! Access registry: content metadata and grants.
//!
//! The registry is the only writer of content and grant records. It knows
//! nothing about keys beyond the opaque wrapped bytes it stores.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use tokio::sync::{Mutex, OwnedMutexGuard};

use vaultgate_core::{
    expiry_from_ttl, AccessGrant, AuthTag, Blake3Hash, Clock, ContentId, ContentObject, GrantState,
    Iv, PrincipalId,
};
use vaultgate_store::{InsertResult, RecordStore, RevokeOutcome};

use crate::error::{KernelError, Result};

/// A grant together with its state at the time it was listed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantStatus {
    pub grant: AccessGrant,
    pub state: GrantState,
}

/// Guard returned by [`AccessRegistry::lock_pair`].
pub type PairGuard = OwnedMutexGuard<()>;

/// Registry of content objects and their grants.
pub struct AccessRegistry<S: RecordStore> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    pair_locks: StdMutex<HashMap<(ContentId, PrincipalId), Arc<Mutex<()>>>>,
}

impl<S: RecordStore> AccessRegistry<S> {
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            pair_locks: StdMutex::new(HashMap::new()),
        }
    }

    /// Exclusive access to one `(content, principal)` pair.
    ///
    /// Callers hold the guard across a grant or revoke and its audit entry,
    /// so the ledger records changes to a pair in the order they committed.
    pub async fn lock_pair(&self, content_id: &ContentId, principal_id: &PrincipalId) -> PairGuard {
        let lock = {
            let mut locks = self.pair_locks.lock().unwrap_or_else(PoisonError::into_inner);
            // An entry nobody holds or waits on has a single reference.
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            locks
                .entry((content_id.clone(), principal_id.clone()))
                .or_default()
                .clone()
        };
        lock.lock_owned().await
    }

    /// Current time according to the registry's clock.
    pub fn now(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Record metadata for newly stored ciphertext.
    ///
    /// Fails with [`KernelError::DuplicateContent`] if the id is taken.
    pub async fn register_content(
        &self,
        content_id: ContentId,
        iv: Iv,
        auth_tag: AuthTag,
        content_hash: Blake3Hash,
        owner: PrincipalId,
    ) -> Result<ContentObject> {
        let content = ContentObject {
            content_id,
            iv,
            auth_tag,
            content_hash,
            owner,
            created_at: self.now(),
        };

        match self.store.insert_content(&content).await? {
            InsertResult::Inserted => {
                tracing::debug!(content_id = %content.content_id, owner = %content.owner, "content registered");
                Ok(content)
            }
            InsertResult::AlreadyExists => Err(KernelError::DuplicateContent(content.content_id)),
        }
    }

    /// Issue (or reissue) a grant for `principal_id` on `content_id`.
    ///
    /// Any existing grant for the pair is replaced. `ttl_minutes` of `None`
    /// makes the grant permanent. A TTL of zero yields a grant that is
    /// already expired.
    pub async fn grant(
        &self,
        content_id: &ContentId,
        principal_id: &PrincipalId,
        wrapped_key: Vec<u8>,
        ttl_minutes: Option<u32>,
    ) -> Result<AccessGrant> {
        if self.store.get_content(content_id).await?.is_none() {
            return Err(KernelError::ContentNotFound(content_id.clone()));
        }

        let now = self.now();
        let grant = AccessGrant::issue(
            content_id.clone(),
            principal_id.clone(),
            wrapped_key,
            now,
            expiry_from_ttl(now, ttl_minutes),
        );
        self.store.put_grant(&grant).await?;

        tracing::debug!(
            content_id = %content_id,
            principal_id = %principal_id,
            grant_id = %grant.grant_id,
            expires_at = ?grant.expires_at,
            "grant issued"
        );
        Ok(grant)
    }

    /// Revoke the grant for a pair. Idempotent.
    pub async fn revoke(
        &self,
        content_id: &ContentId,
        principal_id: &PrincipalId,
    ) -> Result<RevokeOutcome> {
        let outcome = self
            .store
            .revoke_grant(content_id, principal_id, self.now())
            .await?;
        tracing::debug!(
            content_id = %content_id,
            principal_id = %principal_id,
            outcome = outcome.as_str(),
            "revoke"
        );
        Ok(outcome)
    }

    /// The grant for a pair if it is valid right now.
    ///
    /// Revoked and expired grants are both reported as `None`.
    pub async fn lookup(
        &self,
        content_id: &ContentId,
        principal_id: &PrincipalId,
    ) -> Result<Option<AccessGrant>> {
        let now = self.now();
        Ok(self
            .store
            .get_grant(content_id, principal_id)
            .await?
            .filter(|g| g.is_valid(now)))
    }

    /// Content metadata, or [`KernelError::ContentNotFound`].
    pub async fn content(&self, content_id: &ContentId) -> Result<ContentObject> {
        self.store
            .get_content(content_id)
            .await?
            .ok_or_else(|| KernelError::ContentNotFound(content_id.clone()))
    }

    /// Every grant on a content object, with its current state.
    pub async fn grants(&self, content_id: &ContentId) -> Result<Vec<GrantStatus>> {
        let now = self.now();
        Ok(self
            .store
            .grants_for_content(content_id)
            .await?
            .into_iter()
            .map(|grant| GrantStatus {
                state: grant.state(now),
                grant,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vaultgate_core::{ManualClock, MINUTE_MS};
    use vaultgate_store::MemoryStore;

    const T0: i64 = 1_700_000_000_000;

    fn setup() -> (AccessRegistry<MemoryStore>, ManualClock) {
        let clock = ManualClock::new(T0);
        let registry = AccessRegistry::new(Arc::new(MemoryStore::new()), Arc::new(clock.clone()));
        (registry, clock)
    }

    async fn register(registry: &AccessRegistry<MemoryStore>, id: &str) -> ContentObject {
        registry
            .register_content(
                id.into(),
                Iv::from_bytes([1; 12]),
                AuthTag::from_bytes([2; 16]),
                Blake3Hash::hash(b"plaintext"),
                "alice".into(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_pair_lock_excludes_same_pair_only() {
        let (registry, _) = setup();
        let held = registry.lock_pair(&"b3-a".into(), &"bob".into()).await;

        let other = tokio::time::timeout(
            Duration::from_millis(50),
            registry.lock_pair(&"b3-a".into(), &"carol".into()),
        )
        .await;
        assert!(other.is_ok());

        let same = tokio::time::timeout(
            Duration::from_millis(50),
            registry.lock_pair(&"b3-a".into(), &"bob".into()),
        )
        .await;
        assert!(same.is_err());

        drop(held);
        drop(other);
        let _again = registry.lock_pair(&"b3-a".into(), &"bob".into()).await;
        assert_eq!(registry.pair_locks.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_register_is_write_once() {
        let (registry, _) = setup();
        let content = register(&registry, "b3-a").await;
        assert_eq!(content.created_at, T0);

        let err = registry
            .register_content(
                "b3-a".into(),
                Iv::from_bytes([9; 12]),
                AuthTag::from_bytes([9; 16]),
                Blake3Hash::hash(b"other"),
                "mallory".into(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, KernelError::DuplicateContent(_)));
        assert_eq!(registry.content(&"b3-a".into()).await.unwrap(), content);
    }

    #[tokio::test]
    async fn test_grant_requires_content() {
        let (registry, _) = setup();
        let err = registry
            .grant(&"b3-missing".into(), &"bob".into(), vec![1], None)
            .await
            .unwrap_err();
        assert!(matches!(err, KernelError::ContentNotFound(_)));
    }

    #[tokio::test]
    async fn test_zero_ttl_grant_is_born_expired() {
        let (registry, _) = setup();
        register(&registry, "b3-a").await;
        let grant = registry
            .grant(&"b3-a".into(), &"bob".into(), vec![1], Some(0))
            .await
            .unwrap();
        assert_eq!(grant.expires_at, Some(T0));
        assert!(registry.lookup(&"b3-a".into(), &"bob".into()).await.unwrap().is_none());

        let states: Vec<_> = registry
            .grants(&"b3-a".into())
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.state)
            .collect();
        assert_eq!(states, vec![GrantState::Expired]);
    }

    #[tokio::test]
    async fn test_lookup_hides_expired() {
        let (registry, clock) = setup();
        register(&registry, "b3-a").await;
        let grant = registry
            .grant(&"b3-a".into(), &"bob".into(), vec![1], Some(5))
            .await
            .unwrap();
        assert_eq!(grant.expires_at, Some(T0 + 5 * MINUTE_MS));

        clock.advance(Duration::from_secs(4 * 60));
        assert!(registry.lookup(&"b3-a".into(), &"bob".into()).await.unwrap().is_some());

        clock.advance(Duration::from_secs(60));
        assert!(registry.lookup(&"b3-a".into(), &"bob".into()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_revoke_then_regrant() {
        let (registry, clock) = setup();
        register(&registry, "b3-a").await;
        registry.grant(&"b3-a".into(), &"bob".into(), vec![1], None).await.unwrap();

        assert_eq!(
            registry.revoke(&"b3-a".into(), &"bob".into()).await.unwrap(),
            RevokeOutcome::Revoked
        );
        assert_eq!(
            registry.revoke(&"b3-a".into(), &"bob".into()).await.unwrap(),
            RevokeOutcome::AlreadyRevoked
        );
        assert!(registry.lookup(&"b3-a".into(), &"bob".into()).await.unwrap().is_none());

        clock.advance(Duration::from_millis(1));
        let fresh = registry.grant(&"b3-a".into(), &"bob".into(), vec![2], None).await.unwrap();
        let found = registry.lookup(&"b3-a".into(), &"bob".into()).await.unwrap().unwrap();
        assert_eq!(found.grant_id, fresh.grant_id);
    }

    #[tokio::test]
    async fn test_grants_report_state() {
        let (registry, clock) = setup();
        register(&registry, "b3-a").await;
        registry.grant(&"b3-a".into(), &"bob".into(), vec![1], Some(1)).await.unwrap();
        registry.grant(&"b3-a".into(), &"carol".into(), vec![1], None).await.unwrap();
        registry.grant(&"b3-a".into(), &"dave".into(), vec![1], None).await.unwrap();
        registry.revoke(&"b3-a".into(), &"dave".into()).await.unwrap();
        clock.advance(Duration::from_secs(120));

        let states: Vec<_> = registry
            .grants(&"b3-a".into())
            .await
            .unwrap()
            .into_iter()
            .map(|s| (s.grant.principal_id.as_str().to_string(), s.state))
            .collect();
        assert_eq!(
            states,
            vec![
                ("bob".to_string(), GrantState::Expired),
                ("carol".to_string(), GrantState::Active),
                ("dave".to_string(), GrantState::Revoked),
            ]
        );
    }
}
