//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use vaultgate::core::{ManualClock, Role, SigningKeypair};
use vaultgate::perms::{KeyPairIssuer, Principal, PrincipalSecret};
use vaultgate::store::{MemoryStore, RecordStore};
use vaultgate::{
    ContentStore, Kernel, KernelConfig, MemoryContentStore, Notification, NotificationQueue,
    Notifier, RetryPolicy,
};

/// Start time of every fixture clock (2023-11-14T22:13:20Z).
pub const FIXTURE_EPOCH: i64 = 1_700_000_000_000;

/// Seed of the fixture's audit signing key.
pub const AUDIT_SEED: [u8; 32] = [0xA5; 32];

/// A principal together with its secret.
#[derive(Debug)]
pub struct Party {
    pub principal: Principal,
    pub secret: PrincipalSecret,
}

impl Party {
    pub fn new(name: &str, role: Role) -> Self {
        let keys = KeyPairIssuer::generate_key_pair();
        Self {
            principal: Principal::new(name, role, keys.public),
            secret: keys.secret,
        }
    }
}

/// Config with millisecond retries and a short audit timeout.
pub fn fast_config() -> KernelConfig {
    KernelConfig::default()
        .with_retry(RetryPolicy::fixed(Duration::from_millis(1)))
        .with_audit_timeout(Duration::from_millis(250))
}

/// A kernel on a manual clock with deterministic audit signing.
pub struct TestFixture<S: RecordStore = MemoryStore> {
    pub kernel: Kernel<S>,
    pub clock: ManualClock,
    pub content: Arc<dyn ContentStore>,
}

impl TestFixture<MemoryStore> {
    /// In-memory record and content stores.
    pub fn new() -> Self {
        Self::build(MemoryStore::new(), Arc::new(MemoryContentStore::new()), fast_config(), None)
    }

    /// Like [`new`](Self::new), plus a notification queue of `capacity`.
    pub fn with_notifications(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (queue, rx) = NotificationQueue::bounded(capacity);
        let fixture = Self::build(
            MemoryStore::new(),
            Arc::new(MemoryContentStore::new()),
            fast_config(),
            Some(queue),
        );
        (fixture, rx)
    }
}

impl<S: RecordStore> TestFixture<S> {
    /// Assemble a fixture around the given stores.
    pub fn build(
        store: S,
        content: Arc<dyn ContentStore>,
        config: KernelConfig,
        notifications: Option<NotificationQueue>,
    ) -> Self {
        let clock = ManualClock::new(FIXTURE_EPOCH);
        let mut builder = Kernel::builder(SigningKeypair::from_seed(&AUDIT_SEED), store, content.clone())
            .clock(Arc::new(clock.clone()))
            .config(config);
        if let Some(queue) = notifications {
            builder = builder.notifications(queue);
        }
        Self {
            kernel: builder.build(),
            clock,
            content,
        }
    }

    pub fn advance_minutes(&self, minutes: u64) {
        self.clock.advance(Duration::from_secs(minutes * 60));
    }

    pub fn advance_millis(&self, millis: u64) {
        self.clock.advance(Duration::from_millis(millis));
    }
}

impl Default for TestFixture<MemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

/// Create parties with distinct names for multi-party tests.
pub fn multi_party(role: Role, count: usize) -> Vec<Party> {
    (0..count)
        .map(|i| Party::new(&format!("{}-{i}", role.as_str()), role))
        .collect()
}

/// Notifier that remembers everything it was asked to deliver.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    received: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn received(&self) -> Vec<Notification> {
        self.received.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> anyhow::Result<()> {
        self.received
            .lock()
            .map_err(|e| anyhow::anyhow!("recorder poisoned: {e}"))?
            .push(notification.clone());
        Ok(())
    }
}
