use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

static SESSION_COUNTER: AtomicU64 = AtomicU64::new(0);

pub const DEFAULT_SESSION_TTL_SECS: u64 = 3600;

pub type SessionId = String;

#[derive(Debug, thiserror::Error)]
#[error("session not found: {0}")]
pub struct SessionNotFound(pub SessionId);

struct Entry<S> {
    context: Arc<Mutex<S>>,
    last_touch: Instant,
}

/// In-memory per-user contexts keyed by an opaque session id.
///
/// Each context sits behind its own mutex; a caller holds it for the whole interaction,
/// so interactions on one session never interleave. Sessions idle for longer than the
/// TTL are dropped: lazily on lookup, and in a sweep whenever a session starts.
pub struct SessionStore<S> {
    sessions: Arc<RwLock<HashMap<SessionId, Entry<S>>>>,
    ttl: Duration,
}

impl<S> Clone for SessionStore<S> {
    fn clone(&self) -> Self {
        Self {
            sessions: Arc::clone(&self.sessions),
            ttl: self.ttl,
        }
    }
}

impl<S: Default> SessionStore<S> {
    /// Idle TTL from `SESSION_TTL_SECS`, default one hour.
    pub fn new() -> Self {
        let ttl_secs = std::env::var("SESSION_TTL_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_SESSION_TTL_SECS);
        Self::with_ttl(Duration::from_secs(ttl_secs))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn start(&self) -> SessionId {
        let id = new_session_id();
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;

        let before = sessions.len();
        sessions.retain(|_, entry| now.duration_since(entry.last_touch) <= self.ttl);
        let expired = before - sessions.len();
        if expired > 0 {
            debug!(expired, "dropped idle sessions");
        }

        sessions.insert(
            id.clone(),
            Entry {
                context: Arc::new(Mutex::new(S::default())),
                last_touch: now,
            },
        );
        id
    }

    /// Drop the session. Returns whether it existed.
    pub async fn end(&self, session_id: &str) -> bool {
        self.sessions.write().await.remove(session_id).is_some()
    }

    /// Hand out the session context and mark it as used.
    pub async fn session(&self, session_id: &str) -> Result<Arc<Mutex<S>>, SessionNotFound> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        let entry = sessions
            .get_mut(session_id)
            .ok_or_else(|| SessionNotFound(session_id.to_string()))?;
        if now.duration_since(entry.last_touch) > self.ttl {
            sessions.remove(session_id);
            debug!(session_id, "session expired");
            return Err(SessionNotFound(session_id.to_string()));
        }
        entry.last_touch = now;
        Ok(Arc::clone(&entry.context))
    }

    /// Run one synchronous interaction against the session context.
    pub async fn with_session<R>(
        &self,
        session_id: &str,
        f: impl FnOnce(&mut S) -> R,
    ) -> Result<R, SessionNotFound> {
        let session = self.session(session_id).await?;
        let mut guard = session.lock().await;
        Ok(f(&mut guard))
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

impl<S: Default> Default for SessionStore<S> {
    fn default() -> Self {
        Self::new()
    }
}

fn new_session_id() -> SessionId {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0));
    let counter = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed);
    let pid = std::process::id();

    let mut h = Sha256::new();
    h.update(now.as_nanos().to_le_bytes());
    h.update(pid.to_le_bytes());
    h.update(counter.to_le_bytes());
    let digest = h.finalize();
    hex_lower(&digest[..16])
}

fn hex_lower(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(HEX[(b >> 4) as usize] as char);
        out.push(HEX[(b & 0x0f) as usize] as char);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn start_and_end() {
        let store: SessionStore<Vec<u8>> = SessionStore::with_ttl(Duration::from_secs(60));
        let a = store.start().await;
        let b = store.start().await;
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert_eq!(store.len().await, 2);

        store.with_session(&a, |s| s.push(7)).await.unwrap();
        assert_eq!(store.with_session(&a, |s| s.clone()).await.unwrap(), vec![7]);
        assert!(store.with_session(&b, |s| s.is_empty()).await.unwrap());

        assert!(store.end(&a).await);
        assert!(!store.end(&a).await);
        assert!(store.with_session(&a, |_| ()).await.is_err());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn idle_session_expires() {
        let store: SessionStore<Vec<u8>> = SessionStore::with_ttl(Duration::from_millis(20));
        let idle = store.start().await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        let err = store.session(&idle).await.err().unwrap();
        assert_eq!(err.0, idle);
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn start_sweeps_idle_sessions() {
        let store: SessionStore<Vec<u8>> = SessionStore::with_ttl(Duration::from_millis(20));
        let idle = store.start().await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        let fresh = store.start().await;
        assert_eq!(store.len().await, 1);
        assert!(store.with_session(&idle, |_| ()).await.is_err());
        assert!(store.with_session(&fresh, |_| ()).await.is_ok());
    }

    #[test]
    fn hex_encoding() {
        assert_eq!(hex_lower(&[0x00, 0xab, 0x0f]), "00ab0f");
    }
}
