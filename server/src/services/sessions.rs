//! In-memory login sessions
//!
//! Maps random bearer tokens to user IDs. Sessions expire after a fixed
//! lifetime and are lost on restart.

use crate::config::SESSION_TTL_HOURS;
use crate::database::UserId;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

const TOKEN_BYTES: usize = 32;

#[derive(Debug, Clone, Copy)]
struct Session {
    user_id: UserId,
    expires_at: DateTime<Utc>,
}

impl Session {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    ttl: Duration,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_ttl(Duration::hours(SESSION_TTL_HOURS))
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Start a session for `user_id` and return its token.
    ///
    /// Expired sessions are purged on the way in, so abandoned logins do not
    /// accumulate.
    pub async fn open(&self, user_id: UserId) -> String {
        let token = generate_token();
        let now = Utc::now();

        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| session.is_fresh(now));
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::debug!(removed, "Purged expired sessions");
        }

        sessions.insert(
            token.clone(),
            Session {
                user_id,
                expires_at: now + self.ttl,
            },
        );

        tracing::debug!("Opened session for user: {}", user_id);
        token
    }

    /// The user behind a live token. An expired token is evicted.
    pub async fn resolve(&self, token: &str) -> Option<UserId> {
        let now = Utc::now();

        let session = self.sessions.read().await.get(token).copied()?;
        if session.is_fresh(now) {
            return Some(session.user_id);
        }

        self.sessions.write().await.remove(token);
        tracing::debug!("Session expired for user: {}", session.user_id);
        None
    }

    pub async fn close(&self, token: &str) {
        if let Some(session) = self.sessions.write().await.remove(token) {
            tracing::debug!("Closed session for user: {}", session.user_id);
        }
    }

    /// Drop every session belonging to `user_id`
    pub async fn close_all_for(&self, user_id: UserId) {
        self.sessions
            .write()
            .await
            .retain(|_, session| session.user_id != user_id);
    }

    /// Number of sessions currently held, expired ones included
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}
