//! Multi-turn chat sessions.
//!
//! A [`SessionManager`] keeps one [`ChatSession`] per session key and
//! forwards each message to a [`ChatBackend`] together with the session's
//! history. The key is a fixed shared key or the caller's user id,
//! depending on [`Scope`].
//!
//! Sends on one session are serialized by a per-session mutex held for
//! the whole upstream call. The user turn and the model reply are
//! appended only after the backend succeeds, so a failed or cancelled
//! send leaves the history untouched.
//!
//! History is bounded by [`SessionConfig::max_turns`]. Only the newest user
//! turn keeps its image; older turns are replayed as text, which already
//! carries the image analysis.

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use agrigate_core::defaults;
use agrigate_core::{
    ChatBackend, ChatTurn, GenerationConfig, ImagePayload, Result, SafetySetting, Scope,
};

/// Session configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    pub scope: Scope,
    /// Sessions unused for this long are evicted. Zero disables reaping.
    pub idle_timeout: Duration,
    /// Most turns kept per session. Never below one exchange.
    pub max_turns: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            scope: Scope::Shared,
            idle_timeout: Duration::from_secs(defaults::SESSION_IDLE_SECS),
            max_turns: defaults::SESSION_MAX_TURNS,
        }
    }
}

impl SessionConfig {
    /// Read `SESSION_SCOPE`, `SESSION_IDLE_SECS` and `SESSION_MAX_TURNS`.
    pub fn from_env() -> Self {
        let scope = match std::env::var(defaults::ENV_SESSION_SCOPE) {
            Ok(v) => v.parse().unwrap_or_else(|e| {
                warn!(error = %e, "Ignoring {}", defaults::ENV_SESSION_SCOPE);
                Scope::Shared
            }),
            Err(_) => Scope::Shared,
        };
        let idle_secs = std::env::var(defaults::ENV_SESSION_IDLE_SECS)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults::SESSION_IDLE_SECS);
        let max_turns = std::env::var(defaults::ENV_SESSION_MAX_TURNS)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults::SESSION_MAX_TURNS);
        Self {
            scope,
            idle_timeout: Duration::from_secs(idle_secs),
            max_turns,
        }
    }
}

/// One conversation with the chat model.
#[derive(Debug)]
pub struct ChatSession {
    pub id: Uuid,
    pub history: Vec<ChatTurn>,
    pub config: GenerationConfig,
    pub safety: Vec<SafetySetting>,
    pub created_at: DateTime<Utc>,
    last_used: Instant,
}

impl ChatSession {
    fn new() -> Self {
        Self {
            id: Uuid::now_v7(),
            history: Vec::new(),
            config: GenerationConfig::chat(),
            safety: SafetySetting::chat_defaults(),
            created_at: Utc::now(),
            last_used: Instant::now(),
        }
    }

    /// Time since the session was last created or used.
    pub fn idle_for(&self) -> Duration {
        self.last_used.elapsed()
    }

    /// Append one exchange, then drop the oldest exchanges beyond
    /// `max_turns`.
    fn commit(&mut self, turn: ChatTurn, reply: ChatTurn, max_turns: usize) {
        for earlier in &mut self.history {
            earlier.image = None;
        }
        self.history.push(turn);
        self.history.push(reply);

        let max_turns = max_turns.max(2);
        if self.history.len() > max_turns {
            let excess = self.history.len() - max_turns;
            // Whole user/model pairs only.
            self.history.drain(..excess + excess % 2);
        }
        self.last_used = Instant::now();
    }
}

/// Owns all chat sessions of the process.
pub struct SessionManager {
    backend: Arc<dyn ChatBackend>,
    config: SessionConfig,
    sessions: RwLock<HashMap<String, Arc<Mutex<ChatSession>>>>,
}

impl SessionManager {
    pub fn new(backend: Arc<dyn ChatBackend>, config: SessionConfig) -> Self {
        Self {
            backend,
            config,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn scope(&self) -> Scope {
        self.config.scope
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn model_name(&self) -> &str {
        self.backend.model_name()
    }

    /// Session key used for `user_id`.
    pub fn key_for<'a>(&self, user_id: &'a str) -> &'a str {
        match self.config.scope {
            Scope::Shared => defaults::SHARED_SESSION_KEY,
            Scope::PerUser => user_id,
        }
    }

    async fn session(&self, key: &str) -> Arc<Mutex<ChatSession>> {
        if let Some(session) = self.sessions.read().await.get(key) {
            return Arc::clone(session);
        }

        let mut sessions = self.sessions.write().await;
        let session = sessions.entry(key.to_string()).or_insert_with(|| {
            info!(
                subsystem = "inference",
                component = "session",
                session_key = %key,
                "Creating chat session"
            );
            Arc::new(Mutex::new(ChatSession::new()))
        });
        Arc::clone(session)
    }

    /// Lock the session registered under `key`, starting from `session`.
    ///
    /// The registry lock is released before the session mutex is taken, so
    /// the reaper may evict `session` in between. A session that is no
    /// longer registered is dropped and the lookup repeated.
    async fn lock_current(
        &self,
        key: &str,
        mut session: Arc<Mutex<ChatSession>>,
    ) -> OwnedMutexGuard<ChatSession> {
        loop {
            let guard = Arc::clone(&session).lock_owned().await;
            let registered = self
                .sessions
                .read()
                .await
                .get(key)
                .is_some_and(|current| Arc::ptr_eq(current, &session));
            if registered {
                return guard;
            }
            drop(guard);
            debug!(
                subsystem = "inference",
                component = "session",
                session_key = %key,
                "Session evicted before use, looking up again"
            );
            session = self.session(key).await;
        }
    }

    /// Send a message and return the model's reply.
    ///
    /// Errors are returned raw; callers normalize them. Nothing is
    /// retried on this path.
    pub async fn send(
        &self,
        user_id: &str,
        text: &str,
        image: Option<&ImagePayload>,
    ) -> Result<String> {
        let key = self.key_for(user_id);
        let session = self.session(key).await;
        let mut session = self.lock_current(key, session).await;
        let start = std::time::Instant::now();

        let turn = ChatTurn::user(text, image.cloned());
        let reply = self
            .backend
            .generate_reply(&session.history, &turn, &session.config, &session.safety)
            .await?;

        session.commit(turn, ChatTurn::model(reply.clone()), self.config.max_turns);

        debug!(
            subsystem = "inference",
            component = "session",
            op = "send",
            session_id = %session.id,
            model = %self.backend.model_name(),
            prompt_len = text.len(),
            response_len = reply.len(),
            history_len = session.history.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Chat reply received"
        );
        Ok(reply)
    }

    /// Drop the session for `user_id`. Returns whether one existed.
    pub async fn reset(&self, user_id: &str) -> bool {
        let key = self.key_for(user_id);
        let removed = self.sessions.write().await.remove(key).is_some();
        if removed {
            info!(
                subsystem = "inference",
                component = "session",
                session_key = %key,
                "Chat session reset"
            );
        }
        removed
    }

    /// Session id and history for `user_id`, if a session exists.
    pub async fn snapshot(&self, user_id: &str) -> Option<(Uuid, Vec<ChatTurn>)> {
        let session = {
            let sessions = self.sessions.read().await;
            Arc::clone(sessions.get(self.key_for(user_id))?)
        };
        let session = session.lock().await;
        Some((session.id, session.history.clone()))
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    /// Remove sessions idle for at least `max_idle`. Sessions with a send
    /// in flight are kept. Returns how many were removed.
    pub async fn evict_idle(&self, max_idle: Duration) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| match session.try_lock() {
            Ok(session) => session.idle_for() < max_idle,
            Err(_) => true,
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(
                subsystem = "inference",
                component = "session",
                op = "evict_idle",
                evicted,
                remaining = sessions.len(),
                "Evicted idle chat sessions"
            );
        }
        evicted
    }

    /// Run [`evict_idle`](Self::evict_idle) every `interval` until the
    /// manager is dropped. Returns `None` when `max_idle` is zero.
    pub fn spawn_reaper(
        self: &Arc<Self>,
        interval: Duration,
        max_idle: Duration,
    ) -> Option<JoinHandle<()>> {
        if max_idle.is_zero() || interval.is_zero() {
            return None;
        }
        let manager: Weak<Self> = Arc::downgrade(self);
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                manager.evict_idle(max_idle).await;
            }
        }))
    }
}
