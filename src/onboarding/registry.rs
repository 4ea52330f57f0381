use dashmap::DashMap;
use poise::serenity_prelude::UserId;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Outcome of waiting for a member's next DM
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Message(String),
    /// Nothing arrived within the deadline
    Timeout,
    /// The registry dropped the session (member left or rejoined)
    Closed,
}

/// Registry entry for a member in onboarding
#[derive(Debug)]
struct ActiveSession {
    generation: u64,
    inbox: mpsc::Sender<String>,
}

/// Receiving end handed to the task that drives a session
#[derive(Debug)]
pub struct SessionInbox {
    member_id: UserId,
    generation: u64,
    rx: mpsc::Receiver<String>,
    /// Set once a reply has been consumed; from then on leftovers are stale
    replied: bool,
}

impl SessionInbox {
    /// Wait for the next DM routed to this session, up to `timeout`
    pub async fn next_reply(&mut self, timeout: Duration) -> Reply {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(text)) => {
                self.replied = true;
                Reply::Message(text)
            }
            Ok(None) => Reply::Closed,
            Err(_) => Reply::Timeout,
        }
    }

    /// Drop messages that arrived after the last reply but before the next prompt.
    /// Messages buffered before the first prompt are kept.
    pub fn discard_stale(&mut self) -> usize {
        if !self.replied {
            return 0;
        }
        let mut dropped = 0;
        while self.rx.try_recv().is_ok() {
            dropped += 1;
        }
        if dropped > 0 {
            debug!(
                "Discarded {} stale message(s) from {}",
                dropped, self.member_id
            );
        }
        dropped
    }
}

/// Process-wide map of members currently onboarding
pub struct SessionRegistry {
    sessions: DashMap<UserId, ActiveSession>,
    next_generation: AtomicU64,
    capacity: usize,
}

impl SessionRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            sessions: DashMap::new(),
            next_generation: AtomicU64::new(1),
            capacity: capacity.max(1),
        }
    }

    /// Register a new session, replacing (and thereby closing) any previous one
    pub fn register(&self, member_id: UserId) -> SessionInbox {
        let (tx, rx) = mpsc::channel(self.capacity);
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);

        let previous = self.sessions.insert(
            member_id,
            ActiveSession {
                generation,
                inbox: tx,
            },
        );
        if previous.is_some() {
            debug!("Replaced existing onboarding session for {}", member_id);
        }

        SessionInbox {
            member_id,
            generation,
            rx,
            replied: false,
        }
    }

    /// Hand a DM to the member's session. Returns false if there is none.
    pub fn route(&self, member_id: UserId, text: &str) -> bool {
        let Some(session) = self.sessions.get(&member_id) else {
            return false;
        };

        match session.inbox.try_send(text.to_string()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Inbox full for {}, dropping message", member_id);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    pub fn is_active(&self, member_id: UserId) -> bool {
        self.sessions.contains_key(&member_id)
    }

    /// Whether `inbox` still belongs to the member's registered session
    pub fn is_current(&self, inbox: &SessionInbox) -> bool {
        self.sessions
            .get(&inbox.member_id)
            .map(|s| s.generation == inbox.generation)
            .unwrap_or(false)
    }

    /// Remove the session owned by `inbox`; a newer session for the same member is left alone
    pub fn finish(&self, inbox: &SessionInbox) -> bool {
        self.sessions
            .remove_if(&inbox.member_id, |_, s| s.generation == inbox.generation)
            .is_some()
    }

    /// Drop whatever session the member has, closing its inbox
    pub fn purge(&self, member_id: UserId) -> bool {
        let removed = self.sessions.remove(&member_id).is_some();
        if removed {
            debug!("Purged onboarding session for {}", member_id);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
