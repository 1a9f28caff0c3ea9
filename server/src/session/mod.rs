use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use rocket::futures::stream::SplitSink;
use rocket::futures::{SinkExt, future::join_all};
use rocket_ws::Message;
use rocket_ws::stream::DuplexStream;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};
use uuid::Uuid;

use multisweeper_common::models::GameCode;
use multisweeper_common::protocol::GameEvent;

pub type WsSink = SplitSink<DuplexStream, Message>;
pub type ConnectionId = Uuid;

pub struct SessionRegistry {
    sessions: DashMap<GameCode, Arc<Session>>,
}

pub struct Session {
    state: Arc<Mutex<SessionState>>,
}

pub struct SessionState {
    code: GameCode,
    connections: HashMap<ConnectionId, WsSink>,
    closed: bool,
    last_activity: Instant,
}

impl SessionState {
    fn new(code: GameCode) -> Self {
        Self {
            code,
            connections: HashMap::new(),
            closed: false,
            last_activity: Instant::now(),
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    // Set when the session was removed from the registry; a caller holding
    // a closed guard must re-acquire through the registry.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub async fn register(&mut self, mut sink: WsSink, welcome: &GameEvent) -> ConnectionId {
        let id = Uuid::new_v4();
        send(self.code, &id, &mut sink, welcome).await;
        self.connections.insert(id, sink);
        self.touch();
        info!(
            "Connection {} joined game {}, total connections: {}",
            id,
            self.code,
            self.connections.len()
        );
        id
    }

    pub fn remove(&mut self, id: &ConnectionId) {
        if self.connections.remove(id).is_none() {
            debug!("Connection {} of game {} was already removed", id, self.code);
        }
        self.touch();
    }

    pub async fn send_to(&mut self, id: &ConnectionId, event: &GameEvent) {
        if let Some(sink) = self.connections.get_mut(id) {
            send(self.code, id, sink, event).await;
        }
    }

    pub async fn broadcast(&mut self, event: &GameEvent) {
        let code = self.code;
        let sends: Vec<_> = self
            .connections
            .iter_mut()
            .map(|(id, sink)| send(code, id, sink, event))
            .collect();
        join_all(sends).await;
    }

    fn should_reap(&self, now: Instant, idle_timeout: Duration, stale_timeout: Duration) -> bool {
        let inactive = now.duration_since(self.last_activity);
        if self.connections.is_empty() {
            inactive > idle_timeout
        } else {
            inactive > stale_timeout
        }
    }
}

async fn send(code: GameCode, id: &ConnectionId, sink: &mut WsSink, event: &GameEvent) {
    match serde_json::to_string(event) {
        Ok(text) => {
            if let Err(error) = sink.send(Message::Text(text)).await {
                debug!(
                    "Failed to send to connection {} of game {}: {}",
                    id, code, error
                );
            }
        }
        Err(error) => warn!("Failed to serialize event for game {}: {}", code, error),
    }
}

// One-shot delivery to a sink that never joined a session.
pub async fn send_once(mut sink: WsSink, event: &GameEvent) {
    if let Ok(text) = serde_json::to_string(event) {
        if let Err(error) = sink.send(Message::Text(text)).await {
            debug!("Failed to deliver event to a closing connection: {}", error);
        }
    }
}

impl Session {
    fn new(code: GameCode) -> Self {
        Self {
            state: Arc::new(Mutex::new(SessionState::new(code))),
        }
    }

    pub async fn lock_owned(&self) -> OwnedMutexGuard<SessionState> {
        self.state.clone().lock_owned().await
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    // The returned session may have been closed by a concurrent teardown;
    // check is_closed after locking and retry when it is set.
    pub fn get_or_create(&self, code: GameCode) -> Arc<Session> {
        self.sessions
            .entry(code)
            .or_insert_with(|| Arc::new(Session::new(code)))
            .clone()
    }

    pub async fn detach(&self, code: GameCode, id: ConnectionId) {
        let Some(session) = self
            .sessions
            .get(&code)
            .map(|entry| entry.value().clone())
        else {
            debug!("Detach from game {} without a session", code);
            return;
        };

        let mut state = session.lock_owned().await;
        state.remove(&id);
        if state.connection_count() == 0 {
            state.closed = true;
            drop(state);
            // Only remove the entry we decided to close; a concurrent
            // get_or_create may already have replaced it.
            self.sessions
                .remove_if(&code, |_, entry| Arc::ptr_eq(entry, &session));
            info!("Session of game {} torn down after the last disconnect", code);
        }
    }

    // Empty sessions go after idle_timeout; sessions whose connections went
    // silent without detaching go after stale_timeout.
    pub fn reap_stale(&self, idle_timeout: Duration, stale_timeout: Duration) -> usize {
        let now = Instant::now();
        let mut reaped = 0;
        self.sessions.retain(|code, session| {
            // A held lock means the session is in use right now.
            let Ok(mut state) = session.state.try_lock() else {
                return true;
            };
            if state.should_reap(now, idle_timeout, stale_timeout) {
                state.closed = true;
                debug!("Reaped stale session of game {}", code);
                reaped += 1;
                false
            } else {
                true
            }
        });
        reaped
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}
