use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::future::join_all;
use log::{error, info, warn};

use crate::backend::{DebugBackend, PlSourceProvider};
use crate::config::DebugConfig;
use crate::debugger::session::DebugSession;

/// Clears the creating flag of a tab when creation finishes, however it ends
struct CreatingGuard<'a> {
    creating: &'a Mutex<HashMap<String, bool>>,
    tab_key: String,
}

impl<'a> CreatingGuard<'a> {
    fn start(creating: &'a Mutex<HashMap<String, bool>>, tab_key: &str) -> Self {
        lock(creating).insert(tab_key.to_string(), true);
        Self {
            creating,
            tab_key: tab_key.to_string(),
        }
    }
}

impl Drop for CreatingGuard<'_> {
    fn drop(&mut self) {
        lock(self.creating).insert(self.tab_key.clone(), false);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Registry of open debug sessions, one per UI tab.
///
/// A removed tab keeps its key with an empty slot, so "never opened" and
/// "opened then closed" stay distinguishable.
pub struct DebugSessionPool {
    backend: Arc<dyn DebugBackend>,
    source: Arc<dyn PlSourceProvider>,
    sessions: Mutex<HashMap<String, Option<Arc<DebugSession>>>>,
    creating: Mutex<HashMap<String, bool>>,
}

impl DebugSessionPool {
    pub fn new(backend: Arc<dyn DebugBackend>, source: Arc<dyn PlSourceProvider>) -> Self {
        Self {
            backend,
            source,
            sessions: Mutex::new(HashMap::new()),
            creating: Mutex::new(HashMap::new()),
        }
    }

    /// Create a session for a tab. Failures are logged and yield `None`.
    pub async fn new_debug(&self, config: DebugConfig, tab_key: &str) -> Option<Arc<DebugSession>> {
        let _creating = CreatingGuard::start(&self.creating, tab_key);

        let session = match DebugSession::create(config, Arc::clone(&self.backend), Arc::clone(&self.source)).await {
            Ok(session) => Arc::new(session),
            Err(e) => {
                error!("Failed to start debugging in tab {}: {}", tab_key, e);
                return None;
            }
        };
        info!("Tab {} debugging session {}", tab_key, session.id());

        let replaced = lock(&self.sessions).insert(tab_key.to_string(), Some(Arc::clone(&session)));
        if let Some(Some(previous)) = replaced {
            if !previous.is_debug_end() {
                warn!("Tab {} replaced a running session {}", tab_key, previous.id());
                previous.dispose().await;
            }
        }
        Some(session)
    }

    /// Close a tab's session, disposing it if it is still running
    pub async fn remove_debug(&self, tab_key: &str) {
        let existing = lock(&self.sessions).get(tab_key).cloned().flatten();
        if let Some(session) = existing {
            if !session.is_debug_end() {
                session.dispose().await;
            }
        }
        lock(&self.sessions).insert(tab_key.to_string(), None);
    }

    /// Live session of a tab
    pub fn get_debug(&self, tab_key: &str) -> Option<Arc<DebugSession>> {
        lock(&self.sessions).get(tab_key).cloned().flatten()
    }

    /// Whether a session was ever stored for the tab, even if since removed
    pub fn has_entry(&self, tab_key: &str) -> bool {
        lock(&self.sessions).contains_key(tab_key)
    }

    pub fn is_creating(&self, tab_key: &str) -> bool {
        lock(&self.creating).get(tab_key).copied().unwrap_or(false)
    }

    /// Tabs holding a live session
    pub fn open_tabs(&self) -> Vec<String> {
        let mut tabs: Vec<String> = lock(&self.sessions)
            .iter()
            .filter(|(_, slot)| slot.is_some())
            .map(|(key, _)| key.clone())
            .collect();
        tabs.sort();
        tabs
    }

    /// Dispose every live session and leave all tabs empty
    pub async fn shutdown(&self) {
        let live: Vec<(String, Arc<DebugSession>)> = lock(&self.sessions)
            .iter_mut()
            .filter_map(|(key, slot)| slot.take().map(|session| (key.clone(), session)))
            .collect();
        let pending = live
            .into_iter()
            .filter(|(_, session)| !session.is_debug_end())
            .map(|(tab_key, session)| async move {
                info!("Disposing session {} of tab {}", session.id(), tab_key);
                session.dispose().await
            });
        join_all(pending).await;
    }
}
