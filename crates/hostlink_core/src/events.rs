//! Authentication state listeners.

use crate::types::{AuthEvent, Session};
use parking_lot::Mutex;
use std::sync::{Arc, Weak};

type Listener = Arc<dyn Fn(AuthEvent, Option<&Session>) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<(u64, Listener)>,
}

/// Ordered set of auth state listeners.
///
/// Listeners run in registration order. The registry lock is released
/// before any listener runs, so a listener may subscribe or unsubscribe.
#[derive(Clone, Default)]
pub struct AuthListeners {
    inner: Arc<Mutex<Registry>>,
}

impl AuthListeners {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener.
    pub fn subscribe<F>(&self, callback: F) -> AuthSubscription
    where
        F: Fn(AuthEvent, Option<&Session>) + Send + Sync + 'static,
    {
        let mut registry = self.inner.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.push((id, Arc::new(callback)));

        AuthSubscription {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Delivers `event` to every listener registered at the time of the call.
    pub fn emit(&self, event: AuthEvent, session: Option<&Session>) {
        let snapshot: Vec<Listener> = self
            .inner
            .lock()
            .listeners
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        tracing::debug!(event = event.as_str(), listeners = snapshot.len(), "auth state change");
        for listener in snapshot {
            listener(event, session);
        }
    }

    /// Returns the number of registered listeners.
    pub fn len(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    /// Returns true if no listener is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle returned by [`crate::BackendFacade::on_auth_state_change`].
///
/// Dropping the handle leaves the listener registered; call
/// [`AuthSubscription::unsubscribe`] to remove it.
#[derive(Debug)]
pub struct AuthSubscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl AuthSubscription {
    /// Removes the listener. Returns false if it was already gone.
    pub fn unsubscribe(&self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let mut registry = registry.lock();
        let before = registry.listeners.len();
        registry.listeners.retain(|(id, _)| *id != self.id);
        registry.listeners.len() != before
    }

    /// Returns true while the listener is registered.
    pub fn is_active(&self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let registry = registry.lock();
        registry.listeners.iter().any(|(id, _)| *id == self.id)
    }
}
