//! Scoped lifetimes.
//!
//! A [`LifetimeDefinition`] owns a scope; the [`Lifetime`] views it hands
//! out let other components attach teardown work to that scope. Ending the
//! scope (explicitly, or by dropping the definition) runs the attached
//! callbacks once, newest first.

use crate::utils::{lock_or_recover, panic_message};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex, Weak};

type EndedCallback = Box<dyn FnOnce() + Send>;

struct LifetimeState {
    alive: bool,
    next_key: u64,
    callbacks: Vec<(u64, EndedCallback)>,
    /// The parent's callback that would end this scope, if nested.
    parent: Option<(Weak<LifetimeInner>, u64)>,
}

struct LifetimeInner {
    name: String,
    state: Mutex<LifetimeState>,
}

impl LifetimeInner {
    /// Registers `callback`, returning its key, or hands it back if the scope
    /// has already ended.
    fn register(&self, callback: EndedCallback) -> Result<u64, EndedCallback> {
        let mut state = lock_or_recover(&self.state);
        if !state.alive {
            return Err(callback);
        }
        let key = state.next_key;
        state.next_key += 1;
        state.callbacks.push((key, callback));
        Ok(key)
    }

    fn unregister(&self, key: u64) {
        lock_or_recover(&self.state)
            .callbacks
            .retain(|(registered, _)| *registered != key);
    }

    fn terminate(&self) {
        let (callbacks, parent) = {
            let mut state = lock_or_recover(&self.state);
            if !state.alive {
                return;
            }
            state.alive = false;
            (std::mem::take(&mut state.callbacks), state.parent.take())
        };

        if let Some((parent, key)) = parent {
            if let Some(parent) = parent.upgrade() {
                parent.unregister(key);
            }
        }

        tracing::debug!(
            "Lifetime `{}` ended; running {} callbacks",
            self.name,
            callbacks.len()
        );

        for (_, callback) in callbacks.into_iter().rev() {
            if let Err(payload) = catch_unwind(AssertUnwindSafe(callback)) {
                tracing::error!(
                    "Lifetime `{}` callback panicked: {}",
                    self.name,
                    panic_message(payload.as_ref())
                );
            }
        }
    }
}

/// A shared, read-only view of a scope.
#[derive(Clone)]
pub struct Lifetime {
    inner: Arc<LifetimeInner>,
}

impl Lifetime {
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn is_alive(&self) -> bool {
        lock_or_recover(&self.inner.state).alive
    }

    /// Registers `callback` to run when the scope ends. If it has already
    /// ended, `callback` runs right away on the calling thread.
    pub fn on_ended<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if let Err(callback) = self.inner.register(Box::new(callback)) {
            callback();
        }
    }

    /// A child scope that ends no later than this one. A child that ends
    /// first drops its registration on this scope.
    pub fn create_nested(&self, name: impl Into<String>) -> LifetimeDefinition {
        let child = LifetimeDefinition::new(name);
        let weak: Weak<LifetimeInner> = Arc::downgrade(&child.lifetime.inner);
        let end_child: EndedCallback = Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.terminate();
            }
        });

        match self.inner.register(end_child) {
            Ok(key) => {
                lock_or_recover(&child.lifetime.inner.state).parent =
                    Some((Arc::downgrade(&self.inner), key));
            }
            Err(end_child) => end_child(),
        }
        child
    }

    #[cfg(test)]
    fn registered_callbacks(&self) -> usize {
        lock_or_recover(&self.inner.state).callbacks.len()
    }
}

impl std::fmt::Debug for Lifetime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lifetime")
            .field("name", &self.inner.name)
            .field("alive", &self.is_alive())
            .finish()
    }
}

/// The owner of a scope. Dropping it ends the scope.
pub struct LifetimeDefinition {
    lifetime: Lifetime,
}

impl LifetimeDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            lifetime: Lifetime {
                inner: Arc::new(LifetimeInner {
                    name: name.into(),
                    state: Mutex::new(LifetimeState {
                        alive: true,
                        next_key: 0,
                        callbacks: Vec::new(),
                        parent: None,
                    }),
                }),
            },
        }
    }

    pub fn lifetime(&self) -> Lifetime {
        self.lifetime.clone()
    }

    pub fn is_alive(&self) -> bool {
        self.lifetime.is_alive()
    }

    /// Ends the scope. Idempotent.
    pub fn terminate(&self) {
        self.lifetime.inner.terminate();
    }
}

impl Drop for LifetimeDefinition {
    fn drop(&mut self) {
        self.terminate();
    }
}
