use crate::constants::ONE_WAY_CORRELATION_ID;
use crate::rpc::{RpcError, RpcResponseMessage};
use crate::utils::increment_u32_id;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Invoked with the matching response, on the initiating endpoint's
/// scheduler.
pub type RpcResponseHandler = Box<dyn FnOnce(RpcResponseMessage) + Send>;

pub struct RpcPendingCall {
    handler: RpcResponseHandler,
    pub member_id: u64,
    pub issued_at: DateTime<Utc>,
}

impl RpcPendingCall {
    pub fn complete(self, response: RpcResponseMessage) {
        (self.handler)(response)
    }

    pub fn age_ms(&self, now: DateTime<Utc>) -> i64 {
        (now - self.issued_at).num_milliseconds()
    }
}

/// Outstanding calls of one endpoint, keyed by correlation id.
///
/// Each entry is removed exactly once: when its response arrives, or when
/// the endpoint abandons everything at teardown.
pub struct RpcPendingCalls {
    next_id: u32,
    calls: HashMap<u32, RpcPendingCall>,
}

impl Default for RpcPendingCalls {
    fn default() -> Self {
        Self::new()
    }
}

impl RpcPendingCalls {
    pub fn new() -> Self {
        Self {
            next_id: ONE_WAY_CORRELATION_ID,
            calls: HashMap::new(),
        }
    }

    /// Allocates the next free correlation id. Wraps around, never yields
    /// the one-way id, and skips ids that are still outstanding.
    pub fn next_correlation_id(&mut self) -> u32 {
        loop {
            self.next_id = increment_u32_id(self.next_id);
            if !self.calls.contains_key(&self.next_id) {
                return self.next_id;
            }
        }
    }

    /// Records a call under an explicit id.
    ///
    /// Reusing an id that is still pending is a bug in the caller and fails
    /// loudly in debug builds.
    pub fn insert(
        &mut self,
        correlation_id: u32,
        member_id: u64,
        handler: RpcResponseHandler,
    ) -> Result<(), RpcError> {
        let duplicate =
            correlation_id == ONE_WAY_CORRELATION_ID || self.calls.contains_key(&correlation_id);
        debug_assert!(
            !duplicate,
            "correlation id {} reused while pending",
            correlation_id
        );
        if duplicate {
            return Err(RpcError::DuplicateCorrelation { correlation_id });
        }

        self.calls.insert(
            correlation_id,
            RpcPendingCall {
                handler,
                member_id,
                issued_at: Utc::now(),
            },
        );
        Ok(())
    }

    /// Allocates an id and records the call under it.
    pub fn register(&mut self, member_id: u64, handler: RpcResponseHandler) -> u32 {
        let correlation_id = self.next_correlation_id();
        self.calls.insert(
            correlation_id,
            RpcPendingCall {
                handler,
                member_id,
                issued_at: Utc::now(),
            },
        );
        correlation_id
    }

    pub fn take(&mut self, correlation_id: u32) -> Option<RpcPendingCall> {
        self.calls.remove(&correlation_id)
    }

    /// Drops every pending call without completing it. Returns how many
    /// were dropped.
    pub fn abandon_all(&mut self, owner: &str) -> usize {
        let now = Utc::now();
        let count = self.calls.len();

        for (correlation_id, call) in self.calls.drain() {
            tracing::warn!(
                "[{}] Abandoning call {} to member {:#018x} after {} ms",
                owner,
                correlation_id,
                call.member_id,
                call.age_ms(now)
            );
        }

        count
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}
