use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::any::TypeId;

/// How a caller waits for (or ignores) the outcome of a call.
#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, TryFromPrimitive, IntoPrimitive)]
pub enum RpcCallKind {
    /// The caller blocks until the response has been processed.
    Sync = 0,
    /// Returns a task that completes without a value.
    AsyncVoid = 1,
    /// Returns a task that completes with the decoded result.
    AsyncValue = 2,
    /// Fire and forget: no correlation id, no response.
    OneWay = 3,
}

impl RpcCallKind {
    /// Picks `AsyncVoid` for `()` results and `AsyncValue` otherwise.
    pub fn for_async_result<R: 'static>() -> Self {
        if TypeId::of::<R>() == TypeId::of::<()>() {
            RpcCallKind::AsyncVoid
        } else {
            RpcCallKind::AsyncValue
        }
    }

    #[inline]
    pub fn expects_response(self) -> bool {
        self != RpcCallKind::OneWay
    }
}
