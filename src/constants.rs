// Message header constants

/// Byte offset of the 1-byte message type (u8).
/// Values correspond to enum `RpcMessageType` variants.
pub const RPC_MESSAGE_TYPE_OFFSET: usize = 0;

/// Size of the fixed call header: type (1) + contract id (8) + member id (8)
/// + call kind (1) + correlation id (4).
pub const RPC_CALL_HEADER_SIZE: usize = 22;

/// Size of the fixed response header: type (1) + correlation id (4) + status (1).
pub const RPC_RESPONSE_HEADER_SIZE: usize = 6;

/// Size of the fixed list delta header: type (1) + entity id (8) + op (1)
/// + index (4).
pub const RPC_LIST_DELTA_HEADER_SIZE: usize = 14;

/// Correlation id carried by one-way calls. Never allocated for a pending call.
pub const ONE_WAY_CORRELATION_ID: u32 = 0;

// Scheduling constants

/// How long a blocked synchronous call sleeps between re-checks of its
/// completion and of the endpoint's liveness.
pub const DEFAULT_PUMP_INTERVAL_MS: u64 = 10;

/// Upper bound on how long `shutdown` waits for a scheduler's worker thread
/// to finish its current item before detaching it.
pub const SCHEDULER_JOIN_TIMEOUT_MS: u64 = 2_000;
