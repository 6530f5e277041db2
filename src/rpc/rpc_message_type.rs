use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Leading byte of every message exchanged between two endpoints.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
pub enum RpcMessageType {
    Call = 0,
    Response = 1,
    ListDelta = 2,
}
