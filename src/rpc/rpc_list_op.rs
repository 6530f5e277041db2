use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Mutation carried by a list delta.
///
/// `Insert` and `Set` carry the encoded element as payload; `Remove` and
/// `Clear` carry none.
#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, TryFromPrimitive, IntoPrimitive)]
pub enum RpcListOp {
    Insert = 0,
    Remove = 1,
    Set = 2,
    Clear = 3,
}

impl RpcListOp {
    #[inline]
    pub fn carries_value(self) -> bool {
        matches!(self, RpcListOp::Insert | RpcListOp::Set)
    }
}
