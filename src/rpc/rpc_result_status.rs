use num_enum::{IntoPrimitive, TryFromPrimitive};

#[repr(u8)]
#[derive(Debug, Copy, Clone, Eq, PartialEq, TryFromPrimitive, IntoPrimitive)]
pub enum RpcResultStatus {
    Success = 0,
    /// The implementation returned an error or panicked.
    Fault = 1,
    /// No binding for the contract exists on the responder.
    UnknownContract = 2,
    /// The contract is bound but has no member with the requested id.
    UnknownMember = 3,
    /// The call's arguments could not be decoded by the responder.
    DecodeFailure = 4,
}

impl RpcResultStatus {
    #[inline]
    pub fn is_success(self) -> bool {
        self == RpcResultStatus::Success
    }
}
