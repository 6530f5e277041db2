use crate::{RpcDispatchTable, RpcListBinder, RpcProxyCore};
use std::any::{TypeId, type_name};
use std::sync::Arc;
use tandem::RpcError;
use tandem::codec::RpcArgs;
use tandem::rpc::RpcCallKind;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RpcMemberKind {
    Call(RpcCallKind),
    /// A replicated list property; never produces call messages.
    List,
}

/// One entry of a contract's member table.
#[derive(Debug, Clone)]
pub struct RpcMemberDescriptor {
    pub name: &'static str,
    pub member_id: u64,
    pub kind: RpcMemberKind,
    /// Argument types in declaration order (the element type for lists).
    pub param_types: Vec<(TypeId, &'static str)>,
    /// `None` for one-way calls and lists.
    pub return_type: Option<(TypeId, &'static str)>,
}

impl RpcMemberDescriptor {
    pub fn call<A: RpcArgs, R: 'static>(name: &'static str, member_id: u64, kind: RpcCallKind) -> Self {
        Self {
            name,
            member_id,
            kind: RpcMemberKind::Call(kind),
            param_types: A::type_ids(),
            return_type: Some((TypeId::of::<R>(), type_name::<R>())),
        }
    }

    pub fn oneway<A: RpcArgs>(name: &'static str, member_id: u64) -> Self {
        Self {
            name,
            member_id,
            kind: RpcMemberKind::Call(RpcCallKind::OneWay),
            param_types: A::type_ids(),
            return_type: None,
        }
    }

    pub fn list<T: 'static>(name: &'static str, member_id: u64) -> Self {
        Self {
            name,
            member_id,
            kind: RpcMemberKind::List,
            param_types: vec![(TypeId::of::<T>(), type_name::<T>())],
            return_type: None,
        }
    }

    /// Every type that must have a serializer for this member to work.
    pub fn required_types(&self) -> impl Iterator<Item = &(TypeId, &'static str)> {
        self.param_types.iter().chain(self.return_type.iter())
    }
}

/// A remotely callable interface.
///
/// Implemented by the marker type that [`rpc_contract!`](crate::rpc_contract)
/// generates; there is normally no reason to implement it by hand.
pub trait RpcContract: 'static {
    /// The interface trait object, e.g. `dyn Calculator`.
    type Interface: ?Sized + Send + Sync + 'static;

    /// The caller-side type implementing the interface over the wire.
    type Proxy: Send + Sync + 'static;

    const NAME: &'static str;

    const CONTRACT_ID: u64;

    fn members() -> Vec<RpcMemberDescriptor>;

    /// Builds the member-id to handler table for one bound implementation.
    fn dispatch_table(implementation: Arc<Self::Interface>) -> RpcDispatchTable;

    /// Links the implementation's replicated lists to the binding endpoint.
    fn bind_lists(
        implementation: &Self::Interface,
        binder: &mut RpcListBinder<'_>,
    ) -> Result<(), RpcError>;

    fn create_proxy(core: RpcProxyCore) -> Result<Self::Proxy, RpcError>;
}
