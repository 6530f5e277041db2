//! Contract-driven endpoints for the tandem RPC layer.
//!
//! A contract is declared once with [`rpc_contract!`]. One endpoint binds an
//! implementation of it, the other activates a proxy, and every call made on
//! the proxy is carried over the endpoints' shared channel and dispatched on
//! the binding side's scheduler.

pub use tandem;
pub use tandem::RpcError;
pub use tandem::rpc::RpcTask;

mod binding;
pub use binding::*;

mod contract;
pub use contract::*;

mod contract_macro;

mod endpoint;
pub use endpoint::*;

mod endpoint_config;
pub use endpoint_config::*;

mod proxy;
pub use proxy::*;

mod rpc_list;
pub use rpc_list::*;
