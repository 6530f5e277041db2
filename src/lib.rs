//! Lower layer of the tandem RPC toolkit.
//!
//! This crate knows how to turn typed values into bytes and back
//! ([`codec`]), how to frame calls, responses and list deltas
//! ([`rpc`]), and how to run work strictly in order on one dedicated
//! thread per endpoint ([`scheduler`]). Contracts, proxies and bindings
//! live one level up in `tandem-rpc-endpoint`.

pub mod channel;
pub mod codec;
pub mod constants;
pub mod lifetime;
pub mod rpc;
pub mod scheduler;
pub mod utils;

pub use rpc::RpcError;
