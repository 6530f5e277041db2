use std::collections::HashMap;
use std::sync::Arc;
use tandem::RpcError;
use tandem::codec::RpcArgs;
use tandem::lifetime::Lifetime;
use tandem::rpc::{RpcCallCodec, RpcTask};

/// What a member handler produced for one inbound call.
pub enum RpcReply {
    /// The encoded result, available immediately.
    Ready(Vec<u8>),
    /// The encoded result, available once the task completes.
    Deferred(RpcTask<Vec<u8>>),
    /// One-way call: nothing goes back.
    Silent,
}

/// Decodes a call's arguments, invokes the implementation and encodes what
/// it returned.
pub type RpcMemberHandler =
    Arc<dyn Fn(&RpcCallCodec, &[u8]) -> Result<RpcReply, RpcError> + Send + Sync>;

fn result_encode_error(err: tandem::codec::CodecError) -> RpcError {
    RpcError::Protocol(format!("failed to encode result: {}", err))
}

/// Member id to handler map for one bound implementation.
#[derive(Default, Clone)]
pub struct RpcDispatchTable {
    handlers: HashMap<u64, RpcMemberHandler>,
}

impl RpcDispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, member_id: u64, handler: RpcMemberHandler) {
        if self.handlers.insert(member_id, handler).is_some() {
            tracing::warn!("Member {:#018x} registered twice; keeping the latest", member_id);
        }
    }

    pub fn get(&self, member_id: u64) -> Option<RpcMemberHandler> {
        self.handlers.get(&member_id).cloned()
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Registers a member whose result is ready when it returns.
    pub fn sync<A, R, F>(&mut self, member_id: u64, f: F)
    where
        A: RpcArgs,
        R: 'static,
        F: Fn(A) -> Result<R, RpcError> + Send + Sync + 'static,
    {
        self.insert(
            member_id,
            Arc::new(
                move |codec: &RpcCallCodec, payload: &[u8]| -> Result<RpcReply, RpcError> {
                    let args = codec.decode_args::<A>(payload).map_err(RpcError::Codec)?;
                    let value = f(args)?;
                    let bytes = codec
                        .registry()
                        .encode_to_vec(codec.ctx(), &value)
                        .map_err(result_encode_error)?;
                    Ok(RpcReply::Ready(bytes))
                },
            ),
        );
    }

    /// Registers a member that hands back a task.
    pub fn asynchronous<A, R, F>(&mut self, member_id: u64, f: F)
    where
        A: RpcArgs,
        R: Send + Sync + 'static,
        F: Fn(A) -> RpcTask<R> + Send + Sync + 'static,
    {
        self.insert(
            member_id,
            Arc::new(
                move |codec: &RpcCallCodec, payload: &[u8]| -> Result<RpcReply, RpcError> {
                    let args = codec.decode_args::<A>(payload).map_err(RpcError::Codec)?;
                    let task = f(args);

                    let encoded = RpcTask::<Vec<u8>>::new();
                    let completer = encoded.clone();
                    let codec = codec.clone();
                    task.on_complete(move |outcome| {
                        let bytes = match outcome {
                            Ok(value) => codec
                                .registry()
                                .encode_to_vec(codec.ctx(), value)
                                .map_err(result_encode_error),
                            Err(e) => Err(e.clone()),
                        };
                        completer.complete(bytes);
                    });

                    Ok(RpcReply::Deferred(encoded))
                },
            ),
        );
    }

    /// Registers a fire-and-forget member.
    pub fn oneway<A, F>(&mut self, member_id: u64, f: F)
    where
        A: RpcArgs,
        F: Fn(A) -> Result<(), RpcError> + Send + Sync + 'static,
    {
        self.insert(
            member_id,
            Arc::new(
                move |codec: &RpcCallCodec, payload: &[u8]| -> Result<RpcReply, RpcError> {
                    let args = codec.decode_args::<A>(payload).map_err(RpcError::Codec)?;
                    f(args)?;
                    Ok(RpcReply::Silent)
                },
            ),
        );
    }
}

/// A live binding: which implementation answers a contract on an endpoint,
/// and for how long.
pub struct RpcBindingEntry {
    pub contract_name: &'static str,
    pub binding_id: u64,
    pub table: RpcDispatchTable,
    pub lifetime: Lifetime,
    /// Entity ids of the implementation's lists linked by this binding.
    pub list_ids: Vec<u64>,
}
