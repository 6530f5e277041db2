use crate::codec::{
    ByteReader, ByteWriter, CodecError, RpcArgs, SerializationCtx, SerializerRegistry,
};
use crate::rpc::{
    RpcCallKind, RpcCallMessage, RpcError, RpcListDeltaMessage, RpcListOp, RpcResponseMessage,
    RpcResultStatus,
};
use std::sync::Arc;

/// Turns typed arguments, results and list values into message payloads
/// and back, using one frozen serializer registry.
///
/// Every `encode_*` method builds the whole message before returning, so a
/// failure part way through never leaves a partial message behind.
#[derive(Debug, Clone)]
pub struct RpcCallCodec {
    ctx: SerializationCtx,
}

impl RpcCallCodec {
    pub fn new(registry: Arc<SerializerRegistry>) -> Self {
        Self {
            ctx: SerializationCtx::new(registry),
        }
    }

    pub fn ctx(&self) -> &SerializationCtx {
        &self.ctx
    }

    pub fn registry(&self) -> &SerializerRegistry {
        self.ctx.registry()
    }

    pub fn encode_call<A: RpcArgs>(
        &self,
        contract_id: u64,
        member_id: u64,
        kind: RpcCallKind,
        correlation_id: u32,
        args: &A,
    ) -> Result<RpcCallMessage, CodecError> {
        let mut writer = ByteWriter::new();
        args.encode_args(&self.ctx, &mut writer)?;

        Ok(RpcCallMessage {
            contract_id,
            member_id,
            kind,
            correlation_id,
            payload: writer.into_bytes(),
        })
    }

    /// Decodes a call's argument list; unread bytes after the last argument
    /// are an error.
    pub fn decode_args<A: RpcArgs>(&self, payload: &[u8]) -> Result<A, CodecError> {
        let mut reader = ByteReader::new(payload);
        let args = A::decode_args(&self.ctx, &mut reader)?;
        reader.finish()?;
        Ok(args)
    }

    pub fn encode_success<R: 'static>(
        &self,
        correlation_id: u32,
        value: &R,
    ) -> Result<RpcResponseMessage, CodecError> {
        Ok(RpcResponseMessage {
            correlation_id,
            status: RpcResultStatus::Success,
            payload: self.ctx.registry().encode_to_vec(&self.ctx, value)?,
        })
    }

    /// Maps a response back to the caller's typed result.
    ///
    /// `contract_id` and `member_id` identify the call the response belongs
    /// to; they are only used to describe an unknown-contract failure.
    pub fn decode_result<R: 'static>(
        &self,
        response: &RpcResponseMessage,
        contract_id: u64,
        member_id: u64,
    ) -> Result<R, RpcError> {
        match response.status {
            RpcResultStatus::Success => Ok(self
                .ctx
                .registry()
                .decode_from_slice::<R>(&self.ctx, &response.payload)?),
            RpcResultStatus::Fault => Err(RpcError::RemoteFault {
                message: response.fault_message(),
            }),
            RpcResultStatus::UnknownContract | RpcResultStatus::UnknownMember => {
                tracing::debug!(
                    "Call {} rejected by remote: {}",
                    response.correlation_id,
                    response.fault_message()
                );
                Err(RpcError::UnknownContract {
                    contract_id,
                    member_id,
                })
            }
            RpcResultStatus::DecodeFailure => Err(RpcError::RemoteFault {
                message: format!(
                    "remote could not decode arguments: {}",
                    response.fault_message()
                ),
            }),
        }
    }

    pub fn encode_list_delta<T: 'static>(
        &self,
        entity_id: u64,
        op: RpcListOp,
        index: u32,
        value: Option<&T>,
    ) -> Result<RpcListDeltaMessage, CodecError> {
        let payload = match value {
            Some(value) => self.ctx.registry().encode_to_vec(&self.ctx, value)?,
            None => Vec::new(),
        };

        Ok(RpcListDeltaMessage {
            entity_id,
            op,
            index,
            payload,
        })
    }

    pub fn decode_list_value<T: 'static>(&self, payload: &[u8]) -> Result<T, CodecError> {
        self.ctx.registry().decode_from_slice::<T>(&self.ctx, payload)
    }
}
