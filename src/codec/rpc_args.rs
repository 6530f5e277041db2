use crate::codec::{ByteReader, ByteWriter, CodecError, SerializationCtx};
use std::any::{TypeId, type_name};

/// An ordered argument list, encoded as each element in sequence with no
/// separators or count prefix.
///
/// Implemented for tuples of up to eight elements. The element types must
/// be registered with the [`SerializerRegistry`](crate::codec::SerializerRegistry)
/// used by the endpoint; `type_ids` lets binding check that up front.
pub trait RpcArgs: Sized + Send + 'static {
    fn type_ids() -> Vec<(TypeId, &'static str)>;

    fn encode_args(&self, ctx: &SerializationCtx, writer: &mut ByteWriter)
    -> Result<(), CodecError>;

    fn decode_args(ctx: &SerializationCtx, reader: &mut ByteReader<'_>)
    -> Result<Self, CodecError>;
}

macro_rules! impl_rpc_args {
    ($($name:ident),*) => {
        #[allow(non_snake_case, unused_variables)]
        impl<$($name: Send + 'static),*> RpcArgs for ($($name,)*) {
            fn type_ids() -> Vec<(TypeId, &'static str)> {
                vec![$((TypeId::of::<$name>(), type_name::<$name>())),*]
            }

            fn encode_args(
                &self,
                ctx: &SerializationCtx,
                writer: &mut ByteWriter,
            ) -> Result<(), CodecError> {
                let ($($name,)*) = self;
                $(ctx.write::<$name>(writer, $name)?;)*
                Ok(())
            }

            fn decode_args(
                ctx: &SerializationCtx,
                reader: &mut ByteReader<'_>,
            ) -> Result<Self, CodecError> {
                Ok(($(ctx.read::<$name>(reader)?,)*))
            }
        }
    };
}

impl_rpc_args!();
impl_rpc_args!(A);
impl_rpc_args!(A, B);
impl_rpc_args!(A, B, C);
impl_rpc_args!(A, B, C, D);
impl_rpc_args!(A, B, C, D, E);
impl_rpc_args!(A, B, C, D, E, F);
impl_rpc_args!(A, B, C, D, E, F, G);
impl_rpc_args!(A, B, C, D, E, F, G, H);
