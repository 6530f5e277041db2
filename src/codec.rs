mod byte_reader;
mod byte_writer;
mod codec_error;
mod rpc_args;
mod rpc_scalar;
mod serialization_ctx;
mod serializer_registry;

pub use byte_reader::ByteReader;
pub use byte_writer::ByteWriter;
pub use codec_error::CodecError;
pub use rpc_args::RpcArgs;
pub use rpc_scalar::RpcScalar;
pub use serialization_ctx::SerializationCtx;
pub use serializer_registry::SerializerRegistry;
