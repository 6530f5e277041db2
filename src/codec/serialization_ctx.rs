use crate::codec::{ByteReader, ByteWriter, CodecError, SerializerRegistry};
use std::sync::Arc;

/// Context handed to every decoder and encoder.
///
/// It gives custom serializers access to the frozen registry so that
/// composite values can delegate their fields to already registered types.
#[derive(Clone)]
pub struct SerializationCtx {
    registry: Arc<SerializerRegistry>,
}

impl SerializationCtx {
    pub fn new(registry: Arc<SerializerRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &SerializerRegistry {
        &self.registry
    }

    /// Decodes one `T` through the registry.
    pub fn read<T: 'static>(&self, reader: &mut ByteReader<'_>) -> Result<T, CodecError> {
        self.registry.decode::<T>(self, reader)
    }

    /// Encodes one `T` through the registry.
    pub fn write<T: 'static>(&self, writer: &mut ByteWriter, value: &T) -> Result<(), CodecError> {
        self.registry.encode::<T>(self, writer, value)
    }
}

impl std::fmt::Debug for SerializationCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerializationCtx")
            .field("registered_types", &self.registry.len())
            .finish()
    }
}
