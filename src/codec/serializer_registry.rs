use crate::codec::{ByteReader, ByteWriter, CodecError, RpcScalar, SerializationCtx};
use once_cell::sync::Lazy;
use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

type DecodeFn = Arc<
    dyn Fn(&SerializationCtx, &mut ByteReader<'_>) -> Result<Box<dyn Any + Send>, CodecError>
        + Send
        + Sync,
>;

type EncodeFn =
    Arc<dyn Fn(&SerializationCtx, &mut ByteWriter, &dyn Any) -> Result<(), CodecError> + Send + Sync>;

#[derive(Clone)]
struct SerializerEntry {
    type_name: &'static str,
    decode: DecodeFn,
    encode: EncodeFn,
}

/// Built-in numeric, text and unit codecs, built once per process and
/// cloned into every new registry.
static BUILTIN_SERIALIZERS: Lazy<SerializerRegistry> = Lazy::new(|| {
    let mut registry = SerializerRegistry::empty();
    registry
        .register_scalar::<u8>()
        .register_scalar::<u16>()
        .register_scalar::<u32>()
        .register_scalar::<u64>()
        .register_scalar::<u128>()
        .register_scalar::<i8>()
        .register_scalar::<i16>()
        .register_scalar::<i32>()
        .register_scalar::<i64>()
        .register_scalar::<i128>()
        .register_scalar::<f32>()
        .register_scalar::<f64>()
        .register_scalar::<bool>()
        .register_scalar::<char>()
        .register_scalar::<String>()
        .register_scalar::<()>()
        .register_list::<u8>()
        .register_list::<String>();
    registry
});

/// Maps a value type to its `(decode, encode)` pair.
///
/// A registry is populated during setup and then frozen behind an `Arc`
/// before any endpoint uses it; lookups made during calls never race with
/// registration. Entries are immutable: registering a type twice keeps the
/// first entry.
#[derive(Clone)]
pub struct SerializerRegistry {
    entries: HashMap<TypeId, SerializerEntry>,
}

impl Default for SerializerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SerializerRegistry {
    /// A registry holding the built-in codecs.
    pub fn new() -> Self {
        BUILTIN_SERIALIZERS.clone()
    }

    /// A registry with nothing in it, not even the built-ins.
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Registers a custom type from a pair of pure functions.
    pub fn register<T, D, E>(&mut self, decode: D, encode: E) -> &mut Self
    where
        T: Send + 'static,
        D: Fn(&SerializationCtx, &mut ByteReader<'_>) -> Result<T, CodecError>
            + Send
            + Sync
            + 'static,
        E: Fn(&SerializationCtx, &mut ByteWriter, &T) -> Result<(), CodecError>
            + Send
            + Sync
            + 'static,
    {
        let type_id = TypeId::of::<T>();
        if let Some(existing) = self.entries.get(&type_id) {
            tracing::warn!(
                "Serializer for `{}` is already registered; keeping the original",
                existing.type_name
            );
            return self;
        }

        let decode_fn: DecodeFn =
            Arc::new(move |ctx: &SerializationCtx, reader: &mut ByteReader<'_>| {
                decode(ctx, reader).map(|value| Box::new(value) as Box<dyn Any + Send>)
            });

        let encode_fn: EncodeFn = Arc::new(
            move |ctx: &SerializationCtx, writer: &mut ByteWriter, value: &dyn Any| {
                let value = value
                    .downcast_ref::<T>()
                    .ok_or(CodecError::TypeMismatch {
                        expected: type_name::<T>(),
                    })?;
                encode(ctx, writer, value)
            },
        );

        self.entries.insert(
            type_id,
            SerializerEntry {
                type_name: type_name::<T>(),
                decode: decode_fn,
                encode: encode_fn,
            },
        );

        self
    }

    /// Registers a type that exposes its own `read`/`write` pair.
    pub fn register_scalar<T: RpcScalar>(&mut self) -> &mut Self {
        self.register::<T, _, _>(T::read, T::write)
    }

    /// Registers `Vec<T>` as a length-prefixed sequence of `T`.
    ///
    /// `T` itself is resolved through the context at call time, so it may be
    /// registered before or after its list.
    pub fn register_list<T: Send + 'static>(&mut self) -> &mut Self {
        self.register::<Vec<T>, _, _>(
            |ctx, reader| {
                let len = reader.read_len()?;
                let mut items = Vec::with_capacity(len.min(reader.remaining()));
                for _ in 0..len {
                    items.push(ctx.read::<T>(reader)?);
                }
                Ok(items)
            },
            |ctx, writer, items| {
                writer.write_len(items.len())?;
                for item in items {
                    ctx.write::<T>(writer, item)?;
                }
                Ok(())
            },
        )
    }

    pub fn contains<T: 'static>(&self) -> bool {
        self.contains_type_id(TypeId::of::<T>())
    }

    pub fn contains_type_id(&self, type_id: TypeId) -> bool {
        self.entries.contains_key(&type_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn entry<T: 'static>(&self) -> Result<&SerializerEntry, CodecError> {
        self.entries
            .get(&TypeId::of::<T>())
            .ok_or(CodecError::UnregisteredType {
                type_name: type_name::<T>(),
            })
    }

    pub fn decode<T: 'static>(
        &self,
        ctx: &SerializationCtx,
        reader: &mut ByteReader<'_>,
    ) -> Result<T, CodecError> {
        let entry = self.entry::<T>()?;
        let value = (entry.decode)(ctx, reader)?;
        value
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| CodecError::TypeMismatch {
                expected: entry.type_name,
            })
    }

    pub fn encode<T: 'static>(
        &self,
        ctx: &SerializationCtx,
        writer: &mut ByteWriter,
        value: &T,
    ) -> Result<(), CodecError> {
        let entry = self.entry::<T>()?;
        (entry.encode)(ctx, writer, value)
    }

    /// Encodes `value` into a fresh buffer.
    pub fn encode_to_vec<T: 'static>(
        &self,
        ctx: &SerializationCtx,
        value: &T,
    ) -> Result<Vec<u8>, CodecError> {
        let mut writer = ByteWriter::new();
        self.encode(ctx, &mut writer, value)?;
        Ok(writer.into_bytes())
    }

    /// Decodes exactly one `T` from `bytes`; leftover bytes are an error.
    pub fn decode_from_slice<T: 'static>(
        &self,
        ctx: &SerializationCtx,
        bytes: &[u8],
    ) -> Result<T, CodecError> {
        let mut reader = ByteReader::new(bytes);
        let value = self.decode::<T>(ctx, &mut reader)?;
        reader.finish()?;
        Ok(value)
    }
}

impl std::fmt::Debug for SerializerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.entries.values().map(|e| e.type_name).collect();
        names.sort_unstable();
        f.debug_struct("SerializerRegistry")
            .field("types", &names)
            .finish()
    }
}
