use crate::codec::{ByteReader, ByteWriter, CodecError, SerializationCtx};

/// A value type that carries its own wire format.
///
/// Implementors expose a pure `read`/`write` pair and are added to a
/// [`SerializerRegistry`](crate::codec::SerializerRegistry) through
/// `register_scalar`. `write` may normalize the value (for instance
/// lower-casing a path) as long as it does so consistently; `read` must
/// rebuild a fully constructed value from whatever `write` produced.
pub trait RpcScalar: Sized + Send + 'static {
    fn read(ctx: &SerializationCtx, reader: &mut ByteReader<'_>) -> Result<Self, CodecError>;

    fn write(
        ctx: &SerializationCtx,
        writer: &mut ByteWriter,
        value: &Self,
    ) -> Result<(), CodecError>;
}

macro_rules! impl_fixed_width_scalar {
    ($($ty:ty => $read:ident, $write:ident);* $(;)?) => {
        $(
            impl RpcScalar for $ty {
                #[inline]
                fn read(_ctx: &SerializationCtx, reader: &mut ByteReader<'_>) -> Result<Self, CodecError> {
                    reader.$read()
                }

                #[inline]
                fn write(_ctx: &SerializationCtx, writer: &mut ByteWriter, value: &Self) -> Result<(), CodecError> {
                    writer.$write(*value);
                    Ok(())
                }
            }
        )*
    };
}

impl_fixed_width_scalar! {
    u8 => read_u8, write_u8;
    u16 => read_u16, write_u16;
    u32 => read_u32, write_u32;
    u64 => read_u64, write_u64;
    u128 => read_u128, write_u128;
    i8 => read_i8, write_i8;
    i16 => read_i16, write_i16;
    i32 => read_i32, write_i32;
    i64 => read_i64, write_i64;
    i128 => read_i128, write_i128;
    f32 => read_f32, write_f32;
    f64 => read_f64, write_f64;
    bool => read_bool, write_bool;
    char => read_char, write_char;
}

impl RpcScalar for String {
    fn read(_ctx: &SerializationCtx, reader: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        reader.read_string()
    }

    fn write(
        _ctx: &SerializationCtx,
        writer: &mut ByteWriter,
        value: &Self,
    ) -> Result<(), CodecError> {
        writer.write_string(value)
    }
}

// Void results travel as an empty payload.
impl RpcScalar for () {
    fn read(_ctx: &SerializationCtx, _reader: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(())
    }

    fn write(
        _ctx: &SerializationCtx,
        _writer: &mut ByteWriter,
        _value: &Self,
    ) -> Result<(), CodecError> {
        Ok(())
    }
}
