use crate::codec::CodecError;

macro_rules! write_le {
    ($($name:ident => $ty:ty),* $(,)?) => {
        $(
            #[inline]
            pub fn $name(&mut self, value: $ty) {
                self.buf.extend_from_slice(&value.to_le_bytes());
            }
        )*
    };
}

/// Growable byte sink used by encoders.
///
/// Writers never send anything on their own: a message is only handed to
/// a channel once it has been written completely.
#[derive(Debug, Default, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    write_le! {
        write_u8 => u8,
        write_u16 => u16,
        write_u32 => u32,
        write_u64 => u64,
        write_u128 => u128,
        write_i8 => i8,
        write_i16 => i16,
        write_i32 => i32,
        write_i64 => i64,
        write_i128 => i128,
        write_f32 => f32,
        write_f64 => f64,
    }

    pub fn write_bool(&mut self, value: bool) {
        self.buf.push(value as u8);
    }

    pub fn write_char(&mut self, value: char) {
        self.write_u32(value as u32);
    }

    pub fn write_len(&mut self, len: usize) -> Result<(), CodecError> {
        let len = u32::try_from(len).map_err(|_| CodecError::LengthOverflow(len))?;
        self.write_u32(len);
        Ok(())
    }

    /// Writes a length-prefixed byte blob.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        self.write_len(bytes.len())?;
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    /// Writes a length-prefixed UTF-8 string.
    pub fn write_string(&mut self, value: &str) -> Result<(), CodecError> {
        self.write_bytes(value.as_bytes())
    }

    /// Appends bytes without a length prefix.
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }
}
