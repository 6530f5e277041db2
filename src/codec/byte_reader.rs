use crate::codec::CodecError;

macro_rules! read_le {
    ($($name:ident => $ty:ty),* $(,)?) => {
        $(
            #[inline]
            pub fn $name(&mut self) -> Result<$ty, CodecError> {
                Ok(<$ty>::from_le_bytes(self.read_array()?))
            }
        )*
    };
}

/// A forward-only cursor over an encoded payload.
///
/// All fixed-width values are little-endian. Variable-length values
/// (strings, byte blobs) carry a `u32` length prefix.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Borrows the next `len` bytes and advances past them.
    pub fn read_exact(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        let remaining = self.remaining();
        if len > remaining {
            return Err(CodecError::UnexpectedEof {
                needed: len,
                remaining,
            });
        }

        let start = self.position;
        self.position += len;
        Ok(&self.bytes[start..self.position])
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let slice = self.read_exact(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(slice);
        Ok(out)
    }

    read_le! {
        read_u8 => u8,
        read_u16 => u16,
        read_u32 => u32,
        read_u64 => u64,
        read_u128 => u128,
        read_i8 => i8,
        read_i16 => i16,
        read_i32 => i32,
        read_i64 => i64,
        read_i128 => i128,
        read_f32 => f32,
        read_f64 => f64,
    }

    pub fn read_bool(&mut self) -> Result<bool, CodecError> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CodecError::InvalidData(format!(
                "bool byte must be 0 or 1, got {}",
                other
            ))),
        }
    }

    pub fn read_char(&mut self) -> Result<char, CodecError> {
        let code = self.read_u32()?;
        char::from_u32(code)
            .ok_or_else(|| CodecError::InvalidData(format!("{:#x} is not a char", code)))
    }

    pub fn read_len(&mut self) -> Result<usize, CodecError> {
        Ok(self.read_u32()? as usize)
    }

    /// Reads a length-prefixed byte blob.
    pub fn read_bytes(&mut self) -> Result<Vec<u8>, CodecError> {
        let len = self.read_len()?;
        Ok(self.read_exact(len)?.to_vec())
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String, CodecError> {
        let len = self.read_len()?;
        let raw = self.read_exact(len)?;
        std::str::from_utf8(raw)
            .map(str::to_owned)
            .map_err(|_| CodecError::InvalidUtf8)
    }

    /// Consumes everything left in the cursor.
    pub fn read_remaining(&mut self) -> &'a [u8] {
        let start = self.position;
        self.position = self.bytes.len();
        &self.bytes[start..]
    }

    /// Fails with `TrailingBytes` unless the cursor is fully consumed.
    pub fn finish(&self) -> Result<(), CodecError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(CodecError::TrailingBytes(n)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian_fixed_width_values() {
        let mut bytes = Vec::new();
        bytes.extend(&0xBEEFu16.to_le_bytes());
        bytes.extend(&(-5i32).to_le_bytes());
        bytes.push(1);

        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_u16().unwrap(), 0xBEEF);
        assert_eq!(reader.read_i32().unwrap(), -5);
        assert!(reader.read_bool().unwrap());
        assert!(reader.is_empty());
        assert!(reader.finish().is_ok());
    }

    #[test]
    fn short_input_reports_eof_without_advancing() {
        let bytes = [1u8, 2, 3];
        let mut reader = ByteReader::new(&bytes);

        assert_eq!(
            reader.read_u64(),
            Err(CodecError::UnexpectedEof {
                needed: 8,
                remaining: 3
            })
        );
        assert_eq!(reader.position(), 0);
    }

    #[test]
    fn rejects_invalid_bool_and_utf8() {
        let mut reader = ByteReader::new(&[7]);
        assert!(matches!(reader.read_bool(), Err(CodecError::InvalidData(_))));

        let mut bytes = 2u32.to_le_bytes().to_vec();
        bytes.extend([0xFF, 0xFE]);
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(reader.read_string(), Err(CodecError::InvalidUtf8));
    }

    #[test]
    fn finish_reports_trailing_bytes() {
        let bytes = [0u8, 0, 9];
        let mut reader = ByteReader::new(&bytes);
        reader.read_u16().unwrap();
        assert_eq!(reader.finish(), Err(CodecError::TrailingBytes(1)));
    }
}
