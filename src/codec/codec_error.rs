use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The cursor ran out of bytes before a value was complete.
    UnexpectedEof { needed: usize, remaining: usize },

    /// A length-prefixed string did not contain valid UTF-8.
    InvalidUtf8,

    /// Bytes were present but do not describe a valid value.
    InvalidData(String),

    /// A length does not fit the 32-bit wire prefix.
    LengthOverflow(usize),

    /// No serializer is registered for the named type.
    UnregisteredType { type_name: &'static str },

    /// A registry entry was handed a value of a different type.
    TypeMismatch { expected: &'static str },

    /// A complete value was decoded but unread bytes remained.
    TrailingBytes(usize),
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::UnexpectedEof { needed, remaining } => write!(
                f,
                "unexpected end of input: needed {} bytes, {} remaining",
                needed, remaining
            ),
            CodecError::InvalidUtf8 => write!(f, "string payload is not valid UTF-8"),
            CodecError::InvalidData(msg) => write!(f, "invalid data: {}", msg),
            CodecError::LengthOverflow(len) => {
                write!(f, "length {} does not fit in a u32 prefix", len)
            }
            CodecError::UnregisteredType { type_name } => {
                write!(f, "no serializer registered for `{}`", type_name)
            }
            CodecError::TypeMismatch { expected } => {
                write!(f, "serializer expected a value of type `{}`", expected)
            }
            CodecError::TrailingBytes(count) => {
                write!(f, "{} trailing bytes after decoded value", count)
            }
        }
    }
}

impl std::error::Error for CodecError {}
