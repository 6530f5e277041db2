use bitcode::{Decode, Encode};
use std::sync::Arc;
use tandem::codec::{
    ByteReader, ByteWriter, CodecError, RpcScalar, SerializationCtx, SerializerRegistry,
};

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
struct AColor {
    r: i32,
    g: i32,
    b: i32,
}

/// Paths are case-insensitive on the wire: they are always written lower-cased.
#[derive(Debug, Clone, PartialEq)]
struct FileSystemPath(String);

impl RpcScalar for FileSystemPath {
    fn read(_ctx: &SerializationCtx, reader: &mut ByteReader<'_>) -> Result<Self, CodecError> {
        Ok(FileSystemPath(reader.read_string()?))
    }

    fn write(
        _ctx: &SerializationCtx,
        writer: &mut ByteWriter,
        value: &Self,
    ) -> Result<(), CodecError> {
        writer.write_string(&value.0.to_lowercase())
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Labeled {
    label: String,
    color: AColor,
}

fn register_color(registry: &mut SerializerRegistry) {
    registry.register::<AColor, _, _>(
        |_, reader| {
            let bytes = reader.read_bytes()?;
            bitcode::decode::<AColor>(&bytes).map_err(|e| CodecError::InvalidData(e.to_string()))
        },
        |_, writer, value| writer.write_bytes(&bitcode::encode(value)),
    );
}

fn freeze(registry: SerializerRegistry) -> SerializationCtx {
    SerializationCtx::new(Arc::new(registry))
}

#[test]
fn test_builtins_are_available_in_new_registry() {
    let registry = SerializerRegistry::new();
    assert!(registry.contains::<u8>());
    assert!(registry.contains::<i64>());
    assert!(registry.contains::<String>());
    assert!(registry.contains::<()>());
    assert!(registry.contains::<Vec<String>>());
    assert!(!registry.contains::<AColor>());

    assert!(SerializerRegistry::empty().is_empty());
}

#[test]
fn test_custom_type_through_bitcode() {
    let mut registry = SerializerRegistry::new();
    register_color(&mut registry);
    let ctx = freeze(registry);

    let color = AColor {
        r: 10,
        g: 10,
        b: 10,
    };
    let bytes = ctx.registry().encode_to_vec(&ctx, &color).unwrap();
    let decoded: AColor = ctx.registry().decode_from_slice(&ctx, &bytes).unwrap();
    assert_eq!(decoded, color);
}

#[test]
fn test_scalar_may_normalize_on_write() {
    let mut registry = SerializerRegistry::new();
    registry.register_scalar::<FileSystemPath>();
    let ctx = freeze(registry);

    let path = FileSystemPath("C:\\Temp\\README.TXT".to_string());
    let bytes = ctx.registry().encode_to_vec(&ctx, &path).unwrap();
    let decoded: FileSystemPath = ctx.registry().decode_from_slice(&ctx, &bytes).unwrap();
    assert_eq!(decoded, FileSystemPath("c:\\temp\\readme.txt".to_string()));
}

#[test]
fn test_composite_delegates_fields_through_context() {
    let mut registry = SerializerRegistry::new();
    register_color(&mut registry);
    registry.register::<Labeled, _, _>(
        |ctx, reader| {
            Ok(Labeled {
                label: ctx.read::<String>(reader)?,
                color: ctx.read::<AColor>(reader)?,
            })
        },
        |ctx, writer, value| {
            ctx.write(writer, &value.label)?;
            ctx.write(writer, &value.color)
        },
    );
    let ctx = freeze(registry);

    let value = Labeled {
        label: "sky".to_string(),
        color: AColor { r: 1, g: 2, b: 3 },
    };
    let bytes = ctx.registry().encode_to_vec(&ctx, &value).unwrap();
    assert_eq!(&bytes[..7], &[3, 0, 0, 0, b's', b'k', b'y']);

    let decoded: Labeled = ctx.registry().decode_from_slice(&ctx, &bytes).unwrap();
    assert_eq!(decoded, value);
}

#[test]
fn test_list_of_custom_type() {
    let mut registry = SerializerRegistry::new();
    registry
        .register_list::<FileSystemPath>()
        .register_scalar::<FileSystemPath>();
    let ctx = freeze(registry);

    let paths = vec![
        FileSystemPath("A".to_string()),
        FileSystemPath("b".to_string()),
    ];
    let bytes = ctx.registry().encode_to_vec(&ctx, &paths).unwrap();
    assert_eq!(&bytes[..4], &[2, 0, 0, 0]);

    let decoded: Vec<FileSystemPath> = ctx.registry().decode_from_slice(&ctx, &bytes).unwrap();
    assert_eq!(
        decoded,
        vec![
            FileSystemPath("a".to_string()),
            FileSystemPath("b".to_string())
        ]
    );
}

#[test]
fn test_unregistered_type_is_reported_by_name() {
    let ctx = freeze(SerializerRegistry::new());

    let err = ctx
        .registry()
        .encode_to_vec(&ctx, &AColor { r: 0, g: 0, b: 0 })
        .unwrap_err();
    match err {
        CodecError::UnregisteredType { type_name } => assert!(type_name.ends_with("AColor")),
        other => panic!("unexpected error: {:?}", other),
    }

    let err = ctx
        .registry()
        .decode_from_slice::<AColor>(&ctx, &[0])
        .unwrap_err();
    assert!(matches!(err, CodecError::UnregisteredType { .. }));
}

#[test]
fn test_first_registration_wins() {
    let mut registry = SerializerRegistry::empty();
    registry.register::<u8, _, _>(|_, reader| reader.read_u8(), |_, writer, v| {
        writer.write_u8(*v);
        Ok(())
    });
    registry.register::<u8, _, _>(|_, _| Ok(0), |_, writer, _| {
        writer.write_u8(0xEE);
        Ok(())
    });
    assert_eq!(registry.len(), 1);

    let ctx = freeze(registry);
    assert_eq!(ctx.registry().encode_to_vec(&ctx, &7u8).unwrap(), vec![7]);
}

#[test]
fn test_decode_from_slice_rejects_trailing_bytes() {
    let ctx = freeze(SerializerRegistry::new());
    let err = ctx
        .registry()
        .decode_from_slice::<u16>(&ctx, &[1, 0, 9])
        .unwrap_err();
    assert_eq!(err, CodecError::TrailingBytes(1));
}
