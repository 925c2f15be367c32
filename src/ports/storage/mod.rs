mod storage_provider;

pub use storage_provider::{
    bytes_stream, collect_bytes, validate_part_sequence, BackendKind, ByteStream, CompletedPart,
    StorageProvider,
};
