use bytes::Bytes;

use crate::domain::{errors::TransformResult, models::TransformSpec};

/// Port for the raster engine.
///
/// Implementations are synchronous and CPU bound; callers on an async
/// runtime must move the call onto a blocking thread.
pub trait ImageTransformer: Send + Sync + 'static {
    /// Apply `spec` to the encoded `source` and return the re-encoded output.
    /// A pass-through spec returns the input unchanged.
    fn transform(&self, source: &[u8], spec: &TransformSpec) -> TransformResult<Bytes>;
}
