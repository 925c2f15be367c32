use crate::domain::{errors::ValidationError, models::TransformSpec};

use super::ObjectRef;

/// Namespace for derived objects inside the backing store
pub const CACHE_PREFIX: &str = "_transforms";

/// Storage location of a transformed derivative.
///
/// Layout: `_transforms/<source ref>/w<W>-h<H>-<fit>-<crop>-q<Q>.<format>`.
/// The last segment never contains `/` or `-` inside a field, so the key can
/// be split back into its inputs unambiguously and distinct inputs never map
/// to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(ObjectRef);

impl CacheKey {
    pub fn derive(source: &ObjectRef, spec: &TransformSpec) -> Result<Self, ValidationError> {
        let key = format!(
            "{}/{}/w{}-h{}-{}-{}-q{}.{}",
            CACHE_PREFIX,
            source.as_str(),
            spec.width.unwrap_or(0),
            spec.height.unwrap_or(0),
            spec.fit.map_or("auto", |f| f.as_str()),
            spec.crop.map_or("none", |c| c.as_str()),
            spec.quality.unwrap_or(0),
            spec.format.map_or("auto", |f| f.as_str()),
        );
        ObjectRef::new(key).map(Self)
    }

    pub fn as_object_ref(&self) -> &ObjectRef {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::TransformParams;

    fn spec(params: TransformParams) -> TransformSpec {
        params.validate().unwrap()
    }

    fn source() -> ObjectRef {
        ObjectRef::new("uploads/abc-photo.jpg").unwrap()
    }

    #[test]
    fn test_identical_inputs_share_a_key() {
        let params = TransformParams::builder()
            .width(150)
            .height(150)
            .fit("cover")
            .quality(80)
            .build();
        let a = CacheKey::derive(&source(), &spec(params.clone())).unwrap();
        let b = CacheKey::derive(&source(), &spec(params)).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            a.as_str(),
            "_transforms/uploads/abc-photo.jpg/w150-h150-cover-none-q80.auto"
        );
    }

    #[test]
    fn test_freshness_does_not_change_the_key() {
        let stale = TransformParams::builder().width(100).build();
        let fresh = TransformParams::builder().width(100).fresh(true).build();
        assert_eq!(
            CacheKey::derive(&source(), &spec(stale)).unwrap(),
            CacheKey::derive(&source(), &spec(fresh)).unwrap()
        );
    }

    #[test]
    fn test_every_field_changes_the_key() {
        let base = TransformParams::builder()
            .width(150)
            .height(150)
            .fit("cover")
            .crop("center")
            .quality(80)
            .format("jpeg")
            .build();
        let base_key = CacheKey::derive(&source(), &spec(base.clone())).unwrap();

        let variants = [
            TransformParams { width: Some(151), ..base.clone() },
            TransformParams { height: Some(149), ..base.clone() },
            TransformParams { fit: Some("fill".into()), ..base.clone() },
            TransformParams { crop: Some("top".into()), ..base.clone() },
            TransformParams { quality: Some(81), ..base.clone() },
            TransformParams { format: Some("png".into()), ..base.clone() },
        ];

        for variant in variants {
            let key = CacheKey::derive(&source(), &spec(variant.clone())).unwrap();
            assert_ne!(key, base_key, "{:?} collided with the base key", variant);
        }

        let other_source = ObjectRef::new("uploads/abc-photo.png").unwrap();
        assert_ne!(
            CacheKey::derive(&other_source, &spec(base)).unwrap(),
            base_key
        );
    }
}
