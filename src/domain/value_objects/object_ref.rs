use serde::{Deserialize, Serialize};

use crate::domain::errors::ValidationError;

const MAX_REF_LEN: usize = 1024;

/// Backend-assigned identifier of a stored blob.
///
/// The S3 backend treats it as an object key, the filer backend as a path
/// below its root directory. Beyond the shape checks below it carries no
/// meaning.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ObjectRef(String);

impl ObjectRef {
    /// Create a new ObjectRef with validation
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();

        if value.is_empty() {
            return Err(ValidationError::EmptyObjectRef);
        }

        if value.len() > MAX_REF_LEN {
            return Err(ValidationError::ObjectRefTooLong {
                actual: value.len(),
                max: MAX_REF_LEN,
            });
        }

        if value.contains('\0') {
            return Err(ValidationError::InvalidObjectRefCharacter('\0'));
        }

        if value.starts_with('/') {
            return Err(ValidationError::ObjectRefStartsWithSlash);
        }

        if value.contains("//") {
            return Err(ValidationError::ObjectRefContainsDoubleSlash);
        }

        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Everything after the last '/'
    pub fn file_name(&self) -> &str {
        self.0.rfind('/').map_or(&self.0, |idx| &self.0[idx + 1..])
    }

    /// Extension of the file name, lowercased, without the dot
    pub fn extension(&self) -> Option<String> {
        let name = self.file_name();
        name.rfind('.')
            .filter(|idx| *idx + 1 < name.len())
            .map(|idx| name[idx + 1..].to_ascii_lowercase())
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for ObjectRef {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        ObjectRef::new(value)
    }
}

impl From<ObjectRef> for String {
    fn from(value: ObjectRef) -> Self {
        value.0
    }
}
