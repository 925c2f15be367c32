/// Validation errors for domain value objects and transform parameters
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    // ObjectRef validation errors
    EmptyObjectRef,
    ObjectRefTooLong {
        actual: usize,
        max: usize,
    },
    InvalidObjectRefCharacter(char),
    ObjectRefStartsWithSlash,
    ObjectRefContainsDoubleSlash,

    // Transform parameter errors
    NegativeDimension {
        field: &'static str,
        value: i64,
    },
    DimensionTooLarge {
        field: &'static str,
        value: i64,
        max: u32,
    },
    QualityOutOfRange(i64),
    InvalidFitMode(String),
    InvalidCropAnchor(String),
    InvalidFormat(String),
    UnknownPreset(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            // ObjectRef errors
            ValidationError::EmptyObjectRef => write!(f, "Object reference cannot be empty"),
            ValidationError::ObjectRefTooLong { actual, max } => {
                write!(
                    f,
                    "Object reference too long: {} bytes (max: {})",
                    actual, max
                )
            }
            ValidationError::InvalidObjectRefCharacter(c) => {
                write!(f, "Invalid character in object reference: {:?}", c)
            }
            ValidationError::ObjectRefStartsWithSlash => {
                write!(f, "Object reference cannot start with '/'")
            }
            ValidationError::ObjectRefContainsDoubleSlash => {
                write!(f, "Object reference cannot contain '//'")
            }

            // Transform errors
            ValidationError::NegativeDimension { field, value } => {
                write!(f, "{} must be non-negative, got {}", field, value)
            }
            ValidationError::DimensionTooLarge { field, value, max } => {
                write!(
                    f,
                    "{} of {} exceeds the maximum of {} pixels",
                    field, value, max
                )
            }
            ValidationError::QualityOutOfRange(q) => {
                write!(f, "quality must be between 0 and 100, got {}", q)
            }
            ValidationError::InvalidFitMode(fit) => {
                write!(
                    f,
                    "invalid fit mode '{}' (expected: contain, cover, fill)",
                    fit
                )
            }
            ValidationError::InvalidCropAnchor(crop) => {
                write!(
                    f,
                    "invalid crop position '{}' (expected: center, top, bottom, left, right)",
                    crop
                )
            }
            ValidationError::InvalidFormat(format) => {
                write!(
                    f,
                    "unsupported format '{}' (expected: jpeg, png, webp)",
                    format
                )
            }
            ValidationError::UnknownPreset(preset) => write!(f, "unknown preset: {}", preset),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Every constraint a set of transform parameters violated
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{}", format_violations(.violations))]
pub struct TransformSpecError {
    pub violations: Vec<ValidationError>,
}

impl TransformSpecError {
    pub fn new(violations: Vec<ValidationError>) -> Self {
        Self { violations }
    }

    pub fn contains(&self, violation: &ValidationError) -> bool {
        self.violations.contains(violation)
    }
}

fn format_violations(violations: &[ValidationError]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}
