mod media_errors;
mod storage_errors;
mod transform_errors;
mod validation_errors;

pub use media_errors::*;
pub use storage_errors::*;
pub use transform_errors::*;
pub use validation_errors::*;
