pub mod artifact;
pub mod ingest;
pub mod preset;
pub mod transform;
pub mod upload;

pub use artifact::*;
pub use ingest::*;
pub use preset::{Preset, PresetValues};
pub use transform::*;
pub use upload::*;
