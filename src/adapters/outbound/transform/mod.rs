//! Raster transformation adapter backed by the `image` crate

pub mod image_transformer;

pub use image_transformer::RasterTransformer;
