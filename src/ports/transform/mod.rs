mod image_transformer;

pub use image_transformer::ImageTransformer;
