pub mod storage;
pub mod transform;
