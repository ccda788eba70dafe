pub mod cache;
pub mod normalize;
pub mod types;
