pub mod json;
pub mod sink;
