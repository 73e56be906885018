pub mod cache;
pub mod http;
pub mod math;
pub mod serde;
