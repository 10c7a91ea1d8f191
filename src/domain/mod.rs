pub mod digest;
pub mod stats;
