//! Model loading and scoring

pub mod explain;
pub mod pipeline;

pub use explain::*;
pub use pipeline::*;
