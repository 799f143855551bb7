//! Core conversion modules

pub mod dates;
pub mod dispatch;
pub mod metadata;
pub mod transform;

// Re-export main types
pub use dispatch::{classify, convert, ConvertRequest, ProductDescriptor, SliceSelection};
