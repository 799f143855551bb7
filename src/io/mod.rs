//! I/O modules for reading product containers and writing ROI_PAC files

pub mod container;
pub mod roipac;

pub use container::{GdalContainer, ProductContainer};
