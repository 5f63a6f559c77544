pub mod common;
pub mod criteria;
pub mod definition;
pub mod registry;
pub mod write;

pub use common::*;
pub use criteria::*;
pub use definition::*;
pub use registry::*;
pub use write::*;
