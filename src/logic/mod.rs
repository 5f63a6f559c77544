pub mod association;
pub mod dispatch;
pub mod resolve;

pub use association::*;
pub use dispatch::*;
pub use resolve::*;
