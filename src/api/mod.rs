pub mod body;
pub mod error;
pub mod handlers;
pub mod response;
pub mod routes;
pub mod scope_extractor;

pub use body::*;
pub use error::*;
pub use handlers::*;
pub use response::*;
pub use routes::*;
pub use scope_extractor::*;
