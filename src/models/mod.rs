pub mod backend;
pub mod message;
pub mod session;

pub use backend::*;
pub use message::{Message, Role};
pub use session::Session;
