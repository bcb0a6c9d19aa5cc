//! Access-state resolution: what a signed-in user has done, and where that
//! sends them.

pub mod resolver;
pub mod state;

pub use resolver::AccessStateResolver;
pub use state::{AccessState, Destination, get_redirect_path};
