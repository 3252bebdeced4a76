mod dispatch;
mod health_check;
mod index;
mod status;

pub use dispatch::*;
pub use health_check::*;
pub use index::*;
pub use status::*;
