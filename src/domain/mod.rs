mod batch_config;
mod email_template;
mod recipient_address;
mod send_result;

pub use batch_config::*;
pub use email_template::*;
pub use recipient_address::RecipientAddress;
pub use send_result::{DispatchRun, DispatchStats, SendResult};
