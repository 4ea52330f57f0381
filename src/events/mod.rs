pub mod guild;
pub mod message;

pub use guild::{handle_member_add, handle_member_removal};
pub use message::handle_message;
