//! Media provider adapters

pub mod memory;
pub mod twilio;

pub use memory::InMemoryMediaProvider;
pub use twilio::{TwilioTokenIssuer, TwilioVideoClient};
