//! Notification dispatchers

pub mod fcm;

pub use fcm::{FcmDispatcher, LoggingDispatcher};
