//! Outbound hotel webhooks.

mod dispatcher;

pub use dispatcher::NotificationDispatcher;
