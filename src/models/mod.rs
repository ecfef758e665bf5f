pub mod event;
pub mod health;
pub mod message;
pub mod notification;
pub mod provider;
pub mod queue;
pub mod response;
pub mod retry;
pub mod status;
pub mod template;
