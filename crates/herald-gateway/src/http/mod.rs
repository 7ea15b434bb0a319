pub mod events;
pub mod health;
pub mod message;
pub mod ui;
pub mod webhook;
