pub mod bot;
pub mod payments;
pub mod stats;
pub mod users;
pub mod webhook;
