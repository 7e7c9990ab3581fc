pub mod admin;
pub mod health;
pub mod snapshot;
pub mod sse;
pub mod validation;
pub mod ws;
