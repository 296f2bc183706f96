//! HTTP transport layer.

pub mod handlers;
pub mod response;
pub mod server;

pub use server::{app, AppState, HttpServer};
