//! IPC module for the inference and configuration clients

mod protocol;
mod server;

pub use server::Server;
