//! Host-side pieces of the browser login.

pub mod callback_server;

pub use callback_server::RedirectReceiver;
