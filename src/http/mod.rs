//! HTTP surface for contact form submissions.

mod routes;
mod server;

pub use routes::router;
pub use server::HttpServer;
