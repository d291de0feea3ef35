//! twinserve: static files, live reload and a dynamic reverse proxy behind one endpoint.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod live;
pub mod net;
pub mod observability;
pub mod proxy;
pub mod routing;

pub use config::schema::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
