//! STT parameter-override proxy library.

pub mod admin;
pub mod config;
pub mod error;
pub mod form;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod rewrite;
pub mod routing;
pub mod upstream;

pub use config::{OverrideRules, ProxyConfig};
pub use error::ProxyError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
