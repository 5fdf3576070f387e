//! Network side of the GitFolio client.
//!
//! Implements [`folio_core::transport::PortfolioBackend`] over HTTP.

pub mod http_backend;
pub mod wire;

pub use http_backend::HttpPortfolioBackend;
