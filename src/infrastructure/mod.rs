//! Infrastructure layer providing external service integrations.
//!
//! Drive storage backends (in-memory, JSON file, REST), start-up
//! configuration, log output and the sightings CSV export live here.

pub mod config;
pub mod export;
pub mod http;
pub mod logging;
pub mod persistence;
pub mod repository;

pub use config::*;
pub use export::*;
pub use http::*;
pub use logging::*;
pub use persistence::*;
pub use repository::*;
