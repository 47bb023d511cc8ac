//! Drive domain: the draft, its validation, area intake and payload assembly.

pub mod area;
pub mod dashboard;
pub mod errors;
pub mod models;
pub mod payload;
pub mod sighting;
pub mod validation;

pub use area::*;
pub use dashboard::*;
pub use errors::*;
pub use models::*;
pub use payload::*;
pub use sighting::*;
pub use validation::*;
