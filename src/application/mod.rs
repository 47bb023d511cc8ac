//! Application layer managing state and business workflows.
//!
//! This module coordinates between the domain layer and presentation layer:
//! the form store, background submission, the wizard workflow built from
//! them, dashboard loading, and the terminal application state.

pub mod dashboard;
pub mod form;
pub mod state;
pub mod submission;
pub mod wizard;

pub use dashboard::*;
pub use form::*;
pub use state::*;
pub use submission::*;
pub use wizard::*;
