//! PawHub - drive planning for community animal welfare groups
//!
//! A terminal client for creating geofenced sterilization drives: a
//! three-step wizard with per-step validation, polygon intake, payload
//! assembly and background submission to a pluggable drive repository.

pub mod domain;
pub mod application;
pub mod infrastructure;
pub mod presentation;
pub mod cli;

pub use domain::*;
pub use application::*;
