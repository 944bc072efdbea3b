//! Infrared pet-photo colorization service.
//!
//! Users upload reference color photos and an infrared photo of a pet;
//! the service submits them to a hosted style-transfer model on Replicate
//! and tracks the asynchronous colorization job until it produces a
//! result image (or fails).

pub mod app_state;
pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
