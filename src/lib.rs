//! SproutLog server library.
//!
//! Core functionality for the child-development tracking server: media
//! capture with OCR/transcription, AI-assisted growth report generation,
//! and role-scoped persistence.

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
