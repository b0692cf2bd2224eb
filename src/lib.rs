//! Library exports for the QR code service
//!
//! This module exposes internal components for testing and potential library usage.

pub mod analytics;
pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod model;
pub mod registry;
pub mod render;
pub mod resolver;
pub mod route;
pub mod state;
