//! Swipe API integration
//!
//! HTTP client for the remote marketplace backend

pub mod client;

pub use client::SwipeApiClient;
