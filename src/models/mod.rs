//! Data models module
//!
//! This module contains all data structures used throughout the application

pub mod announcement;
pub mod user;

// Re-export commonly used models
pub use announcement::{
    Announcement, AnnouncementImage, AnnouncementOwner, BrowseMode, CreateAnnouncementRequest,
    Profile, RegistrationRequest, TokenPair,
};
pub use user::{CreateUserRequest, User};
