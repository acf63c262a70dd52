// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@kernel.org>

//! Data models for the application.

pub mod image;
pub mod session;
pub mod user;

pub use image::ImageSource;
pub use session::{Session, SessionStore};
pub use user::UserProfile;
