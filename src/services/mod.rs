// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - flows and Firebase REST clients.

pub mod email_change;
pub mod firebase_auth;
pub mod firebase_storage;
pub mod profile_image;
pub mod users;

pub use email_change::{EmailAvailability, EmailChangeFlow};
pub use firebase_auth::FirebaseAuth;
pub use firebase_storage::FirebaseStorage;
pub use profile_image::ProfileImageSync;
pub use users::{UserRecordStore, UserSubscription};
