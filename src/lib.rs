//! Media-sharing backend (signup/login, media upload and listing over
//! SQLite) together with the client-side core used by the mobile app.

pub mod app;
pub mod auth;
pub mod client;
pub mod cloudinary;
pub mod config;
pub mod db;
pub mod error;
pub mod media;
pub mod state;
pub mod storage;
