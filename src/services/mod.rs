pub mod accounts;
pub mod cache;
pub mod cleanup;
pub mod file_service;
pub mod github;
pub mod sessions;
pub mod videos;
