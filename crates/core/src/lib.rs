//! Core business logic for Pictor.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Persistence and the delete queue are reached through traits implemented
//! by the db and queue crates.
//!
//! # Modules
//!
//! - `crypto` - AES-256-GCM encryption of tenant secrets
//! - `storage` - Per-tenant R2 bucket clients and their cache
//! - `image` - Image library, recycle bin and categories

pub mod crypto;
pub mod image;
pub mod storage;
