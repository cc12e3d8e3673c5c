//! Platform Crate - Technical Infrastructure
//!
//! This crate provides shared technical foundations:
//! - Cryptographic utilities (OS randomness, hex encoding)
//! - Password hashing (Argon2id, NIST SP 800-63B compliant)
//! - Signed access tokens (HS256 JWT)
//! - URL slugs with collision-resistant suffixes
//! - HTTP metrics backed by an explicit Prometheus registry

pub mod crypto;
pub mod metrics;
pub mod password;
pub mod slug;
pub mod token;
