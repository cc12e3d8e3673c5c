//! Domain Layer
//!
//! Entities, value objects and repository traits. No framework types.

pub mod entity;
pub mod repository;
pub mod value_object;
