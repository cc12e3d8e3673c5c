//! Infrastructure Layer

pub mod postgres;

#[cfg(test)]
pub(crate) mod memory;
