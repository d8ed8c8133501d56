//! Storefront domain model: pure types and rules, no I/O.
pub mod aggregates;
pub mod events;
pub mod pricing;
pub mod subscription;
pub mod value_objects;
