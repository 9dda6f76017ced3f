//! Per-table query functions.
//!
//! Every function is generic over [`sqlx::PgExecutor`] so it runs the same
//! against a `&PgPool` or inside a transaction (`&mut *tx`). Functions that
//! issue several statements take `&mut PgConnection` instead.

pub mod catalog;
pub mod major_methods;
pub mod majors;
pub mod plans;
pub mod training_programs;
