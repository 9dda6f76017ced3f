//! Persistence for admission plans: connection pool, embedded migrations,
//! row models, per-table queries and the whole-aggregate loader.

pub mod aggregate;
pub mod config;
pub mod errors;
pub mod models;
pub mod pool;
pub mod queries;
