//! Admission plan composition: the consistency rules, the catalog gateway
//! and the aggregate commands built on them.

pub mod catalog;
pub mod commands;
pub mod consistency;
pub mod error;

pub use catalog::{CatalogGateway, PgCatalog};
pub use error::{AdmissionError, AdmissionResult, Entity, ErrorKind};
