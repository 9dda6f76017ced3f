//! The catalog gateway: read-only lookups against the reference catalogs
//! (institutions, majors, training programs, admission methods, subject
//! groups).
//!
//! Commands depend on the [`CatalogGateway`] trait rather than on the
//! tables directly. Lookups are not part of the command transaction, so an
//! answer may be stale: a catalog row deleted since the lookup is caught by
//! its foreign key at write time, and subject groups are read again under a
//! key-share lock before they are linked.

use anyhow::Result;
use async_trait::async_trait;
use sqlx::PgPool;

use admission_db::models::{AdmissionMethod, Major, SubjectGroup, TrainingProgram};
use admission_db::queries::catalog;

/// Read-only access to the reference catalogs.
#[async_trait]
pub trait CatalogGateway: Send + Sync {
    async fn institution_exists(&self, id: i64) -> Result<bool>;

    async fn find_major(&self, id: i64) -> Result<Option<Major>>;

    async fn find_training_program(&self, id: i64) -> Result<Option<TrainingProgram>>;

    async fn find_admission_method(&self, id: i64) -> Result<Option<AdmissionMethod>>;

    /// Resolve as many of `ids` as exist. Unknown ids are left out; the
    /// caller decides whether a partial result is an error.
    async fn resolve_subject_groups(&self, ids: &[i64]) -> Result<Vec<SubjectGroup>>;
}

// Compile-time assertion: the gateway is used as `dyn CatalogGateway`.
const _: () = {
    fn _assert_object_safe(_: &dyn CatalogGateway) {}
};

/// [`CatalogGateway`] backed by the catalog tables in PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgCatalog {
    pool: PgPool,
}

impl PgCatalog {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogGateway for PgCatalog {
    async fn institution_exists(&self, id: i64) -> Result<bool> {
        catalog::institution_exists(&self.pool, id).await
    }

    async fn find_major(&self, id: i64) -> Result<Option<Major>> {
        catalog::get_major(&self.pool, id).await
    }

    async fn find_training_program(&self, id: i64) -> Result<Option<TrainingProgram>> {
        catalog::get_training_program(&self.pool, id).await
    }

    async fn find_admission_method(&self, id: i64) -> Result<Option<AdmissionMethod>> {
        catalog::get_admission_method(&self.pool, id).await
    }

    async fn resolve_subject_groups(&self, ids: &[i64]) -> Result<Vec<SubjectGroup>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        catalog::get_subject_groups(&self.pool, ids).await
    }
}
