//! Read access to the lookup catalogs (`institutions`, `majors`,
//! `training_programs`, `admission_methods`, `subject_groups`).
//!
//! The plan composition core never mutates these tables. The `insert_*`
//! functions exist for seeding (tests, fixtures).

use anyhow::{Context, Result};
use sqlx::PgExecutor;

use crate::models::{AdmissionMethod, Institution, Major, SubjectGroup, TrainingProgram};

/// Whether an institution with this id exists.
pub async fn institution_exists<'e, E>(executor: E, id: i64) -> Result<bool>
where
    E: PgExecutor<'e>,
{
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM institutions WHERE id = $1)")
        .bind(id)
        .fetch_one(executor)
        .await
        .context("failed to check institution existence")?;

    Ok(exists)
}

/// Fetch a catalog major.
pub async fn get_major<'e, E>(executor: E, id: i64) -> Result<Option<Major>>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, Major>("SELECT id, code, name FROM majors WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
        .context("failed to fetch major")?;

    Ok(row)
}

/// Fetch a catalog training program.
pub async fn get_training_program<'e, E>(executor: E, id: i64) -> Result<Option<TrainingProgram>>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, TrainingProgram>(
        "SELECT id, name FROM training_programs WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
    .context("failed to fetch training program")?;

    Ok(row)
}

/// Fetch a catalog admission method.
pub async fn get_admission_method<'e, E>(executor: E, id: i64) -> Result<Option<AdmissionMethod>>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, AdmissionMethod>(
        "SELECT id, name FROM admission_methods WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
    .context("failed to fetch admission method")?;

    Ok(row)
}

/// Fetch every subject group whose id is in `ids`. Unknown ids are simply
/// absent from the result; callers compare against the request.
pub async fn get_subject_groups<'e, E>(executor: E, ids: &[i64]) -> Result<Vec<SubjectGroup>>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, SubjectGroup>(
        "SELECT id, code, name FROM subject_groups WHERE id = ANY($1) ORDER BY id",
    )
    .bind(ids)
    .fetch_all(executor)
    .await
    .context("failed to fetch subject groups")?;

    Ok(rows)
}

/// Like [`get_subject_groups`], but takes a key-share lock on every row
/// found, so the rows cannot be deleted until the caller's transaction ends.
pub async fn lock_subject_groups<'e, E>(executor: E, ids: &[i64]) -> Result<Vec<SubjectGroup>>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, SubjectGroup>(
        "SELECT id, code, name FROM subject_groups WHERE id = ANY($1) ORDER BY id FOR KEY SHARE",
    )
    .bind(ids)
    .fetch_all(executor)
    .await
    .context("failed to lock subject groups")?;

    Ok(rows)
}

// -----------------------------------------------------------------------
// Seeding
// -----------------------------------------------------------------------

/// Insert an institution.
pub async fn insert_institution<'e, E>(executor: E, name: &str) -> Result<Institution>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, Institution>(
        "INSERT INTO institutions (name) VALUES ($1) RETURNING id, name",
    )
    .bind(name)
    .fetch_one(executor)
    .await
    .context("failed to insert institution")?;

    Ok(row)
}

/// Insert a catalog major.
pub async fn insert_major<'e, E>(executor: E, code: &str, name: &str) -> Result<Major>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, Major>(
        "INSERT INTO majors (code, name) VALUES ($1, $2) RETURNING id, code, name",
    )
    .bind(code)
    .bind(name)
    .fetch_one(executor)
    .await
    .context("failed to insert major")?;

    Ok(row)
}

/// Insert a catalog training program.
pub async fn insert_training_program<'e, E>(executor: E, name: &str) -> Result<TrainingProgram>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, TrainingProgram>(
        "INSERT INTO training_programs (name) VALUES ($1) RETURNING id, name",
    )
    .bind(name)
    .fetch_one(executor)
    .await
    .context("failed to insert training program")?;

    Ok(row)
}

/// Insert a catalog admission method.
pub async fn insert_admission_method<'e, E>(executor: E, name: &str) -> Result<AdmissionMethod>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, AdmissionMethod>(
        "INSERT INTO admission_methods (name) VALUES ($1) RETURNING id, name",
    )
    .bind(name)
    .fetch_one(executor)
    .await
    .context("failed to insert admission method")?;

    Ok(row)
}

/// Insert a catalog subject group.
pub async fn insert_subject_group<'e, E>(executor: E, code: &str, name: &str) -> Result<SubjectGroup>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, SubjectGroup>(
        "INSERT INTO subject_groups (code, name) VALUES ($1, $2) RETURNING id, code, name",
    )
    .bind(code)
    .bind(name)
    .fetch_one(executor)
    .await
    .context("failed to insert subject group")?;

    Ok(row)
}
