//! Database query functions for the `admission_majors` table.

use anyhow::{Context, Result};
use sqlx::PgExecutor;

use crate::models::AdmissionMajor;

/// Column values for inserting or rewriting a plan major.
#[derive(Debug, Clone)]
pub struct NewMajor<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub quota: i32,
    pub major_id: i64,
    pub admission_training_program_id: i64,
    pub admission_plan_id: i64,
}

/// Insert a major into a plan.
pub async fn insert_major<'e, E>(executor: E, new: &NewMajor<'_>) -> Result<AdmissionMajor>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, AdmissionMajor>(
        "INSERT INTO admission_majors \
         (name, description, quota, major_id, admission_training_program_id, admission_plan_id) \
         VALUES ($1, $2, $3, $4, $5, $6) \
         RETURNING *",
    )
    .bind(new.name)
    .bind(new.description)
    .bind(new.quota)
    .bind(new.major_id)
    .bind(new.admission_training_program_id)
    .bind(new.admission_plan_id)
    .fetch_one(executor)
    .await
    .context("failed to insert admission major")?;

    Ok(row)
}

/// Fetch a plan major by ID.
pub async fn get_major<'e, E>(executor: E, id: i64) -> Result<Option<AdmissionMajor>>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, AdmissionMajor>("SELECT * FROM admission_majors WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
        .context("failed to fetch admission major")?;

    Ok(row)
}

/// List the majors of a plan in insertion order.
pub async fn list_majors_for_plan<'e, E>(executor: E, plan_id: i64) -> Result<Vec<AdmissionMajor>>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, AdmissionMajor>(
        "SELECT * FROM admission_majors WHERE admission_plan_id = $1 ORDER BY id ASC",
    )
    .bind(plan_id)
    .fetch_all(executor)
    .await
    .context("failed to list admission majors for plan")?;

    Ok(rows)
}

/// Rewrite the mutable columns of a plan major. `admission_plan_id` in
/// `new` is ignored; a major never moves between plans.
pub async fn update_major<'e, E>(
    executor: E,
    id: i64,
    new: &NewMajor<'_>,
) -> Result<Option<AdmissionMajor>>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, AdmissionMajor>(
        "UPDATE admission_majors \
         SET name = $1, description = $2, quota = $3, major_id = $4, \
             admission_training_program_id = $5, updated_at = now() \
         WHERE id = $6 \
         RETURNING *",
    )
    .bind(new.name)
    .bind(new.description)
    .bind(new.quota)
    .bind(new.major_id)
    .bind(new.admission_training_program_id)
    .bind(id)
    .fetch_optional(executor)
    .await
    .context("failed to update admission major")?;

    Ok(row)
}

/// Delete a plan major together with its methods (cascade).
pub async fn delete_major<'e, E>(executor: E, id: i64) -> Result<bool>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM admission_majors WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await
        .context("failed to delete admission major")?;

    Ok(result.rows_affected() > 0)
}
