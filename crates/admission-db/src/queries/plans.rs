//! Database query functions for the `admission_plans` table.

use anyhow::{Context, Result};
use sqlx::PgExecutor;

use crate::models::AdmissionPlan;

/// Column values for inserting or rewriting a plan row.
#[derive(Debug, Clone)]
pub struct NewPlan<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub year: i32,
    pub institution_id: i64,
}

/// Insert a new plan row and return it with server-generated defaults.
pub async fn insert_plan<'e, E>(executor: E, new: &NewPlan<'_>) -> Result<AdmissionPlan>
where
    E: PgExecutor<'e>,
{
    let plan = sqlx::query_as::<_, AdmissionPlan>(
        "INSERT INTO admission_plans (name, description, year, institution_id) \
         VALUES ($1, $2, $3, $4) \
         RETURNING *",
    )
    .bind(new.name)
    .bind(new.description)
    .bind(new.year)
    .bind(new.institution_id)
    .fetch_one(executor)
    .await
    .context("failed to insert admission plan")?;

    Ok(plan)
}

/// Fetch a plan by its ID.
pub async fn get_plan<'e, E>(executor: E, id: i64) -> Result<Option<AdmissionPlan>>
where
    E: PgExecutor<'e>,
{
    let plan = sqlx::query_as::<_, AdmissionPlan>("SELECT * FROM admission_plans WHERE id = $1")
        .bind(id)
        .fetch_optional(executor)
        .await
        .context("failed to fetch admission plan")?;

    Ok(plan)
}

/// List all plans, newest admission year first.
pub async fn list_plans<'e, E>(executor: E) -> Result<Vec<AdmissionPlan>>
where
    E: PgExecutor<'e>,
{
    let plans = sqlx::query_as::<_, AdmissionPlan>(
        "SELECT * FROM admission_plans ORDER BY year DESC, id ASC",
    )
    .fetch_all(executor)
    .await
    .context("failed to list admission plans")?;

    Ok(plans)
}

/// Overwrite the mutable columns of a plan. Returns `None` when no row has
/// the given id.
pub async fn update_plan<'e, E>(
    executor: E,
    id: i64,
    new: &NewPlan<'_>,
) -> Result<Option<AdmissionPlan>>
where
    E: PgExecutor<'e>,
{
    let plan = sqlx::query_as::<_, AdmissionPlan>(
        "UPDATE admission_plans \
         SET name = $1, description = $2, year = $3, institution_id = $4, updated_at = now() \
         WHERE id = $5 \
         RETURNING *",
    )
    .bind(new.name)
    .bind(new.description)
    .bind(new.year)
    .bind(new.institution_id)
    .bind(id)
    .fetch_optional(executor)
    .await
    .context("failed to update admission plan")?;

    Ok(plan)
}

/// Delete a plan. Training programs, majors and major methods go with it
/// through `ON DELETE CASCADE`. Returns `false` when nothing was deleted.
pub async fn delete_plan<'e, E>(executor: E, id: i64) -> Result<bool>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM admission_plans WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await
        .context("failed to delete admission plan")?;

    Ok(result.rows_affected() > 0)
}
