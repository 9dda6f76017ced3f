//! Database query functions for the `admission_training_programs` table.

use anyhow::{Context, Result};
use sqlx::PgExecutor;

use crate::models::AdmissionTrainingProgram;

/// Column values for inserting or rewriting a plan training program.
#[derive(Debug, Clone)]
pub struct NewTrainingProgram<'a> {
    pub name: &'a str,
    pub training_program_id: i64,
    pub admission_plan_id: i64,
}

/// Insert a training program into a plan.
///
/// Fails with a unique violation on
/// [`crate::errors::UQ_TRAINING_PROGRAM_NAME`] when the plan already has a
/// training program with this name.
pub async fn insert_training_program<'e, E>(
    executor: E,
    new: &NewTrainingProgram<'_>,
) -> Result<AdmissionTrainingProgram>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, AdmissionTrainingProgram>(
        "INSERT INTO admission_training_programs (name, training_program_id, admission_plan_id) \
         VALUES ($1, $2, $3) \
         RETURNING *",
    )
    .bind(new.name)
    .bind(new.training_program_id)
    .bind(new.admission_plan_id)
    .fetch_one(executor)
    .await
    .context("failed to insert admission training program")?;

    Ok(row)
}

/// Fetch a plan training program by ID.
pub async fn get_training_program<'e, E>(
    executor: E,
    id: i64,
) -> Result<Option<AdmissionTrainingProgram>>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, AdmissionTrainingProgram>(
        "SELECT * FROM admission_training_programs WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
    .context("failed to fetch admission training program")?;

    Ok(row)
}

/// List the training programs of a plan in insertion order.
pub async fn list_training_programs_for_plan<'e, E>(
    executor: E,
    plan_id: i64,
) -> Result<Vec<AdmissionTrainingProgram>>
where
    E: PgExecutor<'e>,
{
    let rows = sqlx::query_as::<_, AdmissionTrainingProgram>(
        "SELECT * FROM admission_training_programs WHERE admission_plan_id = $1 ORDER BY id ASC",
    )
    .bind(plan_id)
    .fetch_all(executor)
    .await
    .context("failed to list admission training programs for plan")?;

    Ok(rows)
}

/// Rewrite the name and catalog reference of a plan training program.
/// The owning plan never changes.
pub async fn update_training_program<'e, E>(
    executor: E,
    id: i64,
    name: &str,
    training_program_id: i64,
) -> Result<Option<AdmissionTrainingProgram>>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, AdmissionTrainingProgram>(
        "UPDATE admission_training_programs \
         SET name = $1, training_program_id = $2, updated_at = now() \
         WHERE id = $3 \
         RETURNING *",
    )
    .bind(name)
    .bind(training_program_id)
    .bind(id)
    .fetch_optional(executor)
    .await
    .context("failed to update admission training program")?;

    Ok(row)
}

/// Delete a plan training program. A major still pointing at it makes the
/// statement fail with a foreign key violation.
pub async fn delete_training_program<'e, E>(executor: E, id: i64) -> Result<bool>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM admission_training_programs WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await
        .context("failed to delete admission training program")?;

    Ok(result.rows_affected() > 0)
}
