//! Database query functions for the `admission_major_methods` and
//! `admission_major_method_subject_groups` tables.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use sqlx::{PgConnection, PgExecutor};

use crate::models::{AdmissionMajorMethod, PopulatedMajorMethod};

/// Column values for inserting or rewriting a major method.
#[derive(Debug, Clone)]
pub struct NewMajorMethod<'a> {
    pub name: &'a str,
    pub admission_method_id: i64,
    pub admission_major_id: i64,
}

/// Insert a major method row (without subject groups).
pub async fn insert_major_method<'e, E>(
    executor: E,
    new: &NewMajorMethod<'_>,
) -> Result<AdmissionMajorMethod>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, AdmissionMajorMethod>(
        "INSERT INTO admission_major_methods (name, admission_method_id, admission_major_id) \
         VALUES ($1, $2, $3) \
         RETURNING *",
    )
    .bind(new.name)
    .bind(new.admission_method_id)
    .bind(new.admission_major_id)
    .fetch_one(executor)
    .await
    .context("failed to insert admission major method")?;

    Ok(row)
}

/// Fetch a major method row by ID.
pub async fn get_major_method<'e, E>(executor: E, id: i64) -> Result<Option<AdmissionMajorMethod>>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, AdmissionMajorMethod>(
        "SELECT * FROM admission_major_methods WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
    .context("failed to fetch admission major method")?;

    Ok(row)
}

/// Rewrite the name and admission method of a major method.
pub async fn update_major_method<'e, E>(
    executor: E,
    id: i64,
    name: &str,
    admission_method_id: i64,
) -> Result<Option<AdmissionMajorMethod>>
where
    E: PgExecutor<'e>,
{
    let row = sqlx::query_as::<_, AdmissionMajorMethod>(
        "UPDATE admission_major_methods \
         SET name = $1, admission_method_id = $2, updated_at = now() \
         WHERE id = $3 \
         RETURNING *",
    )
    .bind(name)
    .bind(admission_method_id)
    .bind(id)
    .fetch_optional(executor)
    .await
    .context("failed to update admission major method")?;

    Ok(row)
}

/// Delete a major method; its subject-group links go with it.
pub async fn delete_major_method<'e, E>(executor: E, id: i64) -> Result<bool>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query("DELETE FROM admission_major_methods WHERE id = $1")
        .bind(id)
        .execute(executor)
        .await
        .context("failed to delete admission major method")?;

    Ok(result.rows_affected() > 0)
}

/// Subject-group ids linked to a major method, ascending.
pub async fn get_subject_group_ids<'e, E>(executor: E, method_id: i64) -> Result<Vec<i64>>
where
    E: PgExecutor<'e>,
{
    let ids: Vec<i64> = sqlx::query_scalar(
        "SELECT subject_group_id FROM admission_major_method_subject_groups \
         WHERE admission_major_method_id = $1 \
         ORDER BY subject_group_id",
    )
    .bind(method_id)
    .fetch_all(executor)
    .await
    .context("failed to fetch subject groups for major method")?;

    Ok(ids)
}

/// Replace the subject-group set of a major method.
///
/// Runs two statements; callers should hold a transaction.
pub async fn replace_subject_groups(
    conn: &mut PgConnection,
    method_id: i64,
    subject_group_ids: &[i64],
) -> Result<()> {
    sqlx::query(
        "DELETE FROM admission_major_method_subject_groups WHERE admission_major_method_id = $1",
    )
    .bind(method_id)
    .execute(&mut *conn)
    .await
    .context("failed to clear subject groups for major method")?;

    if subject_group_ids.is_empty() {
        return Ok(());
    }

    sqlx::query(
        "INSERT INTO admission_major_method_subject_groups \
         (admission_major_method_id, subject_group_id) \
         SELECT $1, UNNEST($2::BIGINT[]) \
         ON CONFLICT DO NOTHING",
    )
    .bind(method_id)
    .bind(subject_group_ids)
    .execute(&mut *conn)
    .await
    .context("failed to link subject groups to major method")?;

    Ok(())
}

/// List every method of every major in a plan, populated with subject
/// groups, ordered by method id.
pub async fn list_populated_methods_for_plan(
    conn: &mut PgConnection,
    plan_id: i64,
) -> Result<Vec<PopulatedMajorMethod>> {
    let methods = sqlx::query_as::<_, AdmissionMajorMethod>(
        "SELECT mm.* FROM admission_major_methods mm \
         JOIN admission_majors m ON m.id = mm.admission_major_id \
         WHERE m.admission_plan_id = $1 \
         ORDER BY mm.id ASC",
    )
    .bind(plan_id)
    .fetch_all(&mut *conn)
    .await
    .context("failed to list admission major methods for plan")?;

    let links: Vec<(i64, i64)> = sqlx::query_as(
        "SELECT l.admission_major_method_id, l.subject_group_id \
         FROM admission_major_method_subject_groups l \
         JOIN admission_major_methods mm ON mm.id = l.admission_major_method_id \
         JOIN admission_majors m ON m.id = mm.admission_major_id \
         WHERE m.admission_plan_id = $1 \
         ORDER BY l.admission_major_method_id, l.subject_group_id",
    )
    .bind(plan_id)
    .fetch_all(&mut *conn)
    .await
    .context("failed to list subject-group links for plan")?;

    let mut by_method: BTreeMap<i64, Vec<i64>> = BTreeMap::new();
    for (method_id, group_id) in links {
        by_method.entry(method_id).or_default().push(group_id);
    }

    Ok(methods
        .into_iter()
        .map(|method| {
            let subject_group_ids = by_method.remove(&method.id).unwrap_or_default();
            PopulatedMajorMethod {
                method,
                subject_group_ids,
            }
        })
        .collect())
}
