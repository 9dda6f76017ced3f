//! Aggregate commands over admission plans.
//!
//! Each command is one transaction: load the plan aggregate, run the
//! consistency rules, write, commit. Every rejection happens before the
//! first write, and a dropped transaction rolls back whatever storage-level
//! guard fired during the write itself.

pub mod major;
pub mod major_method;
pub mod plan;
pub mod requests;
pub mod training_program;
pub mod views;

use anyhow::Context;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use admission_db::aggregate::{PlanAggregate, load_plan_aggregate};
use admission_db::errors::{self, ConstraintViolation};

use crate::error::{AdmissionError, AdmissionResult, Entity};

pub use major::{add_major, delete_major, update_major};
pub use major_method::{add_major_method, delete_major_method, update_major_method};
pub use plan::{add_plan, delete_plan, get_plan, list_plans, update_plan};
pub use requests::{MajorMethodRequest, MajorRequest, PlanRequest, TrainingProgramRequest};
pub use training_program::{
    add_training_program, delete_training_program, update_training_program,
};
pub use views::{MajorMethodView, MajorView, PlanMajorView, PlanView, TrainingProgramView};

async fn begin(pool: &PgPool) -> AdmissionResult<Transaction<'static, Postgres>> {
    let tx = pool.begin().await.context("failed to begin transaction")?;
    Ok(tx)
}

async fn commit(tx: Transaction<'static, Postgres>) -> AdmissionResult<()> {
    tx.commit().await.context("failed to commit transaction")?;
    Ok(())
}

/// Load the aggregate of `plan_id` or reject with `NotFound`.
async fn load_aggregate(conn: &mut PgConnection, plan_id: i64) -> AdmissionResult<PlanAggregate> {
    load_plan_aggregate(conn, plan_id)
        .await?
        .ok_or(AdmissionError::not_found(Entity::AdmissionPlan, plan_id))
}

/// Map a failed write to a domain error when a storage constraint caught
/// what the in-memory checks could not see (a concurrent command, or a
/// catalog row deleted since it was looked up). Other failures stay
/// storage errors.
fn translate_write_error(
    err: anyhow::Error,
    translate: impl FnOnce(&ConstraintViolation) -> Option<AdmissionError>,
) -> AdmissionError {
    match errors::constraint_violation(&err).as_ref().and_then(translate) {
        Some(domain) => domain,
        None => AdmissionError::Storage(err),
    }
}

/// A foreign key named in `references` failed: the referenced row is gone.
fn stale_reference(
    violation: &ConstraintViolation,
    references: &[(&str, Entity, i64)],
) -> Option<AdmissionError> {
    if !matches!(violation, ConstraintViolation::ForeignKey { .. }) {
        return None;
    }
    let constraint = violation.constraint()?;
    references
        .iter()
        .find(|(name, _, _)| *name == constraint)
        .map(|(_, entity, id)| AdmissionError::not_found(*entity, *id))
}

/// A unique index named `constraint` failed: a concurrent command committed
/// the same name first.
fn duplicate_name(
    violation: &ConstraintViolation,
    constraint: &str,
    entity: Entity,
    name: &str,
    scope: Entity,
    scope_id: i64,
) -> Option<AdmissionError> {
    let unique = matches!(violation, ConstraintViolation::Unique { .. });
    if !unique || violation.constraint() != Some(constraint) {
        return None;
    }
    Some(AdmissionError::DuplicateName {
        entity,
        name: name.to_owned(),
        scope,
        scope_id,
    })
}
