//! Commands on the plan root: add, update, delete, and the populated reads.

use sqlx::PgPool;
use tracing::info;

use admission_db::aggregate::{PlanAggregate, begin_snapshot};
use admission_db::errors::FK_PLAN_INSTITUTION;
use admission_db::models::AdmissionPlan;
use admission_db::queries::plans::{self as plan_queries, NewPlan};

use super::requests::PlanRequest;
use super::views::PlanView;
use super::{begin, commit, load_aggregate, stale_reference, translate_write_error};
use crate::catalog::CatalogGateway;
use crate::consistency;
use crate::error::{AdmissionError, AdmissionResult, Entity};

/// Create an empty plan owned by an existing institution.
pub async fn add_plan(
    pool: &PgPool,
    catalog: &dyn CatalogGateway,
    request: &PlanRequest,
) -> AdmissionResult<PlanView> {
    let exists = catalog.institution_exists(request.institution_id).await?;
    consistency::require_institution_exists(exists, request.institution_id)?;

    let new = new_plan(request);
    let plan = plan_queries::insert_plan(pool, &new)
        .await
        .map_err(|e| institution_reference(e, request.institution_id))?;

    info!(plan_id = plan.id, name = %plan.name, year = plan.year, "admission plan created");
    Ok(PlanAggregate::new(plan).into())
}

/// Rewrite the fields of a plan. Children are untouched.
pub async fn update_plan(
    pool: &PgPool,
    catalog: &dyn CatalogGateway,
    plan_id: i64,
    request: &PlanRequest,
) -> AdmissionResult<PlanView> {
    let mut tx = begin(pool).await?;
    let mut aggregate = load_aggregate(&mut tx, plan_id).await?;

    let exists = catalog.institution_exists(request.institution_id).await?;
    consistency::require_institution_exists(exists, request.institution_id)?;

    let new = new_plan(request);
    let plan = plan_queries::update_plan(&mut *tx, plan_id, &new)
        .await
        .map_err(|e| institution_reference(e, request.institution_id))?
        .ok_or(AdmissionError::not_found(Entity::AdmissionPlan, plan_id))?;
    commit(tx).await?;

    info!(plan_id, "admission plan updated");
    aggregate.plan = plan;
    Ok(aggregate.into())
}

/// Delete a plan and everything it owns. Nothing guards this: the whole
/// aggregate goes, so no reference into it survives.
pub async fn delete_plan(pool: &PgPool, plan_id: i64) -> AdmissionResult<()> {
    let deleted = plan_queries::delete_plan(pool, plan_id).await?;
    if !deleted {
        return Err(AdmissionError::not_found(Entity::AdmissionPlan, plan_id));
    }
    info!(plan_id, "admission plan deleted");
    Ok(())
}

/// Read a plan with all of its children.
pub async fn get_plan(pool: &PgPool, plan_id: i64) -> AdmissionResult<PlanView> {
    let mut tx = begin_snapshot(pool).await?;
    let aggregate = load_aggregate(&mut tx, plan_id).await?;
    commit(tx).await?;
    Ok(aggregate.into())
}

/// List plan rows (without children).
pub async fn list_plans(pool: &PgPool) -> AdmissionResult<Vec<AdmissionPlan>> {
    Ok(plan_queries::list_plans(pool).await?)
}

fn new_plan(request: &PlanRequest) -> NewPlan<'_> {
    NewPlan {
        name: request.name.trim(),
        description: request.description.trim(),
        year: request.year,
        institution_id: request.institution_id,
    }
}

fn institution_reference(err: anyhow::Error, institution_id: i64) -> AdmissionError {
    translate_write_error(err, |v| {
        stale_reference(v, &[(FK_PLAN_INSTITUTION, Entity::Institution, institution_id)])
    })
}
