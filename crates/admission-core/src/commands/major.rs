//! Commands on a plan's majors.

use sqlx::{PgConnection, PgPool};
use tracing::info;

use admission_db::aggregate::PlanAggregate;
use admission_db::errors::{FK_MAJOR_MAJOR, FK_MAJOR_PLAN, FK_MAJOR_TRAINING_PROGRAM, UQ_MAJOR_NAME};
use admission_db::models::{AdmissionTrainingProgram, Major};
use admission_db::queries::majors::{self as major_queries, NewMajor};
use admission_db::queries::training_programs as tp_queries;

use super::requests::{MajorRequest, name_or};
use super::views::MajorView;
use super::{begin, commit, duplicate_name, load_aggregate, stale_reference, translate_write_error};
use crate::catalog::CatalogGateway;
use crate::consistency::{self, PlanNameScope};
use crate::error::{AdmissionError, AdmissionResult, Entity};

/// Add a major to a plan.
///
/// Checks, in order: the plan exists, the name is unused among the plan's
/// majors, the training program exists and is one of the plan's, the
/// catalog major exists. A blank name is replaced by the catalog major's
/// name, in which case the catalog lookup runs before the name check.
pub async fn add_major(
    pool: &PgPool,
    catalog: &dyn CatalogGateway,
    plan_id: i64,
    request: &MajorRequest,
) -> AdmissionResult<MajorView> {
    let mut tx = begin(pool).await?;
    let aggregate = load_aggregate(&mut tx, plan_id).await?;

    let checked = check_major(&mut tx, catalog, &aggregate, None, request).await?;

    let new = NewMajor {
        name: &checked.name,
        description: request.description.trim(),
        quota: request.quota,
        major_id: checked.major.id,
        admission_training_program_id: checked.training_program.id,
        admission_plan_id: plan_id,
    };
    let row = major_queries::insert_major(&mut *tx, &new)
        .await
        .map_err(|e| write_error(e, &new))?;
    commit(tx).await?;

    info!(plan_id, admission_major_id = row.id, name = %row.name, "major added");
    Ok(MajorView {
        admission_major: row,
        major: checked.major,
        admission_training_program: checked.training_program,
    })
}

/// Rewrite a plan major.
///
/// Checks, in order: the major exists, the plan exists, the major is one of
/// the plan's, the new name is unused by any other major of the plan, the
/// training program exists and is one of the plan's, the catalog major
/// exists.
pub async fn update_major(
    pool: &PgPool,
    catalog: &dyn CatalogGateway,
    plan_id: i64,
    admission_major_id: i64,
    request: &MajorRequest,
) -> AdmissionResult<MajorView> {
    let mut tx = begin(pool).await?;

    consistency::require_found(
        major_queries::get_major(&mut *tx, admission_major_id).await?,
        Entity::AdmissionMajor,
        admission_major_id,
    )?;
    let aggregate = load_aggregate(&mut tx, plan_id).await?;
    consistency::require_major_in_plan(&aggregate, admission_major_id)?;

    let checked = check_major(
        &mut tx,
        catalog,
        &aggregate,
        Some(admission_major_id),
        request,
    )
    .await?;

    let new = NewMajor {
        name: &checked.name,
        description: request.description.trim(),
        quota: request.quota,
        major_id: checked.major.id,
        admission_training_program_id: checked.training_program.id,
        admission_plan_id: plan_id,
    };
    let row = major_queries::update_major(&mut *tx, admission_major_id, &new)
        .await
        .map_err(|e| write_error(e, &new))?
        .ok_or(AdmissionError::not_found(Entity::AdmissionMajor, admission_major_id))?;
    commit(tx).await?;

    info!(plan_id, admission_major_id, "major updated");
    Ok(MajorView {
        admission_major: row,
        major: checked.major,
        admission_training_program: checked.training_program,
    })
}

/// Remove a major and its methods from a plan.
pub async fn delete_major(
    pool: &PgPool,
    plan_id: i64,
    admission_major_id: i64,
) -> AdmissionResult<()> {
    let mut tx = begin(pool).await?;

    consistency::require_found(
        major_queries::get_major(&mut *tx, admission_major_id).await?,
        Entity::AdmissionMajor,
        admission_major_id,
    )?;
    let aggregate = load_aggregate(&mut tx, plan_id).await?;
    consistency::require_major_in_plan(&aggregate, admission_major_id)?;

    major_queries::delete_major(&mut *tx, admission_major_id).await?;
    commit(tx).await?;

    info!(plan_id, admission_major_id, "major deleted");
    Ok(())
}

/// Everything a major write needs once the checks passed.
struct CheckedMajor {
    name: String,
    major: Major,
    training_program: AdmissionTrainingProgram,
}

async fn check_major(
    conn: &mut PgConnection,
    catalog: &dyn CatalogGateway,
    aggregate: &PlanAggregate,
    exclude_id: Option<i64>,
    request: &MajorRequest,
) -> AdmissionResult<CheckedMajor> {
    let requested = request.name.trim();

    let mut major = None;
    if requested.is_empty() {
        major = Some(find_major(catalog, request.major_id).await?);
    }
    let name = name_or(requested, major.as_ref().map_or("", |m| m.name.as_str())).to_owned();
    consistency::require_name_unique_in_plan(aggregate, PlanNameScope::Major, &name, exclude_id)?;

    let tp_id = request.admission_training_program_id;
    consistency::require_found(
        tp_queries::get_training_program(&mut *conn, tp_id).await?,
        Entity::AdmissionTrainingProgram,
        tp_id,
    )?;
    let training_program =
        consistency::require_training_program_in_plan(aggregate, tp_id)?.clone();

    let major = match major {
        Some(major) => major,
        None => find_major(catalog, request.major_id).await?,
    };

    Ok(CheckedMajor {
        name,
        major,
        training_program,
    })
}

async fn find_major(catalog: &dyn CatalogGateway, major_id: i64) -> AdmissionResult<Major> {
    consistency::require_found(catalog.find_major(major_id).await?, Entity::Major, major_id)
}

fn write_error(err: anyhow::Error, new: &NewMajor<'_>) -> AdmissionError {
    translate_write_error(err, |v| {
        duplicate_name(
            v,
            UQ_MAJOR_NAME,
            Entity::AdmissionMajor,
            new.name,
            Entity::AdmissionPlan,
            new.admission_plan_id,
        )
        .or_else(|| {
            stale_reference(
                v,
                &[
                    (FK_MAJOR_MAJOR, Entity::Major, new.major_id),
                    (
                        FK_MAJOR_TRAINING_PROGRAM,
                        Entity::AdmissionTrainingProgram,
                        new.admission_training_program_id,
                    ),
                    (FK_MAJOR_PLAN, Entity::AdmissionPlan, new.admission_plan_id),
                ],
            )
        })
    })
}
