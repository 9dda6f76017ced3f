//! Commands on a plan's training programs.

use sqlx::PgPool;
use tracing::info;

use admission_db::errors::{
    FK_MAJOR_TRAINING_PROGRAM, FK_TP_PLAN, FK_TP_TRAINING_PROGRAM,
    UQ_TRAINING_PROGRAM_NAME,
};
use admission_db::queries::training_programs::{self as tp_queries, NewTrainingProgram};

use super::requests::TrainingProgramRequest;
use super::views::TrainingProgramView;
use super::{begin, commit, duplicate_name, load_aggregate, stale_reference, translate_write_error};
use crate::catalog::CatalogGateway;
use crate::consistency::{self, PlanNameScope};
use crate::error::{AdmissionError, AdmissionResult, Entity};

/// Add a training program to a plan.
///
/// Checks, in order: the plan exists, the catalog training program exists,
/// the name is unused among the plan's training programs.
pub async fn add_training_program(
    pool: &PgPool,
    catalog: &dyn CatalogGateway,
    plan_id: i64,
    request: &TrainingProgramRequest,
) -> AdmissionResult<TrainingProgramView> {
    let mut tx = begin(pool).await?;
    let aggregate = load_aggregate(&mut tx, plan_id).await?;

    let training_program = consistency::require_found(
        catalog
            .find_training_program(request.training_program_id)
            .await?,
        Entity::TrainingProgram,
        request.training_program_id,
    )?;
    let name = request.name.trim();
    consistency::require_name_unique_in_plan(
        &aggregate,
        PlanNameScope::TrainingProgram,
        name,
        None,
    )?;

    let new = NewTrainingProgram {
        name,
        training_program_id: training_program.id,
        admission_plan_id: plan_id,
    };
    let row = tp_queries::insert_training_program(&mut *tx, &new)
        .await
        .map_err(|e| write_error(e, &new))?;
    commit(tx).await?;

    info!(
        plan_id,
        admission_training_program_id = row.id,
        name = %row.name,
        "training program added"
    );
    Ok(TrainingProgramView {
        admission_training_program: row,
        training_program,
    })
}

/// Rename a plan training program or point it at another catalog entry.
///
/// Checks, in order: the training program exists, the catalog training
/// program exists, the plan exists, the training program belongs to the
/// plan, the new name is unused by any other training program of the plan.
pub async fn update_training_program(
    pool: &PgPool,
    catalog: &dyn CatalogGateway,
    plan_id: i64,
    admission_training_program_id: i64,
    request: &TrainingProgramRequest,
) -> AdmissionResult<TrainingProgramView> {
    let mut tx = begin(pool).await?;

    consistency::require_found(
        tp_queries::get_training_program(&mut *tx, admission_training_program_id).await?,
        Entity::AdmissionTrainingProgram,
        admission_training_program_id,
    )?;
    let training_program = consistency::require_found(
        catalog
            .find_training_program(request.training_program_id)
            .await?,
        Entity::TrainingProgram,
        request.training_program_id,
    )?;
    let aggregate = load_aggregate(&mut tx, plan_id).await?;
    consistency::require_training_program_in_plan(&aggregate, admission_training_program_id)?;
    let name = request.name.trim();
    consistency::require_name_unique_in_plan(
        &aggregate,
        PlanNameScope::TrainingProgram,
        name,
        Some(admission_training_program_id),
    )?;

    let new = NewTrainingProgram {
        name,
        training_program_id: training_program.id,
        admission_plan_id: plan_id,
    };
    let row = tp_queries::update_training_program(
        &mut *tx,
        admission_training_program_id,
        new.name,
        new.training_program_id,
    )
    .await
    .map_err(|e| write_error(e, &new))?
    .ok_or(AdmissionError::not_found(
        Entity::AdmissionTrainingProgram,
        admission_training_program_id,
    ))?;
    commit(tx).await?;

    info!(plan_id, admission_training_program_id, "training program updated");
    Ok(TrainingProgramView {
        admission_training_program: row,
        training_program,
    })
}

/// Remove a training program from a plan. Refused while any major of the
/// plan still uses it.
pub async fn delete_training_program(
    pool: &PgPool,
    plan_id: i64,
    admission_training_program_id: i64,
) -> AdmissionResult<()> {
    let mut tx = begin(pool).await?;

    consistency::require_found(
        tp_queries::get_training_program(&mut *tx, admission_training_program_id).await?,
        Entity::AdmissionTrainingProgram,
        admission_training_program_id,
    )?;
    let aggregate = load_aggregate(&mut tx, plan_id).await?;
    consistency::require_training_program_in_plan(&aggregate, admission_training_program_id)?;
    consistency::require_training_program_not_referenced(&aggregate, admission_training_program_id)?;

    tp_queries::delete_training_program(&mut *tx, admission_training_program_id)
        .await
        .map_err(|e| {
            translate_write_error(e, |v| {
                let in_use = v.constraint() == Some(FK_MAJOR_TRAINING_PROGRAM);
                in_use.then(|| AdmissionError::InUse {
                    entity: Entity::AdmissionTrainingProgram,
                    id: admission_training_program_id,
                    referenced_by: Entity::AdmissionMajor,
                })
            })
        })?;
    commit(tx).await?;

    info!(plan_id, admission_training_program_id, "training program deleted");
    Ok(())
}

fn write_error(err: anyhow::Error, new: &NewTrainingProgram<'_>) -> AdmissionError {
    translate_write_error(err, |v| {
        duplicate_name(
            v,
            UQ_TRAINING_PROGRAM_NAME,
            Entity::AdmissionTrainingProgram,
            new.name,
            Entity::AdmissionPlan,
            new.admission_plan_id,
        )
        .or_else(|| {
            stale_reference(
                v,
                &[
                    (FK_TP_TRAINING_PROGRAM, Entity::TrainingProgram, new.training_program_id),
                    (FK_TP_PLAN, Entity::AdmissionPlan, new.admission_plan_id),
                ],
            )
        })
    })
}
