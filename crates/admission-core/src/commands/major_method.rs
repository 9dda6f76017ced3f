//! Commands on the admission methods of a plan major.

use sqlx::{PgConnection, PgPool};
use tracing::info;

use admission_db::aggregate::PlanAggregate;
use admission_db::errors::{
    FK_METHOD_ADMISSION_METHOD, FK_METHOD_MAJOR, UQ_MAJOR_METHOD_NAME,
};
use admission_db::models::{AdmissionMethod, SubjectGroup};
use admission_db::queries::catalog as catalog_queries;
use admission_db::queries::major_methods::{self as method_queries, NewMajorMethod};
use admission_db::queries::majors as major_queries;

use super::requests::{MajorMethodRequest, name_or};
use super::views::MajorMethodView;
use super::{begin, commit, duplicate_name, load_aggregate, stale_reference, translate_write_error};
use crate::catalog::CatalogGateway;
use crate::consistency;
use crate::error::{AdmissionError, AdmissionResult, Entity};

/// Add an admission method to a plan major.
///
/// Checks, in order: the major exists, the plan exists, the major is one of
/// the plan's, the name is unused among the major's methods, the catalog
/// admission method exists, every subject group resolves.
pub async fn add_major_method(
    pool: &PgPool,
    catalog: &dyn CatalogGateway,
    plan_id: i64,
    admission_major_id: i64,
    request: &MajorMethodRequest,
) -> AdmissionResult<MajorMethodView> {
    let mut tx = begin(pool).await?;
    let aggregate = load_major_scope(&mut tx, plan_id, admission_major_id).await?;

    let checked = check_method(
        &mut tx,
        catalog,
        &aggregate,
        admission_major_id,
        None,
        request,
    )
    .await?;

    let new = NewMajorMethod {
        name: &checked.name,
        admission_method_id: checked.admission_method.id,
        admission_major_id,
    };
    let row = method_queries::insert_major_method(&mut *tx, &new)
        .await
        .map_err(|e| write_error(e, &new))?;
    method_queries::replace_subject_groups(&mut tx, row.id, &checked.subject_group_ids)
        .await
        .map_err(|e| write_error(e, &new))?;
    commit(tx).await?;

    info!(
        plan_id,
        admission_major_id,
        admission_major_method_id = row.id,
        subject_groups = checked.subject_groups.len(),
        "major method added"
    );
    Ok(MajorMethodView {
        admission_major_method: row,
        admission_method: checked.admission_method,
        subject_groups: checked.subject_groups,
    })
}

/// Rewrite a major method and replace its subject-group set.
///
/// The method must belong to the major named by `admission_major_id`; a
/// method of another major is rejected before any other field is looked at.
pub async fn update_major_method(
    pool: &PgPool,
    catalog: &dyn CatalogGateway,
    plan_id: i64,
    admission_major_id: i64,
    admission_major_method_id: i64,
    request: &MajorMethodRequest,
) -> AdmissionResult<MajorMethodView> {
    let mut tx = begin(pool).await?;

    let method = consistency::require_found(
        method_queries::get_major_method(&mut *tx, admission_major_method_id).await?,
        Entity::AdmissionMajorMethod,
        admission_major_method_id,
    )?;
    let aggregate = load_major_scope(&mut tx, plan_id, admission_major_id).await?;
    consistency::require_method_belongs_to_major(&method, admission_major_id)?;

    let checked = check_method(
        &mut tx,
        catalog,
        &aggregate,
        admission_major_id,
        Some(admission_major_method_id),
        request,
    )
    .await?;

    let new = NewMajorMethod {
        name: &checked.name,
        admission_method_id: checked.admission_method.id,
        admission_major_id,
    };
    let row = method_queries::update_major_method(
        &mut *tx,
        admission_major_method_id,
        new.name,
        new.admission_method_id,
    )
    .await
    .map_err(|e| write_error(e, &new))?
    .ok_or(AdmissionError::not_found(
        Entity::AdmissionMajorMethod,
        admission_major_method_id,
    ))?;
    method_queries::replace_subject_groups(&mut tx, row.id, &checked.subject_group_ids)
        .await
        .map_err(|e| write_error(e, &new))?;
    commit(tx).await?;

    info!(plan_id, admission_major_id, admission_major_method_id, "major method updated");
    Ok(MajorMethodView {
        admission_major_method: row,
        admission_method: checked.admission_method,
        subject_groups: checked.subject_groups,
    })
}

/// Remove a method from a major.
pub async fn delete_major_method(
    pool: &PgPool,
    plan_id: i64,
    admission_major_id: i64,
    admission_major_method_id: i64,
) -> AdmissionResult<()> {
    let mut tx = begin(pool).await?;

    let method = consistency::require_found(
        method_queries::get_major_method(&mut *tx, admission_major_method_id).await?,
        Entity::AdmissionMajorMethod,
        admission_major_method_id,
    )?;
    load_major_scope(&mut tx, plan_id, admission_major_id).await?;
    consistency::require_method_belongs_to_major(&method, admission_major_id)?;

    method_queries::delete_major_method(&mut *tx, admission_major_method_id).await?;
    commit(tx).await?;

    info!(plan_id, admission_major_id, admission_major_method_id, "major method deleted");
    Ok(())
}

/// The major exists, the plan exists, and the major is one of the plan's.
async fn load_major_scope(
    conn: &mut PgConnection,
    plan_id: i64,
    admission_major_id: i64,
) -> AdmissionResult<PlanAggregate> {
    consistency::require_found(
        major_queries::get_major(&mut *conn, admission_major_id).await?,
        Entity::AdmissionMajor,
        admission_major_id,
    )?;
    let aggregate = load_aggregate(conn, plan_id).await?;
    consistency::require_major_in_plan(&aggregate, admission_major_id)?;
    Ok(aggregate)
}

struct CheckedMethod {
    name: String,
    admission_method: AdmissionMethod,
    subject_group_ids: Vec<i64>,
    subject_groups: Vec<SubjectGroup>,
}

async fn check_method(
    conn: &mut PgConnection,
    catalog: &dyn CatalogGateway,
    aggregate: &PlanAggregate,
    admission_major_id: i64,
    exclude_id: Option<i64>,
    request: &MajorMethodRequest,
) -> AdmissionResult<CheckedMethod> {
    let requested = request.name.trim();

    let mut admission_method = None;
    if requested.is_empty() {
        admission_method = Some(find_admission_method(catalog, request.admission_method_id).await?);
    }
    let name = name_or(
        requested,
        admission_method.as_ref().map_or("", |m| m.name.as_str()),
    )
    .to_owned();
    consistency::require_method_name_unique(aggregate, admission_major_id, &name, exclude_id)?;

    let admission_method = match admission_method {
        Some(method) => method,
        None => find_admission_method(catalog, request.admission_method_id).await?,
    };

    let resolved = catalog
        .resolve_subject_groups(&request.subject_group_ids)
        .await?;
    consistency::require_subject_groups_resolve(&request.subject_group_ids, &resolved)?;

    // The gateway may be stale: resolve again under a key-share lock so no
    // linked group can be deleted before commit.
    let subject_groups = if request.subject_group_ids.is_empty() {
        Vec::new()
    } else {
        catalog_queries::lock_subject_groups(&mut *conn, &request.subject_group_ids).await?
    };
    let subject_group_ids =
        consistency::require_subject_groups_resolve(&request.subject_group_ids, &subject_groups)?;

    Ok(CheckedMethod {
        name,
        admission_method,
        subject_group_ids,
        subject_groups,
    })
}

async fn find_admission_method(
    catalog: &dyn CatalogGateway,
    admission_method_id: i64,
) -> AdmissionResult<AdmissionMethod> {
    consistency::require_found(
        catalog.find_admission_method(admission_method_id).await?,
        Entity::AdmissionMethod,
        admission_method_id,
    )
}

fn write_error(err: anyhow::Error, new: &NewMajorMethod<'_>) -> AdmissionError {
    translate_write_error(err, |v| {
        duplicate_name(
            v,
            UQ_MAJOR_METHOD_NAME,
            Entity::AdmissionMajorMethod,
            new.name,
            Entity::AdmissionMajor,
            new.admission_major_id,
        )
        .or_else(|| {
            stale_reference(
                v,
                &[
                    (
                        FK_METHOD_ADMISSION_METHOD,
                        Entity::AdmissionMethod,
                        new.admission_method_id,
                    ),
                    (FK_METHOD_MAJOR, Entity::AdmissionMajor, new.admission_major_id),
                ],
            )
        })
    })
}
