//! Integration tests for the admission plan tables and the aggregate loader.

use sqlx::PgPool;

use admission_db::aggregate::{begin_snapshot, load_plan_aggregate};
use admission_db::errors::{self, ConstraintViolation};
use admission_db::models::{AdmissionMajor, AdmissionPlan, AdmissionTrainingProgram};
use admission_db::queries::major_methods::{self, NewMajorMethod};
use admission_db::queries::majors::{self, NewMajor};
use admission_db::queries::plans::{self, NewPlan};
use admission_db::queries::training_programs::{self, NewTrainingProgram};
use admission_test_utils::{CatalogFixture, create_test_db, drop_test_db, seed_catalog};

async fn insert_plan(pool: &PgPool, fx: &CatalogFixture, name: &str) -> AdmissionPlan {
    plans::insert_plan(
        pool,
        &NewPlan {
            name,
            description: "regular intake",
            year: 2026,
            institution_id: fx.institution.id,
        },
    )
    .await
    .expect("insert_plan should succeed")
}

async fn insert_tp(
    pool: &PgPool,
    fx: &CatalogFixture,
    plan_id: i64,
    name: &str,
) -> AdmissionTrainingProgram {
    training_programs::insert_training_program(
        pool,
        &NewTrainingProgram {
            name,
            training_program_id: fx.training_programs[0].id,
            admission_plan_id: plan_id,
        },
    )
    .await
    .expect("insert_training_program should succeed")
}

async fn insert_major(
    pool: &PgPool,
    fx: &CatalogFixture,
    plan_id: i64,
    tp_id: i64,
    name: &str,
) -> anyhow::Result<AdmissionMajor> {
    majors::insert_major(
        pool,
        &NewMajor {
            name,
            description: "",
            quota: 100,
            major_id: fx.majors[0].id,
            admission_training_program_id: tp_id,
            admission_plan_id: plan_id,
        },
    )
    .await
}

#[tokio::test]
async fn insert_get_update_plan() {
    let (pool, db_name) = create_test_db().await;
    let fx = seed_catalog(&pool).await;

    let plan = insert_plan(&pool, &fx, "2026 intake").await;
    assert_eq!(plan.name, "2026 intake");
    assert_eq!(plan.year, 2026);
    assert_eq!(plan.institution_id, fx.institution.id);

    let fetched = plans::get_plan(&pool, plan.id)
        .await
        .unwrap()
        .expect("plan should exist");
    assert_eq!(fetched, plan);

    let updated = plans::update_plan(
        &pool,
        plan.id,
        &NewPlan {
            name: "2026 intake (revised)",
            description: "revised",
            year: 2027,
            institution_id: fx.other_institution.id,
        },
    )
    .await
    .unwrap()
    .expect("plan should be updated");
    assert_eq!(updated.name, "2026 intake (revised)");
    assert_eq!(updated.year, 2027);
    assert_eq!(updated.institution_id, fx.other_institution.id);
    assert!(updated.updated_at >= plan.updated_at);

    let missing = plans::update_plan(
        &pool,
        plan.id + 1000,
        &NewPlan {
            name: "x",
            description: "",
            year: 2026,
            institution_id: fx.institution.id,
        },
    )
    .await
    .unwrap();
    assert!(missing.is_none());

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn list_plans_newest_year_first() {
    let (pool, db_name) = create_test_db().await;
    let fx = seed_catalog(&pool).await;

    let older = plans::insert_plan(
        &pool,
        &NewPlan {
            name: "2025 intake",
            description: "",
            year: 2025,
            institution_id: fx.institution.id,
        },
    )
    .await
    .unwrap();
    let newer = insert_plan(&pool, &fx, "2026 intake").await;

    let listed = plans::list_plans(&pool).await.unwrap();
    let ids: Vec<i64> = listed.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![newer.id, older.id]);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn load_aggregate_collects_whole_graph() {
    let (pool, db_name) = create_test_db().await;
    let fx = seed_catalog(&pool).await;

    let plan = insert_plan(&pool, &fx, "2026 intake").await;
    let other = insert_plan(&pool, &fx, "other plan").await;
    let tp = insert_tp(&pool, &fx, plan.id, "Standard").await;
    let other_tp = insert_tp(&pool, &fx, other.id, "Standard").await;
    let major = insert_major(&pool, &fx, plan.id, tp.id, "CS").await.unwrap();
    insert_major(&pool, &fx, other.id, other_tp.id, "CS")
        .await
        .unwrap();

    let method = major_methods::insert_major_method(
        &pool,
        &NewMajorMethod {
            name: "Exam",
            admission_method_id: fx.admission_methods[0].id,
            admission_major_id: major.id,
        },
    )
    .await
    .unwrap();
    let mut conn = pool.acquire().await.unwrap();
    major_methods::replace_subject_groups(
        &mut conn,
        method.id,
        &[fx.subject_groups[2].id, fx.subject_groups[0].id],
    )
    .await
    .unwrap();

    let aggregate = load_plan_aggregate(&mut conn, plan.id)
        .await
        .unwrap()
        .expect("aggregate should load");
    assert_eq!(aggregate.plan, plan);
    assert_eq!(aggregate.training_programs, vec![tp.clone()]);
    assert_eq!(aggregate.majors, vec![major.clone()]);
    assert_eq!(aggregate.methods.len(), 1);
    assert_eq!(aggregate.methods[0].method, method);
    assert_eq!(
        aggregate.methods[0].subject_group_ids,
        vec![fx.subject_groups[0].id, fx.subject_groups[2].id]
    );
    assert_eq!(aggregate.majors_using(tp.id).count(), 1);
    assert_eq!(aggregate.methods_of(major.id).count(), 1);
    assert!(aggregate.training_program(other_tp.id).is_none());

    let none = load_plan_aggregate(&mut conn, plan.id + other.id + 1000)
        .await
        .unwrap();
    assert!(none.is_none());

    drop(conn);
    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn snapshot_load_does_not_see_later_commits() {
    let (pool, db_name) = create_test_db().await;
    let fx = seed_catalog(&pool).await;

    let plan = insert_plan(&pool, &fx, "2026 intake").await;
    let tp = insert_tp(&pool, &fx, plan.id, "Standard").await;
    insert_major(&pool, &fx, plan.id, tp.id, "CS").await.unwrap();

    let mut tx = begin_snapshot(&pool).await.unwrap();
    let first = load_plan_aggregate(&mut tx, plan.id)
        .await
        .unwrap()
        .expect("aggregate should load");
    assert_eq!(first.majors.len(), 1);

    insert_major(&pool, &fx, plan.id, tp.id, "Math").await.unwrap();

    let second = load_plan_aggregate(&mut tx, plan.id)
        .await
        .unwrap()
        .expect("aggregate should load");
    assert_eq!(second, first);
    tx.commit().await.unwrap();

    let mut conn = pool.acquire().await.unwrap();
    let fresh = load_plan_aggregate(&mut conn, plan.id)
        .await
        .unwrap()
        .expect("aggregate should load");
    assert_eq!(fresh.majors.len(), 2);

    drop(conn);
    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn duplicate_name_in_plan_is_a_unique_violation() {
    let (pool, db_name) = create_test_db().await;
    let fx = seed_catalog(&pool).await;

    let plan = insert_plan(&pool, &fx, "2026 intake").await;
    let other = insert_plan(&pool, &fx, "other plan").await;
    let tp = insert_tp(&pool, &fx, plan.id, "Standard").await;
    insert_tp(&pool, &fx, other.id, "Standard").await;

    insert_major(&pool, &fx, plan.id, tp.id, "CS").await.unwrap();
    let err = insert_major(&pool, &fx, plan.id, tp.id, "CS")
        .await
        .expect_err("second major with the same name should fail");

    assert_eq!(
        errors::constraint_violation(&err),
        Some(ConstraintViolation::Unique {
            constraint: Some(errors::UQ_MAJOR_NAME.to_owned()),
        })
    );

    // Case differs: allowed, the check is exact.
    insert_major(&pool, &fx, plan.id, tp.id, "cs").await.unwrap();

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn deleting_referenced_training_program_is_a_foreign_key_violation() {
    let (pool, db_name) = create_test_db().await;
    let fx = seed_catalog(&pool).await;

    let plan = insert_plan(&pool, &fx, "2026 intake").await;
    let tp = insert_tp(&pool, &fx, plan.id, "Standard").await;
    let unused = insert_tp(&pool, &fx, plan.id, "High Quality").await;
    insert_major(&pool, &fx, plan.id, tp.id, "CS").await.unwrap();

    let err = training_programs::delete_training_program(&pool, tp.id)
        .await
        .expect_err("delete should be blocked by the major");
    assert!(matches!(
        errors::constraint_violation(&err),
        Some(ConstraintViolation::ForeignKey { .. })
    ));

    assert!(
        training_programs::delete_training_program(&pool, unused.id)
            .await
            .unwrap()
    );
    assert!(
        !training_programs::delete_training_program(&pool, unused.id)
            .await
            .unwrap()
    );

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn deleting_plan_cascades_to_children() {
    let (pool, db_name) = create_test_db().await;
    let fx = seed_catalog(&pool).await;

    let plan = insert_plan(&pool, &fx, "2026 intake").await;
    let tp = insert_tp(&pool, &fx, plan.id, "Standard").await;
    let major = insert_major(&pool, &fx, plan.id, tp.id, "CS").await.unwrap();
    let method = major_methods::insert_major_method(
        &pool,
        &NewMajorMethod {
            name: "Exam",
            admission_method_id: fx.admission_methods[0].id,
            admission_major_id: major.id,
        },
    )
    .await
    .unwrap();
    let mut conn = pool.acquire().await.unwrap();
    major_methods::replace_subject_groups(&mut conn, method.id, &[fx.subject_groups[0].id])
        .await
        .unwrap();
    drop(conn);

    assert!(plans::delete_plan(&pool, plan.id).await.unwrap());

    assert!(plans::get_plan(&pool, plan.id).await.unwrap().is_none());
    assert!(
        training_programs::get_training_program(&pool, tp.id)
            .await
            .unwrap()
            .is_none()
    );
    assert!(majors::get_major(&pool, major.id).await.unwrap().is_none());
    assert!(
        major_methods::get_major_method(&pool, method.id)
            .await
            .unwrap()
            .is_none()
    );
    let links: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM admission_major_method_subject_groups")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(links.0, 0);

    pool.close().await;
    drop_test_db(&db_name).await;
}

#[tokio::test]
async fn replace_subject_groups_overwrites_the_set() {
    let (pool, db_name) = create_test_db().await;
    let fx = seed_catalog(&pool).await;

    let plan = insert_plan(&pool, &fx, "2026 intake").await;
    let tp = insert_tp(&pool, &fx, plan.id, "Standard").await;
    let major = insert_major(&pool, &fx, plan.id, tp.id, "CS").await.unwrap();
    let method = major_methods::insert_major_method(
        &pool,
        &NewMajorMethod {
            name: "Exam",
            admission_method_id: fx.admission_methods[0].id,
            admission_major_id: major.id,
        },
    )
    .await
    .unwrap();

    let mut conn = pool.acquire().await.unwrap();
    let [a00, a01, d01] = [
        fx.subject_groups[0].id,
        fx.subject_groups[1].id,
        fx.subject_groups[2].id,
    ];
    major_methods::replace_subject_groups(&mut conn, method.id, &[a00, a01])
        .await
        .unwrap();
    major_methods::replace_subject_groups(&mut conn, method.id, &[d01, a01])
        .await
        .unwrap();

    let ids = major_methods::get_subject_group_ids(&mut *conn, method.id)
        .await
        .unwrap();
    assert_eq!(ids, vec![a01, d01]);

    major_methods::replace_subject_groups(&mut conn, method.id, &[])
        .await
        .unwrap();
    let ids = major_methods::get_subject_group_ids(&mut *conn, method.id)
        .await
        .unwrap();
    assert!(ids.is_empty());

    let err = major_methods::replace_subject_groups(&mut conn, method.id, &[a00, d01 + 1000])
        .await
        .expect_err("unknown subject group should be rejected by the link table");
    assert!(matches!(
        errors::constraint_violation(&err),
        Some(ConstraintViolation::ForeignKey { .. })
    ));

    drop(conn);
    pool.close().await;
    drop_test_db(&db_name).await;
}
