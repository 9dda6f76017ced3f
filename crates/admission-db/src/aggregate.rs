//! The admission plan aggregate, loaded whole.
//!
//! Commands read the plan together with all of its training programs,
//! majors and major methods (with subject-group ids) in one go and run
//! their checks against this in-memory graph. Children are kept in flat
//! vectors and refer to their parents by id only.

use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::{PgConnection, PgPool, Postgres, Transaction};

use crate::models::{AdmissionMajor, AdmissionPlan, AdmissionTrainingProgram, PopulatedMajorMethod};
use crate::queries::{major_methods, majors, plans, training_programs};

/// A plan with every owned child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanAggregate {
    pub plan: AdmissionPlan,
    pub training_programs: Vec<AdmissionTrainingProgram>,
    pub majors: Vec<AdmissionMajor>,
    pub methods: Vec<PopulatedMajorMethod>,
}

impl PlanAggregate {
    /// A plan with no children yet.
    pub fn new(plan: AdmissionPlan) -> Self {
        Self {
            plan,
            training_programs: Vec::new(),
            majors: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn id(&self) -> i64 {
        self.plan.id
    }

    /// The plan's training program with this id, if it is a member.
    pub fn training_program(&self, id: i64) -> Option<&AdmissionTrainingProgram> {
        self.training_programs.iter().find(|tp| tp.id == id)
    }

    /// The plan's major with this id, if it is a member.
    pub fn major(&self, id: i64) -> Option<&AdmissionMajor> {
        self.majors.iter().find(|m| m.id == id)
    }

    /// Methods belonging to one major.
    pub fn methods_of(&self, major_id: i64) -> impl Iterator<Item = &PopulatedMajorMethod> {
        self.methods
            .iter()
            .filter(move |m| m.method.admission_major_id == major_id)
    }

    /// Majors whose training program is `training_program_id`.
    pub fn majors_using(&self, training_program_id: i64) -> impl Iterator<Item = &AdmissionMajor> {
        self.majors
            .iter()
            .filter(move |m| m.admission_training_program_id == training_program_id)
    }
}

/// Load a plan and its whole sub-graph. Returns `None` when the plan does
/// not exist.
///
/// Issues four reads on the same connection. Under the default READ
/// COMMITTED isolation each read takes its own snapshot, so a commit from
/// another session can land between them; writers rely on the named
/// constraints for that case. Readers that need one consistent graph load
/// inside [`begin_snapshot`].
pub async fn load_plan_aggregate(
    conn: &mut PgConnection,
    plan_id: i64,
) -> Result<Option<PlanAggregate>> {
    let Some(plan) = plans::get_plan(&mut *conn, plan_id).await? else {
        return Ok(None);
    };

    let training_programs =
        training_programs::list_training_programs_for_plan(&mut *conn, plan_id).await?;
    let majors = majors::list_majors_for_plan(&mut *conn, plan_id).await?;
    let methods = major_methods::list_populated_methods_for_plan(&mut *conn, plan_id).await?;

    Ok(Some(PlanAggregate {
        plan,
        training_programs,
        majors,
        methods,
    }))
}

/// Begin a read-only REPEATABLE READ transaction: every read in it sees the
/// snapshot taken by its first statement.
pub async fn begin_snapshot(pool: &PgPool) -> Result<Transaction<'static, Postgres>> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;
    sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ, READ ONLY")
        .execute(&mut *tx)
        .await
        .context("failed to set snapshot isolation")?;
    Ok(tx)
}
