use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// ---------------------------------------------------------------------------
// Catalog rows (read-only from the plan composition point of view)
// ---------------------------------------------------------------------------

/// A row in the `institutions` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Institution {
    pub id: i64,
    pub name: String,
}

/// A row in the `majors` catalog table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Major {
    pub id: i64,
    pub code: String,
    pub name: String,
}

/// A row in the `training_programs` catalog table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct TrainingProgram {
    pub id: i64,
    pub name: String,
}

/// A row in the `admission_methods` catalog table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AdmissionMethod {
    pub id: i64,
    pub name: String,
}

/// A row in the `subject_groups` catalog table (e.g. `A00`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SubjectGroup {
    pub id: i64,
    pub code: String,
    pub name: String,
}

// ---------------------------------------------------------------------------
// Aggregate rows
// ---------------------------------------------------------------------------

/// A row in the `admission_plans` table. Root of the aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AdmissionPlan {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub year: i32,
    pub institution_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A row in the `admission_training_programs` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AdmissionTrainingProgram {
    pub id: i64,
    pub name: String,
    pub training_program_id: i64,
    pub admission_plan_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A row in the `admission_majors` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AdmissionMajor {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub quota: i32,
    pub major_id: i64,
    pub admission_training_program_id: i64,
    pub admission_plan_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A row in the `admission_major_methods` table. The subject-group set
/// lives in `admission_major_method_subject_groups`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AdmissionMajorMethod {
    pub id: i64,
    pub name: String,
    pub admission_method_id: i64,
    pub admission_major_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A major method together with the ids of its subject groups, sorted
/// ascending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PopulatedMajorMethod {
    #[serde(flatten)]
    pub method: AdmissionMajorMethod,
    pub subject_group_ids: Vec<i64>,
}
