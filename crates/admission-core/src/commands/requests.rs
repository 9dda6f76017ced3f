//! Command inputs.
//!
//! Field-level validation (required fields, ranges) belongs to the
//! transport. The only normalization done here is trimming names, so the
//! exact-match uniqueness rules compare what will actually be stored.

use serde::Deserialize;

/// Create or replace the fields of an admission plan.
#[derive(Debug, Clone, Deserialize)]
pub struct PlanRequest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub year: i32,
    pub institution_id: i64,
}

/// Add a training program to a plan, or rewrite one.
#[derive(Debug, Clone, Deserialize)]
pub struct TrainingProgramRequest {
    pub name: String,
    pub training_program_id: i64,
}

/// Add a major to a plan, or rewrite one. A blank name takes the catalog
/// major's name.
#[derive(Debug, Clone, Deserialize)]
pub struct MajorRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub quota: i32,
    pub major_id: i64,
    pub admission_training_program_id: i64,
}

/// Add a method to a major, or rewrite one. A blank name takes the catalog
/// admission method's name. `subject_group_ids` replaces the whole set.
#[derive(Debug, Clone, Deserialize)]
pub struct MajorMethodRequest {
    #[serde(default)]
    pub name: String,
    pub admission_method_id: i64,
    #[serde(default)]
    pub subject_group_ids: Vec<i64>,
}

/// Trimmed `requested`, or `fallback` when that is empty.
pub(crate) fn name_or<'a>(requested: &'a str, fallback: &'a str) -> &'a str {
    match requested.trim() {
        "" => fallback.trim(),
        name => name,
    }
}
