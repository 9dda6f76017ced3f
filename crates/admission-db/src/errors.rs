//! Classification of PostgreSQL constraint violations surfaced through
//! `anyhow` errors.
//!
//! Query functions attach context with `anyhow::Context`, so the original
//! `sqlx::Error` sits somewhere in the error chain. The service layer uses
//! [`constraint_violation`] to turn storage-level guards (unique indexes,
//! foreign keys) back into domain errors.

use sqlx::error::ErrorKind;

/// A constraint violation reported by the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintViolation {
    /// A unique index or constraint rejected the write.
    Unique { constraint: Option<String> },
    /// A foreign key rejected the write or delete.
    ForeignKey { constraint: Option<String> },
}

impl ConstraintViolation {
    /// Name of the violated constraint, when the server reported one.
    pub fn constraint(&self) -> Option<&str> {
        match self {
            Self::Unique { constraint } | Self::ForeignKey { constraint } => constraint.as_deref(),
        }
    }
}

/// Unique constraint on `(admission_plan_id, name)` for training programs.
pub const UQ_TRAINING_PROGRAM_NAME: &str = "uq_admission_training_programs_plan_name";
/// Unique constraint on `(admission_plan_id, name)` for majors.
pub const UQ_MAJOR_NAME: &str = "uq_admission_majors_plan_name";
/// Unique constraint on `(admission_major_id, name)` for major methods.
pub const UQ_MAJOR_METHOD_NAME: &str = "uq_admission_major_methods_major_name";

/// Foreign key from a plan to its institution.
pub const FK_PLAN_INSTITUTION: &str = "fk_plan_institution";
/// Foreign key from a plan training program to the catalog.
pub const FK_TP_TRAINING_PROGRAM: &str = "fk_tp_training_program";
/// Foreign key from a plan training program to its plan.
pub const FK_TP_PLAN: &str = "fk_tp_plan";
/// Foreign key from a plan major to the catalog.
pub const FK_MAJOR_MAJOR: &str = "fk_major_major";
/// Foreign key from a plan major to its plan training program.
pub const FK_MAJOR_TRAINING_PROGRAM: &str = "fk_major_training_program";
/// Foreign key from a plan major to its plan.
pub const FK_MAJOR_PLAN: &str = "fk_major_plan";
/// Foreign key from a major method to the catalog.
pub const FK_METHOD_ADMISSION_METHOD: &str = "fk_method_admission_method";
/// Foreign key from a major method to its major.
pub const FK_METHOD_MAJOR: &str = "fk_method_major";

/// Walk the error chain looking for a database constraint violation.
pub fn constraint_violation(err: &anyhow::Error) -> Option<ConstraintViolation> {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<sqlx::Error>())
        .find_map(classify)
}

fn classify(err: &sqlx::Error) -> Option<ConstraintViolation> {
    let sqlx::Error::Database(db_err) = err else {
        return None;
    };
    let constraint = db_err.constraint().map(str::to_owned);
    match db_err.kind() {
        ErrorKind::UniqueViolation => Some(ConstraintViolation::Unique { constraint }),
        ErrorKind::ForeignKeyViolation => Some(ConstraintViolation::ForeignKey { constraint }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_database_errors_are_not_violations() {
        let err = anyhow::Error::new(sqlx::Error::RowNotFound).context("failed to fetch plan");
        assert_eq!(constraint_violation(&err), None);
    }

    #[test]
    fn plain_anyhow_errors_are_not_violations() {
        let err = anyhow::anyhow!("plan 7 not found");
        assert_eq!(constraint_violation(&err), None);
    }

    #[test]
    fn constraint_accessor() {
        let v = ConstraintViolation::Unique {
            constraint: Some(UQ_MAJOR_NAME.to_owned()),
        };
        assert_eq!(v.constraint(), Some(UQ_MAJOR_NAME));
        let v = ConstraintViolation::ForeignKey { constraint: None };
        assert_eq!(v.constraint(), None);
    }
}
