//! Error taxonomy for admission plan commands.
//!
//! Every variant except [`AdmissionError::Storage`] is a user-facing
//! rejection raised before anything is written. Storage failures carry the
//! underlying `anyhow` chain and surface as a generic server error.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Entities the core reads or mutates, used to label errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    AdmissionPlan,
    AdmissionTrainingProgram,
    AdmissionMajor,
    AdmissionMajorMethod,
    Institution,
    Major,
    TrainingProgram,
    AdmissionMethod,
    SubjectGroup,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AdmissionPlan => "admission plan",
            Self::AdmissionTrainingProgram => "admission training program",
            Self::AdmissionMajor => "admission major",
            Self::AdmissionMajorMethod => "admission major method",
            Self::Institution => "institution",
            Self::Major => "major",
            Self::TrainingProgram => "training program",
            Self::AdmissionMethod => "admission method",
            Self::SubjectGroup => "subject group",
        };
        f.write_str(s)
    }
}

/// Coarse classification used by transports to pick a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    DuplicateName,
    NotInScope,
    PartialResolutionFailure,
    InUse,
    Internal,
}

/// Errors returned by the consistency rules and the aggregate commands.
#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: i64 },

    #[error("{entity} named {name:?} already exists in {scope} {scope_id}")]
    DuplicateName {
        entity: Entity,
        name: String,
        scope: Entity,
        scope_id: i64,
    },

    #[error("{entity} {id} does not belong to {parent} {parent_id}")]
    NotInScope {
        entity: Entity,
        id: i64,
        parent: Entity,
        parent_id: i64,
    },

    #[error("subject groups not found: {}", join_ids(.missing))]
    SubjectGroupNotFound { missing: BTreeSet<i64> },

    #[error("{entity} {id} is still referenced by at least one {referenced_by}")]
    InUse {
        entity: Entity,
        id: i64,
        referenced_by: Entity,
    },

    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl AdmissionError {
    pub fn not_found(entity: Entity, id: i64) -> Self {
        Self::NotFound { entity, id }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::DuplicateName { .. } => ErrorKind::DuplicateName,
            Self::NotInScope { .. } => ErrorKind::NotInScope,
            Self::SubjectGroupNotFound { .. } => ErrorKind::PartialResolutionFailure,
            Self::InUse { .. } => ErrorKind::InUse,
            Self::Storage(_) => ErrorKind::Internal,
        }
    }
}

/// Shorthand for results of command and rule functions.
pub type AdmissionResult<T> = Result<T, AdmissionError>;

fn join_ids(ids: &BTreeSet<i64>) -> String {
    ids.iter()
        .map(i64::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_follow_variants() {
        assert_eq!(
            AdmissionError::not_found(Entity::AdmissionPlan, 1).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            AdmissionError::SubjectGroupNotFound {
                missing: BTreeSet::from([999]),
            }
            .kind(),
            ErrorKind::PartialResolutionFailure
        );
        assert_eq!(
            AdmissionError::from(anyhow::anyhow!("connection reset")).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn messages_name_the_entity() {
        let err = AdmissionError::NotInScope {
            entity: Entity::AdmissionTrainingProgram,
            id: 10,
            parent: Entity::AdmissionPlan,
            parent_id: 2,
        };
        assert_eq!(
            err.to_string(),
            "admission training program 10 does not belong to admission plan 2"
        );

        let err = AdmissionError::SubjectGroupNotFound {
            missing: BTreeSet::from([999, 12]),
        };
        assert_eq!(err.to_string(), "subject groups not found: 12, 999");

        let err = AdmissionError::DuplicateName {
            entity: Entity::AdmissionMajor,
            name: "CS".into(),
            scope: Entity::AdmissionPlan,
            scope_id: 4,
        };
        assert_eq!(
            err.to_string(),
            "admission major named \"CS\" already exists in admission plan 4"
        );
    }
}
