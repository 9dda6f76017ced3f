//! Consistency rules for the admission plan aggregate.
//!
//! Every rule is a pure function over the loaded [`PlanAggregate`] (or a
//! single row) and the candidate values of a command. Rules never touch
//! storage; commands load what the rules need, run them, and only then
//! write.
//!
//! Name comparisons are exact: no case folding and no trimming. Commands
//! trim their input before it reaches these functions.

use std::collections::BTreeSet;

use admission_db::aggregate::PlanAggregate;
use admission_db::models::{
    AdmissionMajor, AdmissionMajorMethod, AdmissionTrainingProgram, SubjectGroup,
};

use crate::error::{AdmissionError, AdmissionResult, Entity};

/// Sibling collection inside a plan whose names must be unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanNameScope {
    TrainingProgram,
    Major,
}

impl PlanNameScope {
    fn entity(self) -> Entity {
        match self {
            Self::TrainingProgram => Entity::AdmissionTrainingProgram,
            Self::Major => Entity::AdmissionMajor,
        }
    }
}

/// Turn an optional lookup result into a `NotFound` rejection.
pub fn require_found<T>(value: Option<T>, entity: Entity, id: i64) -> AdmissionResult<T> {
    value.ok_or(AdmissionError::NotFound { entity, id })
}

/// Reject a plan whose owning institution is not in the catalog.
pub fn require_institution_exists(exists: bool, institution_id: i64) -> AdmissionResult<()> {
    if exists {
        Ok(())
    } else {
        Err(AdmissionError::not_found(Entity::Institution, institution_id))
    }
}

/// Reject `candidate` when a sibling in `scope` already uses it.
///
/// `exclude_id` is the id of the entity being updated; its own current name
/// never counts as a clash, so an update that keeps the name passes.
pub fn require_name_unique_in_plan(
    aggregate: &PlanAggregate,
    scope: PlanNameScope,
    candidate: &str,
    exclude_id: Option<i64>,
) -> AdmissionResult<()> {
    let clash = match scope {
        PlanNameScope::TrainingProgram => aggregate
            .training_programs
            .iter()
            .any(|tp| Some(tp.id) != exclude_id && tp.name == candidate),
        PlanNameScope::Major => aggregate
            .majors
            .iter()
            .any(|m| Some(m.id) != exclude_id && m.name == candidate),
    };

    if clash {
        return Err(AdmissionError::DuplicateName {
            entity: scope.entity(),
            name: candidate.to_owned(),
            scope: Entity::AdmissionPlan,
            scope_id: aggregate.id(),
        });
    }
    Ok(())
}

/// Reject `candidate` when another method of the same major already uses it.
pub fn require_method_name_unique(
    aggregate: &PlanAggregate,
    major_id: i64,
    candidate: &str,
    exclude_id: Option<i64>,
) -> AdmissionResult<()> {
    let clash = aggregate
        .methods_of(major_id)
        .any(|m| Some(m.method.id) != exclude_id && m.method.name == candidate);

    if clash {
        return Err(AdmissionError::DuplicateName {
            entity: Entity::AdmissionMajorMethod,
            name: candidate.to_owned(),
            scope: Entity::AdmissionMajor,
            scope_id: major_id,
        });
    }
    Ok(())
}

/// Containment: the training program must be a member of this plan's
/// training programs. A training program of another plan is rejected even
/// though it exists.
pub fn require_training_program_in_plan(
    aggregate: &PlanAggregate,
    training_program_id: i64,
) -> AdmissionResult<&AdmissionTrainingProgram> {
    aggregate
        .training_program(training_program_id)
        .filter(|tp| tp.admission_plan_id == aggregate.id())
        .ok_or(AdmissionError::NotInScope {
            entity: Entity::AdmissionTrainingProgram,
            id: training_program_id,
            parent: Entity::AdmissionPlan,
            parent_id: aggregate.id(),
        })
}

/// Containment: the major must be a member of this plan's majors.
pub fn require_major_in_plan(
    aggregate: &PlanAggregate,
    major_id: i64,
) -> AdmissionResult<&AdmissionMajor> {
    aggregate
        .major(major_id)
        .filter(|m| m.admission_plan_id == aggregate.id())
        .ok_or(AdmissionError::NotInScope {
            entity: Entity::AdmissionMajor,
            id: major_id,
            parent: Entity::AdmissionPlan,
            parent_id: aggregate.id(),
        })
}

/// The method addressed by a request must belong to the major named in the
/// same request.
pub fn require_method_belongs_to_major(
    method: &AdmissionMajorMethod,
    major_id: i64,
) -> AdmissionResult<()> {
    if method.admission_major_id != major_id {
        return Err(AdmissionError::NotInScope {
            entity: Entity::AdmissionMajorMethod,
            id: method.id,
            parent: Entity::AdmissionMajor,
            parent_id: major_id,
        });
    }
    Ok(())
}

/// Every requested subject-group id must have resolved. On failure the
/// error carries exactly the ids that did not.
///
/// Returns the requested ids, de-duplicated and sorted.
pub fn require_subject_groups_resolve(
    requested: &[i64],
    resolved: &[SubjectGroup],
) -> AdmissionResult<Vec<i64>> {
    let requested: BTreeSet<i64> = requested.iter().copied().collect();
    let resolved: BTreeSet<i64> = resolved.iter().map(|g| g.id).collect();

    let missing: BTreeSet<i64> = requested.difference(&resolved).copied().collect();
    if !missing.is_empty() {
        return Err(AdmissionError::SubjectGroupNotFound { missing });
    }
    Ok(requested.into_iter().collect())
}

/// Delete guard: no major of the plan may still use the training program.
pub fn require_training_program_not_referenced(
    aggregate: &PlanAggregate,
    training_program_id: i64,
) -> AdmissionResult<()> {
    if aggregate.majors_using(training_program_id).next().is_some() {
        return Err(AdmissionError::InUse {
            entity: Entity::AdmissionTrainingProgram,
            id: training_program_id,
            referenced_by: Entity::AdmissionMajor,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use admission_db::models::{AdmissionPlan, PopulatedMajorMethod};

    use super::*;
    use crate::error::ErrorKind;

    fn plan(id: i64) -> PlanAggregate {
        PlanAggregate::new(AdmissionPlan {
            id,
            name: format!("plan {id}"),
            description: String::new(),
            year: 2026,
            institution_id: 1,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
    }

    fn tp(id: i64, plan_id: i64, name: &str) -> AdmissionTrainingProgram {
        AdmissionTrainingProgram {
            id,
            name: name.to_owned(),
            training_program_id: 1,
            admission_plan_id: plan_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn major(id: i64, plan_id: i64, tp_id: i64, name: &str) -> AdmissionMajor {
        AdmissionMajor {
            id,
            name: name.to_owned(),
            description: String::new(),
            quota: 100,
            major_id: 5,
            admission_training_program_id: tp_id,
            admission_plan_id: plan_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn method(id: i64, major_id: i64, name: &str) -> PopulatedMajorMethod {
        PopulatedMajorMethod {
            method: AdmissionMajorMethod {
                id,
                name: name.to_owned(),
                admission_method_id: 1,
                admission_major_id: major_id,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
            subject_group_ids: vec![],
        }
    }

    fn group(id: i64) -> SubjectGroup {
        SubjectGroup {
            id,
            code: format!("G{id}"),
            name: String::new(),
        }
    }

    /// Plan 1 with training program 10 and major 20 ("CS") using it.
    fn populated() -> PlanAggregate {
        let mut agg = plan(1);
        agg.training_programs.push(tp(10, 1, "Standard"));
        agg.training_programs.push(tp(11, 1, "High Quality"));
        agg.majors.push(major(20, 1, 10, "CS"));
        agg.majors.push(major(21, 1, 10, "Math"));
        agg.methods.push(method(30, 20, "Exam"));
        agg.methods.push(method(31, 21, "Transcript"));
        agg
    }

    #[test]
    fn institution_must_exist() {
        assert!(require_institution_exists(true, 1).is_ok());
        let err = require_institution_exists(false, 7).unwrap_err();
        assert!(matches!(
            err,
            AdmissionError::NotFound {
                entity: Entity::Institution,
                id: 7
            }
        ));
    }

    #[test]
    fn require_found_passes_value_through() {
        assert_eq!(require_found(Some(3), Entity::Major, 3).unwrap(), 3);
        let err = require_found::<i32>(None, Entity::Major, 3).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn duplicate_major_name_rejected_on_add() {
        let agg = populated();
        let err = require_name_unique_in_plan(&agg, PlanNameScope::Major, "CS", None).unwrap_err();
        assert!(matches!(
            err,
            AdmissionError::DuplicateName {
                entity: Entity::AdmissionMajor,
                scope: Entity::AdmissionPlan,
                scope_id: 1,
                ..
            }
        ));
        assert!(require_name_unique_in_plan(&agg, PlanNameScope::Major, "Physics", None).is_ok());
    }

    #[test]
    fn keeping_own_name_on_update_is_not_a_duplicate() {
        let agg = populated();
        assert!(require_name_unique_in_plan(&agg, PlanNameScope::Major, "CS", Some(20)).is_ok());
        assert!(
            require_name_unique_in_plan(&agg, PlanNameScope::TrainingProgram, "Standard", Some(10))
                .is_ok()
        );
    }

    #[test]
    fn renaming_onto_a_sibling_is_a_duplicate() {
        let agg = populated();
        let err =
            require_name_unique_in_plan(&agg, PlanNameScope::Major, "Math", Some(20)).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateName);

        let err = require_name_unique_in_plan(
            &agg,
            PlanNameScope::TrainingProgram,
            "High Quality",
            Some(10),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DuplicateName);
    }

    #[test]
    fn name_check_is_exact() {
        let agg = populated();
        assert!(require_name_unique_in_plan(&agg, PlanNameScope::Major, "cs", None).is_ok());
        assert!(require_name_unique_in_plan(&agg, PlanNameScope::Major, "CS ", None).is_ok());
    }

    #[test]
    fn name_scopes_do_not_mix() {
        let agg = populated();
        // "CS" is a major name, not a training program name.
        assert!(
            require_name_unique_in_plan(&agg, PlanNameScope::TrainingProgram, "CS", None).is_ok()
        );
    }

    #[test]
    fn method_names_are_scoped_to_their_major() {
        let agg = populated();
        let err = require_method_name_unique(&agg, 20, "Exam", None).unwrap_err();
        assert!(matches!(
            err,
            AdmissionError::DuplicateName {
                entity: Entity::AdmissionMajorMethod,
                scope: Entity::AdmissionMajor,
                scope_id: 20,
                ..
            }
        ));
        // Same name under another major is fine.
        assert!(require_method_name_unique(&agg, 21, "Exam", None).is_ok());
        // Keeping its own name on update is fine.
        assert!(require_method_name_unique(&agg, 20, "Exam", Some(30)).is_ok());
    }

    #[test]
    fn training_program_containment() {
        let mut agg = populated();
        assert_eq!(require_training_program_in_plan(&agg, 10).unwrap().id, 10);

        let err = require_training_program_in_plan(&agg, 99).unwrap_err();
        assert!(matches!(
            err,
            AdmissionError::NotInScope {
                entity: Entity::AdmissionTrainingProgram,
                id: 99,
                parent: Entity::AdmissionPlan,
                parent_id: 1
            }
        ));

        // A row of another plan slipped into the collection is still rejected.
        agg.training_programs.push(tp(12, 2, "Foreign"));
        assert!(require_training_program_in_plan(&agg, 12).is_err());
    }

    #[test]
    fn major_containment() {
        let agg = populated();
        assert_eq!(require_major_in_plan(&agg, 21).unwrap().name, "Math");
        let err = require_major_in_plan(&agg, 77).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotInScope);
    }

    #[test]
    fn method_must_belong_to_path_major() {
        let agg = populated();
        let m = agg
            .methods_of(20)
            .map(|m| &m.method)
            .find(|m| m.id == 30)
            .unwrap();
        assert!(require_method_belongs_to_major(m, 20).is_ok());

        let err = require_method_belongs_to_major(m, 21).unwrap_err();
        assert!(matches!(
            err,
            AdmissionError::NotInScope {
                entity: Entity::AdmissionMajorMethod,
                id: 30,
                parent: Entity::AdmissionMajor,
                parent_id: 21
            }
        ));
    }

    #[test]
    fn partial_subject_group_resolution_reports_exact_difference() {
        let err = require_subject_groups_resolve(&[3, 999], &[group(3)]).unwrap_err();
        match err {
            AdmissionError::SubjectGroupNotFound { missing } => {
                assert_eq!(missing, BTreeSet::from([999]));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn subject_groups_resolve_deduplicated() {
        let ids = require_subject_groups_resolve(&[4, 3, 4], &[group(3), group(4)]).unwrap();
        assert_eq!(ids, vec![3, 4]);
        assert!(require_subject_groups_resolve(&[], &[]).unwrap().is_empty());
    }

    #[test]
    fn referenced_training_program_cannot_be_deleted() {
        let agg = populated();
        let err = require_training_program_not_referenced(&agg, 10).unwrap_err();
        assert!(matches!(
            err,
            AdmissionError::InUse {
                entity: Entity::AdmissionTrainingProgram,
                id: 10,
                referenced_by: Entity::AdmissionMajor,
            }
        ));
        assert!(require_training_program_not_referenced(&agg, 11).is_ok());
    }
}
