//! Command outputs: flat views of the mutated entity and what it points at.

use serde::Serialize;

use admission_db::aggregate::PlanAggregate;
use admission_db::models::{
    AdmissionMajor, AdmissionMajorMethod, AdmissionMethod, AdmissionPlan,
    AdmissionTrainingProgram, Major, PopulatedMajorMethod, SubjectGroup, TrainingProgram,
};

/// A plan with its training programs and majors (each with its methods).
#[derive(Debug, Clone, Serialize)]
pub struct PlanView {
    #[serde(flatten)]
    pub plan: AdmissionPlan,
    pub training_programs: Vec<AdmissionTrainingProgram>,
    pub majors: Vec<PlanMajorView>,
}

/// A major inside a [`PlanView`].
#[derive(Debug, Clone, Serialize)]
pub struct PlanMajorView {
    #[serde(flatten)]
    pub major: AdmissionMajor,
    pub methods: Vec<PopulatedMajorMethod>,
}

impl From<PlanAggregate> for PlanView {
    fn from(aggregate: PlanAggregate) -> Self {
        let PlanAggregate {
            plan,
            training_programs,
            majors,
            mut methods,
        } = aggregate;

        let majors = majors
            .into_iter()
            .map(|major| {
                let (own, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut methods)
                    .into_iter()
                    .partition(|m| m.method.admission_major_id == major.id);
                methods = rest;
                PlanMajorView {
                    major,
                    methods: own,
                }
            })
            .collect();

        Self {
            plan,
            training_programs,
            majors,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TrainingProgramView {
    #[serde(flatten)]
    pub admission_training_program: AdmissionTrainingProgram,
    pub training_program: TrainingProgram,
}

#[derive(Debug, Clone, Serialize)]
pub struct MajorView {
    #[serde(flatten)]
    pub admission_major: AdmissionMajor,
    pub major: Major,
    pub admission_training_program: AdmissionTrainingProgram,
}

#[derive(Debug, Clone, Serialize)]
pub struct MajorMethodView {
    #[serde(flatten)]
    pub admission_major_method: AdmissionMajorMethod,
    pub admission_method: AdmissionMethod,
    pub subject_groups: Vec<SubjectGroup>,
}
