//! Operator-mode CLI handlers for `admission plan` subcommands.
//!
//! Implements:
//! - `admission plan show`            -- list all plans
//! - `admission plan show <plan-id>`  -- show one plan with its training
//!   programs, majors and methods (`--json` for the raw view)

use std::fmt::Write as _;

use anyhow::{Context, Result};
use sqlx::PgPool;

use admission_core::commands::{self, PlanView};
use admission_db::models::AdmissionPlan;

use crate::PlanCommands;

// -----------------------------------------------------------------------
// Public entry point
// -----------------------------------------------------------------------

/// Dispatch a `PlanCommands` variant to the appropriate handler.
pub async fn run_plan_command(command: PlanCommands, pool: &PgPool) -> Result<()> {
    match command {
        PlanCommands::Show { plan_id, json } => match plan_id {
            Some(id) => cmd_show_one(pool, id, json).await,
            None => cmd_show_all(pool, json).await,
        },
    }
}

// -----------------------------------------------------------------------
// admission plan show (list all)
// -----------------------------------------------------------------------

async fn cmd_show_all(pool: &PgPool, json: bool) -> Result<()> {
    let plans = commands::list_plans(pool).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plans)?);
    } else if plans.is_empty() {
        println!("No plans found.");
    } else {
        print!("{}", render_plan_table(&plans));
    }
    Ok(())
}

fn render_plan_table(plans: &[AdmissionPlan]) -> String {
    let id_w = plans
        .iter()
        .map(|p| p.id.to_string().len())
        .max()
        .unwrap_or(2)
        .max(2);
    let name_w = plans.iter().map(|p| p.name.len()).max().unwrap_or(4).max(4);

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<id_w$}  {:<name_w$}  YEAR  INSTITUTION  CREATED",
        "ID", "NAME",
    );
    for plan in plans {
        let _ = writeln!(
            out,
            "{:<id_w$}  {:<name_w$}  {:<4}  {:<11}  {}",
            plan.id,
            plan.name,
            plan.year,
            plan.institution_id,
            plan.created_at.format("%Y-%m-%d %H:%M"),
        );
    }
    out
}

// -----------------------------------------------------------------------
// admission plan show <plan-id>
// -----------------------------------------------------------------------

async fn cmd_show_one(pool: &PgPool, plan_id: i64, json: bool) -> Result<()> {
    let view = commands::get_plan(pool, plan_id)
        .await
        .with_context(|| format!("failed to load plan {plan_id}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print!("{}", render_plan(&view));
    }
    Ok(())
}

/// Render a plan and its children as an indented tree.
fn render_plan(view: &PlanView) -> String {
    let plan = &view.plan;
    let mut out = String::new();

    let _ = writeln!(out, "Plan: {}", plan.name);
    let _ = writeln!(out, "  ID:           {}", plan.id);
    let _ = writeln!(out, "  Year:         {}", plan.year);
    let _ = writeln!(out, "  Institution:  {}", plan.institution_id);
    let _ = writeln!(
        out,
        "  Created:      {}",
        plan.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if !plan.description.is_empty() {
        let _ = writeln!(out, "  Description:  {}", plan.description);
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Training programs: {}", view.training_programs.len());
    for tp in &view.training_programs {
        let _ = writeln!(
            out,
            "  [{}] {} (catalog {})",
            tp.id, tp.name, tp.training_program_id
        );
    }

    let _ = writeln!(out);
    let _ = writeln!(out, "Majors: {}", view.majors.len());
    for entry in &view.majors {
        let major = &entry.major;
        let _ = writeln!(out, "  [{}] {}", major.id, major.name);
        let _ = writeln!(out, "    Catalog major:     {}", major.major_id);
        let _ = writeln!(
            out,
            "    Training program:  {}",
            major.admission_training_program_id
        );
        let _ = writeln!(out, "    Quota:             {}", major.quota);
        for populated in &entry.methods {
            let groups: Vec<String> = populated
                .subject_group_ids
                .iter()
                .map(i64::to_string)
                .collect();
            let _ = writeln!(
                out,
                "    - [{}] {} (method {}; subject groups: {})",
                populated.method.id,
                populated.method.name,
                populated.method.admission_method_id,
                if groups.is_empty() {
                    "none".to_owned()
                } else {
                    groups.join(", ")
                },
            );
        }
    }
    out
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use admission_core::commands::PlanMajorView;
    use admission_db::models::{
        AdmissionMajor, AdmissionMajorMethod, AdmissionTrainingProgram, PopulatedMajorMethod,
    };

    use super::*;

    fn sample_view() -> PlanView {
        let ts = Utc.with_ymd_and_hms(2026, 3, 1, 8, 30, 0).unwrap();
        PlanView {
            plan: AdmissionPlan {
                id: 7,
                name: "2026 intake".to_owned(),
                description: String::new(),
                year: 2026,
                institution_id: 1,
                created_at: ts,
                updated_at: ts,
            },
            training_programs: vec![AdmissionTrainingProgram {
                id: 10,
                name: "Standard".to_owned(),
                training_program_id: 2,
                admission_plan_id: 7,
                created_at: ts,
                updated_at: ts,
            }],
            majors: vec![PlanMajorView {
                major: AdmissionMajor {
                    id: 20,
                    name: "CS".to_owned(),
                    description: String::new(),
                    quota: 120,
                    major_id: 3,
                    admission_training_program_id: 10,
                    admission_plan_id: 7,
                    created_at: ts,
                    updated_at: ts,
                },
                methods: vec![PopulatedMajorMethod {
                    method: AdmissionMajorMethod {
                        id: 30,
                        name: "Exam".to_owned(),
                        admission_method_id: 4,
                        admission_major_id: 20,
                        created_at: ts,
                        updated_at: ts,
                    },
                    subject_group_ids: vec![5, 6],
                }],
            }],
        }
    }

    #[test]
    fn render_plan_shows_the_tree() {
        let out = render_plan(&sample_view());
        assert!(out.starts_with("Plan: 2026 intake\n"), "got:\n{out}");
        assert!(out.contains("  Created:      2026-03-01 08:30:00 UTC"));
        assert!(out.contains("  [10] Standard (catalog 2)"));
        assert!(out.contains("  [20] CS"));
        assert!(out.contains("    Training program:  10"));
        assert!(out.contains("    - [30] Exam (method 4; subject groups: 5, 6)"));
        assert!(!out.contains("Description"));
    }

    #[test]
    fn render_plan_table_aligns_columns() {
        let view = sample_view();
        let out = render_plan_table(&[view.plan]);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("ID  NAME"));
        assert!(lines[1].starts_with("7   2026 intake  2026"));
    }
}
