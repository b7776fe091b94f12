use anyhow::Context;
use chrono::NaiveDateTime;
use rusqlite::{Connection, TransactionBehavior};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{CareMilestone, MilestoneStatus};

pub struct MilestoneTemplate {
    pub title: &'static str,
    pub description: &'static str,
}

/// Starting journey for a client who has none recorded yet.
pub const DEFAULT_MILESTONES: &[MilestoneTemplate] = &[
    MilestoneTemplate {
        title: "Initial consultation",
        description: "Talk through care needs, routines and preferences with our team.",
    },
    MilestoneTemplate {
        title: "Home assessment",
        description: "A care coordinator visits to assess the home and any safety needs.",
    },
    MilestoneTemplate {
        title: "Care plan agreed",
        description: "Review and sign off the personalised care plan.",
    },
    MilestoneTemplate {
        title: "Caregiver introduction",
        description: "Meet the caregiver matched to the care plan.",
    },
    MilestoneTemplate {
        title: "Care begins",
        description: "Regular visits start according to the agreed schedule.",
    },
    MilestoneTemplate {
        title: "First review",
        description: "Check in after the first weeks of care and adjust the plan.",
    },
];

fn seed_defaults(user_id: &str, now: NaiveDateTime) -> Vec<CareMilestone> {
    DEFAULT_MILESTONES
        .iter()
        .enumerate()
        .map(|(i, template)| CareMilestone {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            position: i as i32 + 1,
            title: template.title.to_string(),
            description: template.description.to_string(),
            status: if i == 0 {
                MilestoneStatus::InProgress
            } else {
                MilestoneStatus::Pending
            },
            completed_at: None,
            created_at: now,
        })
        .collect()
}

/// Returns the client's milestones in order, seeding the default journey the
/// first time it is requested.
pub fn journey_for_user(
    conn: &mut Connection,
    user_id: &str,
    now: NaiveDateTime,
) -> Result<Vec<CareMilestone>, AppError> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .context("failed to begin journey transaction")?;

    let existing = queries::list_milestones_for_user(&tx, user_id)?;
    if !existing.is_empty() {
        return Ok(existing);
    }

    let seeded = seed_defaults(user_id, now);
    for milestone in &seeded {
        queries::insert_milestone(&tx, milestone)?;
    }
    tx.commit().context("failed to commit seeded journey")?;

    tracing::info!(user_id = %user_id, count = seeded.len(), "seeded default care journey");
    Ok(seeded)
}

/// Completes a milestone and moves the next pending one into progress.
pub fn complete_milestone(
    conn: &mut Connection,
    user_id: &str,
    milestone_id: &str,
    now: NaiveDateTime,
) -> Result<CareMilestone, AppError> {
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .context("failed to begin milestone transaction")?;

    let mut milestone = queries::get_milestone(&tx, milestone_id)?
        .filter(|m| m.user_id == user_id)
        .ok_or_else(|| AppError::NotFound(format!("milestone {milestone_id}")))?;

    if milestone.status == MilestoneStatus::Completed {
        return Ok(milestone);
    }

    queries::set_milestone_status(&tx, milestone_id, MilestoneStatus::Completed, Some(&now))?;

    let next = queries::list_milestones_for_user(&tx, user_id)?
        .into_iter()
        .find(|m| m.position > milestone.position && m.status == MilestoneStatus::Pending);
    if let Some(next) = next {
        queries::set_milestone_status(&tx, &next.id, MilestoneStatus::InProgress, None)?;
    }
    tx.commit().context("failed to commit milestone completion")?;

    milestone.status = MilestoneStatus::Completed;
    milestone.completed_at = Some(now);
    Ok(milestone)
}
