//! Urban plan domain types

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{
    collect_where, decode, guard_status_edit, require, require_text, ActionContext, ActionMethod, ActionRoute,
    Audit, Budget, Document, DomainError, Resource, SubResourceAction,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanType {
    MasterPlan,
    Sectoral,
    Neighborhood,
    Mobility,
    Housing,
    Sanitation,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlanStatus {
    Draft,
    PublicConsultation,
    Approved,
    InExecution,
    Completed,
    Archived,
}

impl Default for PlanStatus {
    fn default() -> Self {
        Self::Draft
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Timeline {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanGoal {
    pub id: String,
    pub description: String,
    #[serde(default)]
    pub target: Option<String>,
    /// Completion percentage, 0 to 100
    pub progress: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PublicHearing {
    pub id: String,
    pub scheduled_for: DateTime<Utc>,
    pub location: String,
    #[serde(default)]
    pub attendees: Option<u32>,
    #[serde(default)]
    pub minutes: Option<String>,
}

/// Urban plan entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UrbanPlan {
    pub id: String,
    pub title: String,
    pub plan_type: PlanType,
    pub status: PlanStatus,
    #[serde(default)]
    pub description: Option<String>,
    /// Neighborhoods covered by the plan
    #[serde(default)]
    pub coverage: Vec<String>,
    #[serde(default)]
    pub budget: Budget,
    pub timeline: Timeline,
    #[serde(default)]
    pub responsible: Option<String>,
    #[serde(default)]
    pub goals: Vec<PlanGoal>,
    #[serde(default)]
    pub public_hearings: Vec<PublicHearing>,
    #[serde(default)]
    pub approved_on: Option<NaiveDate>,
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(flatten)]
    pub audit: Audit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUrbanPlanRequest {
    pub title: String,
    pub plan_type: PlanType,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub coverage: Vec<String>,
    #[serde(default)]
    pub budget: Budget,
    pub timeline: Timeline,
    #[serde(default)]
    pub responsible: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUrbanPlanRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_type: Option<PlanType>,
    /// Only archiving is allowed here; other stages have their own actions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PlanStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coverage: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<Budget>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeline: Option<Timeline>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsible: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlanFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan_type: Option<PlanType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PlanStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewGoal {
    pub description: String,
    #[serde(default)]
    pub target: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GoalProgress {
    pub progress: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HearingRequest {
    pub scheduled_for: DateTime<Utc>,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UrbanPlanAction {
    OpenConsultation,
    Approve,
    StartExecution,
    AddGoal(NewGoal),
    UpdateGoalProgress { goal_id: String, progress: GoalProgress },
    ScheduleHearing(HearingRequest),
}

impl SubResourceAction for UrbanPlanAction {
    fn route(&self) -> ActionRoute {
        match self {
            Self::OpenConsultation => ActionRoute::post("consultation"),
            Self::Approve => ActionRoute::post("approve"),
            Self::StartExecution => ActionRoute::post("execution"),
            Self::AddGoal(_) => ActionRoute::post("goals"),
            Self::UpdateGoalProgress { goal_id, .. } => ActionRoute::put_item("goals", goal_id),
            Self::ScheduleHearing(_) => ActionRoute::post("hearings"),
        }
    }

    fn payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::OpenConsultation | Self::Approve | Self::StartExecution => Ok(Value::Null),
            Self::AddGoal(goal) => serde_json::to_value(goal),
            Self::UpdateGoalProgress { progress, .. } => serde_json::to_value(progress),
            Self::ScheduleHearing(req) => serde_json::to_value(req),
        }
    }

    fn from_route(route: &ActionRoute, body: Value) -> Result<Self, DomainError> {
        match (route.method, route.segment.as_str(), route.sub_id.as_deref()) {
            (ActionMethod::Post, "consultation", None) => Ok(Self::OpenConsultation),
            (ActionMethod::Post, "approve", None) => Ok(Self::Approve),
            (ActionMethod::Post, "execution", None) => Ok(Self::StartExecution),
            (ActionMethod::Post, "goals", None) => Ok(Self::AddGoal(decode(body)?)),
            (ActionMethod::Put, "goals", Some(id)) => Ok(Self::UpdateGoalProgress {
                goal_id: id.to_string(),
                progress: decode(body)?,
            }),
            (ActionMethod::Post, "hearings", None) => Ok(Self::ScheduleHearing(decode(body)?)),
            _ => Err(DomainError::unknown_action(route)),
        }
    }
}

impl UrbanPlan {
    /// Mean goal completion, or zero when the plan has no goals
    pub fn progress(&self) -> u8 {
        if self.goals.is_empty() {
            return 0;
        }
        let total: u32 = self.goals.iter().map(|g| u32::from(g.progress)).sum();
        (total / self.goals.len() as u32) as u8
    }

    fn transition(&mut self, from: &[PlanStatus], to: PlanStatus) -> Result<(), DomainError> {
        if !from.contains(&self.status) {
            return Err(DomainError::InvalidTransition(format!(
                "cannot move plan from {:?} to {:?}",
                self.status, to
            )));
        }
        self.status = to;
        Ok(())
    }
}

impl Resource for UrbanPlan {
    const KIND: &'static str = "urban_plans";
    const PATH: &'static str = "/urban-planning/plans";
    const ENVELOPE_KEY: &'static str = "plan";

    type Create = CreateUrbanPlanRequest;
    type Update = UpdateUrbanPlanRequest;
    type Filters = PlanFilters;
    type Action = UrbanPlanAction;

    fn id(&self) -> &str {
        &self.id
    }

    fn audit(&self) -> &Audit {
        &self.audit
    }

    fn audit_mut(&mut self) -> &mut Audit {
        &mut self.audit
    }

    fn from_create(id: String, audit: Audit, req: Self::Create) -> Result<Self, DomainError> {
        let plan = Self {
            id,
            title: req.title,
            plan_type: req.plan_type,
            status: PlanStatus::default(),
            description: req.description,
            coverage: req.coverage,
            budget: req.budget,
            timeline: req.timeline,
            responsible: req.responsible,
            goals: Vec::new(),
            public_hearings: Vec::new(),
            approved_on: None,
            documents: Vec::new(),
            audit,
        };
        plan.validate()?;
        Ok(plan)
    }

    fn validate(&self) -> Result<(), DomainError> {
        require_text(&self.title, "title")?;
        require(
            self.timeline.start <= self.timeline.end,
            "plan must not end before it starts",
        )?;
        require(self.budget.is_valid(), "budget amounts must not be negative")?;
        require(
            self.goals.iter().all(|g| g.progress <= 100),
            "goal progress must be between 0 and 100",
        )
    }

    fn reconcile(&mut self, previous: &Self) -> Result<(), DomainError> {
        guard_status_edit(previous.status, self.status, |_, to| to == PlanStatus::Archived)
    }

    fn apply(&mut self, action: Self::Action, ctx: &ActionContext) -> Result<(), DomainError> {
        match action {
            UrbanPlanAction::OpenConsultation => {
                self.transition(&[PlanStatus::Draft], PlanStatus::PublicConsultation)?;
            }
            UrbanPlanAction::Approve => {
                // The master plan statute requires at least one public hearing.
                if self.plan_type == PlanType::MasterPlan {
                    require(
                        !self.public_hearings.is_empty(),
                        "master plans need a public hearing before approval",
                    )?;
                }
                self.transition(
                    &[PlanStatus::Draft, PlanStatus::PublicConsultation],
                    PlanStatus::Approved,
                )?;
                self.approved_on = Some(ctx.now.date_naive());
            }
            UrbanPlanAction::StartExecution => {
                self.transition(&[PlanStatus::Approved], PlanStatus::InExecution)?;
            }
            UrbanPlanAction::AddGoal(goal) => {
                require_text(&goal.description, "goal description")?;
                self.goals.push(PlanGoal {
                    id: ctx.new_id(),
                    description: goal.description,
                    target: goal.target,
                    progress: 0,
                });
            }
            UrbanPlanAction::UpdateGoalProgress { goal_id, progress } => {
                require(
                    progress.progress <= 100,
                    "goal progress must be between 0 and 100",
                )?;
                let goal = self
                    .goals
                    .iter_mut()
                    .find(|g| g.id == goal_id)
                    .ok_or_else(|| DomainError::NotFound(format!("goal {}", goal_id)))?;
                goal.progress = progress.progress;
                if self.status == PlanStatus::InExecution
                    && self.goals.iter().all(|g| g.progress == 100)
                {
                    self.status = PlanStatus::Completed;
                }
            }
            UrbanPlanAction::ScheduleHearing(req) => {
                require_text(&req.location, "hearing location")?;
                if !matches!(
                    self.status,
                    PlanStatus::Draft | PlanStatus::PublicConsultation
                ) {
                    return Err(DomainError::InvalidTransition(format!(
                        "hearings cannot be scheduled for a {:?} plan",
                        self.status
                    )));
                }
                self.public_hearings.push(PublicHearing {
                    id: ctx.new_id(),
                    scheduled_for: req.scheduled_for,
                    location: req.location,
                    attendees: None,
                    minutes: None,
                });
            }
        }
        Ok(())
    }

    fn matches(&self, filters: &Self::Filters) -> bool {
        filters.plan_type.map_or(true, |t| self.plan_type == t)
            && filters.status.map_or(true, |s| self.status == s)
            && filters.neighborhood.as_deref().map_or(true, |n| {
                self.coverage.iter().any(|c| c.eq_ignore_ascii_case(n))
            })
    }

    fn documents_mut(&mut self) -> Option<&mut Vec<Document>> {
        Some(&mut self.documents)
    }
}

// Selectors

pub fn by_status<'a>(
    plans: impl IntoIterator<Item = &'a UrbanPlan>,
    status: PlanStatus,
) -> Vec<UrbanPlan> {
    collect_where(plans, |p| p.status == status)
}

pub fn by_type<'a>(
    plans: impl IntoIterator<Item = &'a UrbanPlan>,
    plan_type: PlanType,
) -> Vec<UrbanPlan> {
    collect_where(plans, |p| p.plan_type == plan_type)
}

pub fn covering<'a>(plans: impl IntoIterator<Item = &'a UrbanPlan>, neighborhood: &str) -> Vec<UrbanPlan> {
    collect_where(plans, |p| {
        p.coverage.iter().any(|c| c.eq_ignore_ascii_case(neighborhood))
    })
}

pub fn total_budget<'a>(plans: impl IntoIterator<Item = &'a UrbanPlan>) -> Decimal {
    plans.into_iter().map(|p| p.budget.planned).sum()
}

/// Mean progress of plans in execution
pub fn average_progress<'a>(plans: impl IntoIterator<Item = &'a UrbanPlan>) -> u8 {
    let running: Vec<u32> = plans
        .into_iter()
        .filter(|p| p.status == PlanStatus::InExecution)
        .map(|p| u32::from(p.progress()))
        .collect();
    if running.is_empty() {
        return 0;
    }
    (running.iter().sum::<u32>() / running.len() as u32) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::merge_update;
    use chrono::Duration;

    fn plan(plan_type: PlanType) -> UrbanPlan {
        UrbanPlan::from_create(
            "p1".to_string(),
            Audit::new(None),
            CreateUrbanPlanRequest {
                title: "Plano Diretor 2030".to_string(),
                plan_type,
                description: None,
                coverage: vec!["Centro".to_string()],
                budget: Budget::default(),
                timeline: Timeline {
                    start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                    end: NaiveDate::from_ymd_opt(2030, 12, 31).unwrap(),
                },
                responsible: None,
            },
        )
        .unwrap()
    }

    #[test]
    fn update_can_archive_but_not_approve() {
        let p = plan(PlanType::Housing);
        let approve = UpdateUrbanPlanRequest {
            status: Some(PlanStatus::Approved),
            ..Default::default()
        };
        assert!(matches!(
            merge_update(&p, &approve),
            Err(DomainError::InvalidTransition(_))
        ));

        let archive = UpdateUrbanPlanRequest {
            status: Some(PlanStatus::Archived),
            ..Default::default()
        };
        assert_eq!(merge_update(&p, &archive).unwrap().status, PlanStatus::Archived);
    }

    #[test]
    fn master_plan_needs_hearing_before_approval() {
        let ctx = ActionContext::new(None);
        let mut p = plan(PlanType::MasterPlan);
        p.apply(UrbanPlanAction::OpenConsultation, &ctx).unwrap();
        assert!(matches!(
            p.apply(UrbanPlanAction::Approve, &ctx),
            Err(DomainError::Validation(_))
        ));
        p.apply(
            UrbanPlanAction::ScheduleHearing(HearingRequest {
                scheduled_for: ctx.now + Duration::days(7),
                location: "Câmara Municipal".to_string(),
            }),
            &ctx,
        )
        .unwrap();
        p.apply(UrbanPlanAction::Approve, &ctx).unwrap();
        assert_eq!(p.status, PlanStatus::Approved);
        assert_eq!(p.approved_on, Some(ctx.now.date_naive()));
    }

    #[test]
    fn completing_all_goals_completes_the_plan() {
        let ctx = ActionContext::new(None);
        let mut p = plan(PlanType::Mobility);
        p.apply(
            UrbanPlanAction::AddGoal(NewGoal {
                description: "Ciclovias".to_string(),
                target: Some("20 km".to_string()),
            }),
            &ctx,
        )
        .unwrap();
        p.apply(UrbanPlanAction::Approve, &ctx).unwrap();
        p.apply(UrbanPlanAction::StartExecution, &ctx).unwrap();

        let goal_id = p.goals[0].id.clone();
        let over = UrbanPlanAction::UpdateGoalProgress {
            goal_id: goal_id.clone(),
            progress: GoalProgress { progress: 120 },
        };
        assert!(p.apply(over, &ctx).is_err());

        p.apply(
            UrbanPlanAction::UpdateGoalProgress {
                goal_id: goal_id.clone(),
                progress: GoalProgress { progress: 50 },
            },
            &ctx,
        )
        .unwrap();
        assert_eq!(average_progress(&[p.clone()]), 50);

        p.apply(
            UrbanPlanAction::UpdateGoalProgress {
                goal_id,
                progress: GoalProgress { progress: 100 },
            },
            &ctx,
        )
        .unwrap();
        assert_eq!(p.status, PlanStatus::Completed);
    }
}
