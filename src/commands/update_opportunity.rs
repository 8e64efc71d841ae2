use std::task::{Context, Poll};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tower::Service;
use tracing::info;
use uuid::Uuid;

use crate::{
    domain::{Actor, Category, Kind, Opportunity, Status, SustainabilityImpact, ValidationError},
    ports::database::{ChangeSet, DatabasePort},
};

use super::{authorize_manage, CommandFuture, DomainLogic, Error};

pub struct UpdateOpportunityRequest {
    pub actor: Actor,
    pub opportunity_id: Uuid,
    pub patch: OpportunityPatch,
}

/// Owner edits to an opportunity
///
/// The sponsor and the participants cannot be changed through a patch.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpportunityPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub category: Option<Category>,
    #[serde(rename = "type")]
    pub kind: Option<Kind>,
    pub date: Option<DateTime<Utc>>,
    pub duration: Option<f64>,
    pub points: Option<u32>,
    pub points_required: Option<u32>,
    pub max_participants: Option<u32>,
    pub skills: Option<Vec<String>>,
    pub requirements: Option<Vec<String>>,
    pub images: Option<Vec<String>>,
    pub sustainability_impact: Option<SustainabilityImpact>,
    /// Only `canceled` may be set explicitly, other statuses follow the schedule
    pub status: Option<Status>,
}

impl OpportunityPatch {
    fn apply(self, opportunity: &mut Opportunity) -> Result<(), ValidationError> {
        // Leaving refunds the current entry cost, so it must stay what participants paid
        let changes_cost = self.kind.map_or(false, |kind| kind != opportunity.kind)
            || self
                .points_required
                .map_or(false, |points| points != opportunity.points_required);
        if changes_cost && opportunity.current_participants > 0 {
            return Err(ValidationError::new(
                "type and pointsRequired cannot change while volunteers are registered",
            ));
        }

        if let Some(title) = self.title {
            opportunity.title = title.trim().to_string();
        }
        if let Some(description) = self.description {
            opportunity.description = description;
        }
        if let Some(location) = self.location {
            opportunity.location = location;
        }
        if let Some(category) = self.category {
            opportunity.category = category;
        }
        if let Some(kind) = self.kind {
            opportunity.kind = kind;
        }
        if let Some(date) = self.date {
            opportunity.date = date;
        }
        if let Some(duration) = self.duration {
            opportunity.duration = duration;
        }
        if let Some(points) = self.points {
            opportunity.points = points;
        }
        if let Some(points_required) = self.points_required {
            opportunity.points_required = points_required;
        }
        if let Some(max_participants) = self.max_participants {
            opportunity.max_participants = max_participants;
        }
        if let Some(skills) = self.skills {
            opportunity.skills = skills;
        }
        if let Some(requirements) = self.requirements {
            opportunity.requirements = requirements;
        }
        if let Some(images) = self.images {
            opportunity.images = images;
        }
        if let Some(impact) = self.sustainability_impact {
            opportunity.sustainability_impact = Some(impact);
        }
        match self.status {
            None => {}
            Some(Status::Canceled) if opportunity.is_settled() => {
                return Err(ValidationError::new(
                    "a completed opportunity cannot be canceled",
                ))
            }
            Some(Status::Canceled) => opportunity.status = Status::Canceled,
            Some(status) => {
                return Err(ValidationError::new(format!(
                    "status cannot be set to {status:?}, only canceled"
                )))
            }
        }
        opportunity.validate()
    }
}

impl<D> Service<UpdateOpportunityRequest> for DomainLogic<D>
where
    D: DatabasePort + Send + Sync + 'static,
{
    type Response = Opportunity;
    type Error = Error;
    type Future = CommandFuture<Self::Response>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: UpdateOpportunityRequest) -> Self::Future {
        let database = self.database.clone();
        Box::pin(async move {
            let mut opportunity = database.get_opportunity(req.opportunity_id).await?;
            authorize_manage(&req.actor, &opportunity, "update")?;

            req.patch.apply(&mut opportunity)?;
            opportunity.touch(Utc::now());

            let mut committed = database
                .commit(ChangeSet::default().with_opportunity(opportunity))
                .await?;
            info!(opportunity_id = %req.opportunity_id, "opportunity updated");

            committed.opportunities.pop().ok_or(Error::NotFound {
                resource: "Opportunity",
                id: req.opportunity_id,
            })
        })
    }
}
