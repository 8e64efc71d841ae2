use std::task::{Context, Poll};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tower::Service;
use tracing::info;
use uuid::Uuid;

use crate::{
    domain::{Actor, Category, Kind, Opportunity, Status, SustainabilityImpact},
    ports::database::{ChangeSet, DatabasePort},
};

use super::{CommandFuture, DomainLogic, Error};

pub struct CreateOpportunityRequest {
    pub actor: Actor,
    pub payload: NewOpportunity,
}

/// Attributes supplied when creating an opportunity
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewOpportunity {
    pub title: String,
    pub description: String,
    pub location: String,
    pub category: Category,
    #[serde(rename = "type", default)]
    pub kind: Kind,
    pub date: DateTime<Utc>,
    pub duration: f64,
    pub points: u32,
    #[serde(default)]
    pub points_required: u32,
    pub max_participants: u32,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    /// Only honoured for admins; companies always sponsor their own opportunities
    #[serde(default)]
    pub sponsored_by: Option<Uuid>,
    #[serde(default)]
    pub sustainability_impact: Option<SustainabilityImpact>,
}

impl NewOpportunity {
    fn into_opportunity(self, sponsored_by: Option<Uuid>, now: DateTime<Utc>) -> Opportunity {
        Opportunity {
            id: Uuid::new_v4(),
            title: self.title.trim().to_string(),
            description: self.description,
            location: self.location,
            category: self.category,
            kind: self.kind,
            date: self.date,
            duration: self.duration,
            points: self.points,
            points_required: self.points_required,
            max_participants: self.max_participants,
            current_participants: 0,
            participants: Vec::new(),
            status: Status::Upcoming,
            skills: self.skills,
            requirements: self.requirements,
            images: self.images,
            sponsored_by,
            sustainability_impact: self.sustainability_impact,
            completed_at: None,
            created_at: now,
            updated_at: now,
            version: 0,
        }
    }
}

impl<D> Service<CreateOpportunityRequest> for DomainLogic<D>
where
    D: DatabasePort + Send + Sync + 'static,
{
    type Response = Opportunity;
    type Error = Error;
    type Future = CommandFuture<Self::Response>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: CreateOpportunityRequest) -> Self::Future {
        let database = self.database.clone();
        Box::pin(async move {
            // Companies cannot create opportunities on behalf of another company
            let sponsored_by = match req.actor {
                Actor::Company(id) => Some(id),
                Actor::Admin(_) => req.payload.sponsored_by,
                Actor::Volunteer(_) => {
                    return Err(Error::Forbidden(
                        "Role volunteer is not authorized to access this route".into(),
                    ))
                }
            };

            let now = Utc::now();
            let mut opportunity = req.payload.into_opportunity(sponsored_by, now);
            opportunity.validate()?;
            opportunity.touch(now);

            let mut changes = ChangeSet::default();
            if let Some(company_id) = sponsored_by {
                let mut company = database.get_company(company_id).await?;
                company.sponsor(opportunity.id);
                changes = changes.with_company(company);
            }

            let opportunity_id = opportunity.id;
            let mut committed = database
                .commit(changes.with_opportunity(opportunity))
                .await?;
            info!(%opportunity_id, company_id = ?sponsored_by, "opportunity created");

            committed
                .opportunities
                .pop()
                .ok_or(Error::NotFound {
                    resource: "Opportunity",
                    id: opportunity_id,
                })
        })
    }
}
