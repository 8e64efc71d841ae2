use std::task::{Context, Poll};

use chrono::Utc;
use serde::Serialize;
use tower::Service;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    domain::{Actor, ImpactDelta, Kind, Opportunity},
    ports::database::{ChangeSet, DatabasePort, Error as DatabaseError},
};

use super::{authorize_manage, CommandFuture, DomainLogic, Error};

/// Attempts for a single ledger or company update that keeps losing the race to other writers
const MAX_SETTLE_ATTEMPTS: usize = 3;

pub struct CompleteOpportunityRequest {
    pub actor: Actor,
    pub opportunity_id: Uuid,
    /// Volunteers who actually attended, defaults to every participant
    pub attendees: Option<Vec<Uuid>>,
}

/// Outcome of settling a completed opportunity
///
/// Awarding points is best-effort: a volunteer whose ledger cannot be updated is reported in
/// `skipped` and does not prevent the others from being processed.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionReport {
    pub opportunity: Opportunity,
    /// Volunteers whose ledger was updated
    pub awarded: Vec<Uuid>,
    pub skipped: Vec<SkippedAward>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkippedAward {
    pub volunteer_id: Uuid,
    pub reason: String,
}

impl<D> Service<CompleteOpportunityRequest> for DomainLogic<D>
where
    D: DatabasePort + Send + Sync + 'static,
{
    type Response = CompletionReport;
    type Error = Error;
    type Future = CommandFuture<Self::Response>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: CompleteOpportunityRequest) -> Self::Future {
        let database = self.database.clone();
        Box::pin(async move {
            let mut opportunity = database.get_opportunity(req.opportunity_id).await?;
            authorize_manage(&req.actor, &opportunity, "complete")?;
            if opportunity.is_canceled() {
                return Err(Error::Canceled);
            }
            if opportunity.is_settled() {
                return Err(Error::AlreadyCompleted);
            }

            // Settling first means a concurrent completion conflicts instead of awarding twice
            let now = Utc::now();
            opportunity.completed_at = Some(now);
            opportunity.touch(now);
            let opportunity = database
                .commit(ChangeSet::default().with_opportunity(opportunity))
                .await?
                .opportunities
                .pop()
                .ok_or(Error::NotFound {
                    resource: "Opportunity",
                    id: req.opportunity_id,
                })?;
            info!(opportunity_id = %opportunity.id, "opportunity completed");

            let attendees = award_list(req.attendees, &opportunity);
            let mut awarded = Vec::new();
            let mut skipped = Vec::new();
            for volunteer_id in attendees.iter().copied() {
                match award(database.as_ref(), &opportunity, volunteer_id).await {
                    Ok(true) => awarded.push(volunteer_id),
                    Ok(false) => {}
                    Err(err) => {
                        warn!(
                            opportunity_id = %opportunity.id,
                            %volunteer_id,
                            error = %err,
                            "skipping award"
                        );
                        skipped.push(SkippedAward {
                            volunteer_id,
                            reason: err.to_string(),
                        });
                    }
                }
            }

            if let Some(company_id) = opportunity.sponsored_by {
                let delta = ImpactDelta {
                    carbon_offset: Some(opportunity.carbon_reduction()),
                    volunteers_engaged: Some(attendees.len() as u64),
                    hours_contributed: Some(opportunity.duration * attendees.len() as f64),
                };
                if let Err(err) = update_impact(database.as_ref(), company_id, &delta).await {
                    warn!(
                        opportunity_id = %opportunity.id,
                        %company_id,
                        error = %err,
                        "failed to update impact metrics"
                    );
                }
            }

            Ok(CompletionReport {
                opportunity,
                awarded,
                skipped,
            })
        })
    }
}

/// Volunteers to settle, without duplicates
fn award_list(attendees: Option<Vec<Uuid>>, opportunity: &Opportunity) -> Vec<Uuid> {
    let mut list: Vec<Uuid> = Vec::new();
    for id in attendees.unwrap_or_else(|| opportunity.participants.clone()) {
        if !list.contains(&id) {
            list.push(id);
        }
    }
    list
}

/// Award the opportunity's points to one volunteer
///
/// Each listed volunteer is credited once per completion, even if a stale ledger already lists
/// the opportunity as completed; only the completed set insertion is skipped then. Returns
/// `false` when there was nothing to award. Exclusive events never award points, their value was
/// paid when joining.
async fn award<D: DatabasePort>(
    database: &D,
    opportunity: &Opportunity,
    volunteer_id: Uuid,
) -> Result<bool, DatabaseError> {
    if opportunity.kind != Kind::Volunteering {
        return Ok(false);
    }

    for attempt in 1..=MAX_SETTLE_ATTEMPTS {
        let mut volunteer = database.get_volunteer(volunteer_id).await?;
        volunteer.complete(opportunity.id);
        volunteer.credit_points(opportunity.points);

        match database
            .commit(ChangeSet::default().with_volunteer(volunteer))
            .await
        {
            Ok(_) => return Ok(true),
            Err(DatabaseError::VersionConflict(_)) if attempt < MAX_SETTLE_ATTEMPTS => continue,
            Err(err) => return Err(err),
        }
    }
    Err(DatabaseError::VersionConflict(volunteer_id))
}

async fn update_impact<D: DatabasePort>(
    database: &D,
    company_id: Uuid,
    delta: &ImpactDelta,
) -> Result<(), DatabaseError> {
    for attempt in 1..=MAX_SETTLE_ATTEMPTS {
        let mut company = database.get_company(company_id).await?;
        let metrics = company.update_impact_metrics(delta);

        match database
            .commit(ChangeSet::default().with_company(company))
            .await
        {
            Ok(_) => {
                info!(
                    %company_id,
                    hours_contributed = metrics.hours_contributed,
                    volunteers_engaged = metrics.volunteers_engaged,
                    "impact metrics updated"
                );
                return Ok(());
            }
            Err(DatabaseError::VersionConflict(_)) if attempt < MAX_SETTLE_ATTEMPTS => continue,
            Err(err) => return Err(err),
        }
    }
    Err(DatabaseError::VersionConflict(company_id))
}
