use std::task::{Context, Poll};

use chrono::Utc;
use tower::Service;
use tracing::info;
use uuid::Uuid;

use crate::{
    domain::{Actor, Opportunity},
    ports::database::{ChangeSet, DatabasePort},
};

use super::{ensure_open, require_volunteer, CommandFuture, DomainLogic, Error};

pub struct LeaveOpportunityRequest {
    pub actor: Actor,
    pub opportunity_id: Uuid,
}

impl<D> Service<LeaveOpportunityRequest> for DomainLogic<D>
where
    D: DatabasePort + Send + Sync + 'static,
{
    type Response = Opportunity;
    type Error = Error;
    type Future = CommandFuture<Self::Response>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: LeaveOpportunityRequest) -> Self::Future {
        let database = self.database.clone();
        Box::pin(async move {
            let volunteer_id = require_volunteer(&req.actor)?;
            let now = Utc::now();

            let mut opportunity = database.get_opportunity(req.opportunity_id).await?;
            if !opportunity.has_participant(volunteer_id) {
                return Err(Error::NotRegistered);
            }
            ensure_open(&opportunity)?;
            if opportunity.has_started(now) {
                return Err(Error::PastEvent);
            }
            let mut volunteer = database.get_volunteer(volunteer_id).await?;

            opportunity.remove_participant(volunteer_id);
            opportunity.touch(now);
            volunteer.unattend(opportunity.id);
            let refund = opportunity.entry_cost();
            if let Some(points) = refund {
                volunteer.credit_points(points);
            }

            let mut committed = database
                .commit(
                    ChangeSet::default()
                        .with_opportunity(opportunity)
                        .with_volunteer(volunteer),
                )
                .await?;
            info!(
                opportunity_id = %req.opportunity_id,
                %volunteer_id,
                refund = refund.unwrap_or(0),
                "volunteer left"
            );

            committed.opportunities.pop().ok_or(Error::NotFound {
                resource: "Opportunity",
                id: req.opportunity_id,
            })
        })
    }
}
