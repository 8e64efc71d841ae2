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

pub struct JoinOpportunityRequest {
    pub actor: Actor,
    pub opportunity_id: Uuid,
}

impl<D> Service<JoinOpportunityRequest> for DomainLogic<D>
where
    D: DatabasePort + Send + Sync + 'static,
{
    type Response = Opportunity;
    type Error = Error;
    type Future = CommandFuture<Self::Response>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: JoinOpportunityRequest) -> Self::Future {
        let database = self.database.clone();
        Box::pin(async move {
            let volunteer_id = require_volunteer(&req.actor)?;

            // Check every precondition before changing anything
            let mut opportunity = database.get_opportunity(req.opportunity_id).await?;
            ensure_open(&opportunity)?;
            if opportunity.is_full() {
                return Err(Error::Capacity);
            }
            if opportunity.has_participant(volunteer_id) {
                return Err(Error::DuplicateRegistration);
            }
            let mut volunteer = database.get_volunteer(volunteer_id).await?;
            if let Some(cost) = opportunity.entry_cost() {
                volunteer
                    .spend_points(cost)
                    .map_err(|available| Error::InsufficientPoints {
                        required: cost,
                        available,
                    })?;
            }

            // Participant list, count and ledger are written together
            opportunity.push_participant(volunteer_id);
            opportunity.touch(Utc::now());
            volunteer.attend(opportunity.id);

            let mut committed = database
                .commit(
                    ChangeSet::default()
                        .with_opportunity(opportunity)
                        .with_volunteer(volunteer),
                )
                .await?;
            info!(opportunity_id = %req.opportunity_id, %volunteer_id, "volunteer joined");

            committed.opportunities.pop().ok_or(Error::NotFound {
                resource: "Opportunity",
                id: req.opportunity_id,
            })
        })
    }
}
