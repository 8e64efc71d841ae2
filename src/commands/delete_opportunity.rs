use std::task::{Context, Poll};

use tower::Service;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    domain::Actor,
    ports::database::{ChangeSet, DatabasePort, Error as DatabaseError},
};

use super::{authorize_manage, CommandFuture, DomainLogic, Error};

pub struct DeleteOpportunityRequest {
    pub actor: Actor,
    pub opportunity_id: Uuid,
}

impl<D> Service<DeleteOpportunityRequest> for DomainLogic<D>
where
    D: DatabasePort + Send + Sync + 'static,
{
    type Response = ();
    type Error = Error;
    type Future = CommandFuture<Self::Response>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    /// Delete an opportunity and every reference to it
    ///
    /// Points paid to join an exclusive event are not refunded.
    fn call(&mut self, req: DeleteOpportunityRequest) -> Self::Future {
        let database = self.database.clone();
        Box::pin(async move {
            let opportunity = database.get_opportunity(req.opportunity_id).await?;
            authorize_manage(&req.actor, &opportunity, "delete")?;
            let opportunity_id = opportunity.id;

            let mut changes = ChangeSet::default();
            if let Some(company_id) = opportunity.sponsored_by {
                match database.get_company(company_id).await {
                    Ok(mut company) => {
                        company.unsponsor(opportunity_id);
                        changes = changes.with_company(company);
                    }
                    Err(DatabaseError::CompanyNotFound(_)) => {
                        warn!(%opportunity_id, %company_id, "sponsoring company no longer exists");
                    }
                    Err(err) => return Err(err.into()),
                }
            }
            for mut volunteer in database.find_volunteers_by_opportunity(opportunity_id).await? {
                volunteer.forget(opportunity_id);
                changes = changes.with_volunteer(volunteer);
            }

            let changes = changes.deleting_opportunity(opportunity);
            let volunteers = changes.volunteers.len();
            database.commit(changes).await?;
            info!(%opportunity_id, volunteers, "opportunity deleted");

            Ok(())
        })
    }
}
