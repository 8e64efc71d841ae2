//! Read-only queries
//!
//! Statuses are reported as they are at read time, without writing them back.

use std::task::{Context, Poll};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tower::Service;
use uuid::Uuid;

use crate::{
    domain::{Category, ImpactMetrics, Kind, Opportunity, Status},
    ports::database::{DatabasePort, Error as DatabaseError, OpportunityFilter},
};

use super::{CommandFuture, DomainLogic, Error};

/// Opportunities of one type, `volunteering` unless asked otherwise
#[derive(Clone, Debug, Default)]
pub struct ListOpportunitiesRequest {
    pub kind: Option<Kind>,
    pub category: Option<Category>,
    pub status: Option<Status>,
    pub sponsored_by: Option<Uuid>,
}

/// Exclusive events that cost points to join
pub struct ListExclusiveEventsRequest;

pub struct GetOpportunityRequest {
    pub opportunity_id: Uuid,
}

pub struct OpportunitiesByCategoryRequest {
    pub category: Category,
}

pub struct OpportunitiesByLocationRequest {
    /// Case-insensitive part of the location
    pub location: String,
}

pub struct VolunteerStatsRequest {
    pub volunteer_id: Uuid,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VolunteerStats {
    pub id: Uuid,
    pub name: String,
    pub points: u32,
    pub events_completed: usize,
    pub hours_volunteered: f64,
    /// Joined opportunities that have not started yet
    pub upcoming: usize,
}

pub struct CompanyImpactRequest {
    pub company_id: Uuid,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyImpact {
    pub id: Uuid,
    pub name: String,
    pub impact_metrics: ImpactMetrics,
    pub sponsored_opportunities: usize,
}

/// Refresh statuses and order by date, earliest first
fn by_date(mut opportunities: Vec<Opportunity>, now: DateTime<Utc>) -> Vec<Opportunity> {
    for opportunity in opportunities.iter_mut() {
        opportunity.status = opportunity.current_status(now);
    }
    opportunities.sort_by_key(|o| o.date);
    opportunities
}

impl<D> Service<ListOpportunitiesRequest> for DomainLogic<D>
where
    D: DatabasePort + Send + Sync + 'static,
{
    type Response = Vec<Opportunity>;
    type Error = Error;
    type Future = CommandFuture<Self::Response>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: ListOpportunitiesRequest) -> Self::Future {
        let database = self.database.clone();
        Box::pin(async move {
            let filter = OpportunityFilter {
                kind: Some(req.kind.unwrap_or(Kind::Volunteering)),
                category: req.category,
                sponsored_by: req.sponsored_by,
                ..Default::default()
            };
            let mut opportunities = by_date(database.list_opportunities(filter).await?, Utc::now());
            if let Some(status) = req.status {
                opportunities.retain(|o| o.status == status);
            }
            Ok(opportunities)
        })
    }
}

impl<D> Service<ListExclusiveEventsRequest> for DomainLogic<D>
where
    D: DatabasePort + Send + Sync + 'static,
{
    type Response = Vec<Opportunity>;
    type Error = Error;
    type Future = CommandFuture<Self::Response>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, _req: ListExclusiveEventsRequest) -> Self::Future {
        let database = self.database.clone();
        Box::pin(async move {
            let filter = OpportunityFilter {
                kind: Some(Kind::ExclusiveEvent),
                points_required_above: Some(0),
                ..Default::default()
            };
            Ok(by_date(database.list_opportunities(filter).await?, Utc::now()))
        })
    }
}

impl<D> Service<GetOpportunityRequest> for DomainLogic<D>
where
    D: DatabasePort + Send + Sync + 'static,
{
    type Response = Opportunity;
    type Error = Error;
    type Future = CommandFuture<Self::Response>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: GetOpportunityRequest) -> Self::Future {
        let database = self.database.clone();
        Box::pin(async move {
            let mut opportunity = database.get_opportunity(req.opportunity_id).await?;
            opportunity.status = opportunity.current_status(Utc::now());
            Ok(opportunity)
        })
    }
}

impl<D> Service<OpportunitiesByCategoryRequest> for DomainLogic<D>
where
    D: DatabasePort + Send + Sync + 'static,
{
    type Response = Vec<Opportunity>;
    type Error = Error;
    type Future = CommandFuture<Self::Response>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: OpportunitiesByCategoryRequest) -> Self::Future {
        let database = self.database.clone();
        Box::pin(async move {
            let filter = OpportunityFilter {
                category: Some(req.category),
                ..Default::default()
            };
            Ok(by_date(database.list_opportunities(filter).await?, Utc::now()))
        })
    }
}

impl<D> Service<OpportunitiesByLocationRequest> for DomainLogic<D>
where
    D: DatabasePort + Send + Sync + 'static,
{
    type Response = Vec<Opportunity>;
    type Error = Error;
    type Future = CommandFuture<Self::Response>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: OpportunitiesByLocationRequest) -> Self::Future {
        let database = self.database.clone();
        Box::pin(async move {
            let filter = OpportunityFilter {
                location: Some(req.location),
                ..Default::default()
            };
            Ok(by_date(database.list_opportunities(filter).await?, Utc::now()))
        })
    }
}

impl<D> Service<VolunteerStatsRequest> for DomainLogic<D>
where
    D: DatabasePort + Send + Sync + 'static,
{
    type Response = VolunteerStats;
    type Error = Error;
    type Future = CommandFuture<Self::Response>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: VolunteerStatsRequest) -> Self::Future {
        let database = self.database.clone();
        Box::pin(async move {
            let volunteer = database.get_volunteer(req.volunteer_id).await?;
            let now = Utc::now();

            let mut hours_volunteered = 0.0;
            for id in &volunteer.completed_opportunities {
                match database.get_opportunity(*id).await {
                    Ok(opportunity) => hours_volunteered += opportunity.duration,
                    Err(DatabaseError::OpportunityNotFound(_)) => {}
                    Err(err) => return Err(err.into()),
                }
            }
            let mut upcoming = 0;
            for id in &volunteer.attended_opportunities {
                match database.get_opportunity(*id).await {
                    Ok(opportunity) if !opportunity.has_started(now) => upcoming += 1,
                    Ok(_) | Err(DatabaseError::OpportunityNotFound(_)) => {}
                    Err(err) => return Err(err.into()),
                }
            }

            Ok(VolunteerStats {
                id: volunteer.id,
                name: volunteer.username,
                points: volunteer.points,
                events_completed: volunteer.completed_opportunities.len(),
                hours_volunteered,
                upcoming,
            })
        })
    }
}

impl<D> Service<CompanyImpactRequest> for DomainLogic<D>
where
    D: DatabasePort + Send + Sync + 'static,
{
    type Response = CompanyImpact;
    type Error = Error;
    type Future = CommandFuture<Self::Response>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: CompanyImpactRequest) -> Self::Future {
        let database = self.database.clone();
        Box::pin(async move {
            let company = database.get_company(req.company_id).await?;
            Ok(CompanyImpact {
                id: company.id,
                name: company.name,
                impact_metrics: company.impact_metrics,
                sponsored_opportunities: company.sponsored_opportunities.len(),
            })
        })
    }
}
