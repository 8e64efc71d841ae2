use axum::{
    body::Bytes,
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use crate::{
    commands::{
        complete_opportunity::{CompleteOpportunityRequest, SkippedAward},
        create_opportunity::{CreateOpportunityRequest, NewOpportunity},
        delete_opportunity::DeleteOpportunityRequest,
        join_opportunity::JoinOpportunityRequest,
        leave_opportunity::LeaveOpportunityRequest,
        queries::{
            CompanyImpact, CompanyImpactRequest, GetOpportunityRequest, ListExclusiveEventsRequest,
            ListOpportunitiesRequest, OpportunitiesByCategoryRequest,
            OpportunitiesByLocationRequest, VolunteerStats, VolunteerStatsRequest,
        },
        update_opportunity::{OpportunityPatch, UpdateOpportunityRequest},
    },
    domain::{Category, Kind, Opportunity, Status},
    ports::database::DatabasePort,
};

use super::{auth::Authenticated, error::ApiError, AppState};

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Serialize)]
pub(super) struct Envelope<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
    data: T,
}

impl<T> Envelope<T> {
    fn data(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            count: None,
            data,
        })
    }
}

impl<T> Envelope<Vec<T>> {
    fn list(data: Vec<T>) -> Json<Self> {
        Json(Self {
            success: true,
            count: Some(data.len()),
            data,
        })
    }
}

/// Opportunity as exposed to clients, with its derived fields
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct OpportunityView {
    #[serde(flatten)]
    opportunity: Opportunity,
    remaining_spots: u32,
}

impl From<Opportunity> for OpportunityView {
    fn from(opportunity: Opportunity) -> Self {
        Self {
            remaining_spots: opportunity.remaining_spots(),
            opportunity,
        }
    }
}

fn views(opportunities: Vec<Opportunity>) -> Vec<OpportunityView> {
    opportunities.into_iter().map(Into::into).collect()
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CompletionView {
    success: bool,
    data: OpportunityView,
    awarded: Vec<Uuid>,
    skipped: Vec<SkippedAward>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ListQuery {
    #[serde(rename = "type")]
    kind: Option<Kind>,
    category: Option<Category>,
    status: Option<Status>,
    sponsored_by: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct CompleteBody {
    attendees: Option<Vec<Uuid>>,
}

pub(super) async fn list_opportunities<D>(
    State(state): State<AppState<D>>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Envelope<Vec<OpportunityView>>>
where
    D: DatabasePort + Send + Sync + 'static,
{
    let Query(query) = query?;
    let opportunities = state
        .logic
        .oneshot(ListOpportunitiesRequest {
            kind: query.kind,
            category: query.category,
            status: query.status,
            sponsored_by: query.sponsored_by,
        })
        .await?;

    Ok(Envelope::list(views(opportunities)))
}

pub(super) async fn list_exclusive_events<D>(
    State(state): State<AppState<D>>,
) -> ApiResult<Envelope<Vec<OpportunityView>>>
where
    D: DatabasePort + Send + Sync + 'static,
{
    let events = state.logic.oneshot(ListExclusiveEventsRequest).await?;

    Ok(Envelope::list(views(events)))
}

pub(super) async fn get_opportunity<D>(
    State(state): State<AppState<D>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Envelope<OpportunityView>>
where
    D: DatabasePort + Send + Sync + 'static,
{
    let Path(opportunity_id) = id?;
    let opportunity = state
        .logic
        .oneshot(GetOpportunityRequest { opportunity_id })
        .await?;

    Ok(Envelope::data(opportunity.into()))
}

pub(super) async fn create_opportunity<D>(
    State(state): State<AppState<D>>,
    Authenticated(actor): Authenticated,
    payload: Result<Json<NewOpportunity>, JsonRejection>,
) -> Result<(StatusCode, Json<Envelope<OpportunityView>>), ApiError>
where
    D: DatabasePort + Send + Sync + 'static,
{
    let Json(payload) = payload?;
    let opportunity = state
        .logic
        .oneshot(CreateOpportunityRequest { actor, payload })
        .await?;

    Ok((StatusCode::CREATED, Envelope::data(opportunity.into())))
}

pub(super) async fn update_opportunity<D>(
    State(state): State<AppState<D>>,
    Authenticated(actor): Authenticated,
    id: Result<Path<Uuid>, PathRejection>,
    patch: Result<Json<OpportunityPatch>, JsonRejection>,
) -> ApiResult<Envelope<OpportunityView>>
where
    D: DatabasePort + Send + Sync + 'static,
{
    let Path(opportunity_id) = id?;
    let Json(patch) = patch?;
    let opportunity = state
        .logic
        .oneshot(UpdateOpportunityRequest {
            actor,
            opportunity_id,
            patch,
        })
        .await?;

    Ok(Envelope::data(opportunity.into()))
}

pub(super) async fn delete_opportunity<D>(
    State(state): State<AppState<D>>,
    Authenticated(actor): Authenticated,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Envelope<Value>>
where
    D: DatabasePort + Send + Sync + 'static,
{
    let Path(opportunity_id) = id?;
    state
        .logic
        .oneshot(DeleteOpportunityRequest {
            actor,
            opportunity_id,
        })
        .await?;

    Ok(Envelope::data(json!({})))
}

pub(super) async fn join_opportunity<D>(
    State(state): State<AppState<D>>,
    Authenticated(actor): Authenticated,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Envelope<OpportunityView>>
where
    D: DatabasePort + Send + Sync + 'static,
{
    let Path(opportunity_id) = id?;
    let opportunity = state
        .logic
        .oneshot(JoinOpportunityRequest {
            actor,
            opportunity_id,
        })
        .await?;

    Ok(Envelope::data(opportunity.into()))
}

pub(super) async fn leave_opportunity<D>(
    State(state): State<AppState<D>>,
    Authenticated(actor): Authenticated,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Envelope<OpportunityView>>
where
    D: DatabasePort + Send + Sync + 'static,
{
    let Path(opportunity_id) = id?;
    let opportunity = state
        .logic
        .oneshot(LeaveOpportunityRequest {
            actor,
            opportunity_id,
        })
        .await?;

    Ok(Envelope::data(opportunity.into()))
}

pub(super) async fn complete_opportunity<D>(
    State(state): State<AppState<D>>,
    Authenticated(actor): Authenticated,
    id: Result<Path<Uuid>, PathRejection>,
    body: Bytes,
) -> ApiResult<CompletionView>
where
    D: DatabasePort + Send + Sync + 'static,
{
    let Path(opportunity_id) = id?;
    // The attendee list is optional, so is the body
    let body: CompleteBody = if body.is_empty() {
        CompleteBody::default()
    } else {
        serde_json::from_slice(&body).map_err(|err| ApiError::MalformedRequest(err.to_string()))?
    };

    let report = state
        .logic
        .oneshot(CompleteOpportunityRequest {
            actor,
            opportunity_id,
            attendees: body.attendees,
        })
        .await?;

    Ok(Json(CompletionView {
        success: true,
        data: report.opportunity.into(),
        awarded: report.awarded,
        skipped: report.skipped,
    }))
}

pub(super) async fn opportunities_by_category<D>(
    State(state): State<AppState<D>>,
    category: Result<Path<String>, PathRejection>,
) -> ApiResult<Envelope<Vec<OpportunityView>>>
where
    D: DatabasePort + Send + Sync + 'static,
{
    let Path(category) = category?;
    let category = category
        .parse::<Category>()
        .map_err(crate::commands::Error::from)?;
    let opportunities = state
        .logic
        .oneshot(OpportunitiesByCategoryRequest { category })
        .await?;

    Ok(Envelope::list(views(opportunities)))
}

pub(super) async fn opportunities_by_location<D>(
    State(state): State<AppState<D>>,
    location: Result<Path<String>, PathRejection>,
) -> ApiResult<Envelope<Vec<OpportunityView>>>
where
    D: DatabasePort + Send + Sync + 'static,
{
    let Path(location) = location?;
    let opportunities = state
        .logic
        .oneshot(OpportunitiesByLocationRequest { location })
        .await?;

    Ok(Envelope::list(views(opportunities)))
}

pub(super) async fn volunteer_stats<D>(
    State(state): State<AppState<D>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Envelope<VolunteerStats>>
where
    D: DatabasePort + Send + Sync + 'static,
{
    let Path(volunteer_id) = id?;
    let stats = state
        .logic
        .oneshot(VolunteerStatsRequest { volunteer_id })
        .await?;

    Ok(Envelope::data(stats))
}

pub(super) async fn company_impact<D>(
    State(state): State<AppState<D>>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Envelope<CompanyImpact>>
where
    D: DatabasePort + Send + Sync + 'static,
{
    let Path(company_id) = id?;
    let impact = state
        .logic
        .oneshot(CompanyImpactRequest { company_id })
        .await?;

    Ok(Envelope::data(impact))
}
