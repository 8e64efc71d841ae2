use uuid::Uuid;

use crate::domain::{Category, Company, Kind, Opportunity, Volunteer};

#[mockall::automock]
#[async_trait::async_trait]
pub trait DatabasePort {
    async fn get_opportunity(&self, opportunity_id: Uuid) -> Result<Opportunity, Error>;
    async fn list_opportunities(&self, filter: OpportunityFilter)
        -> Result<Vec<Opportunity>, Error>;
    async fn get_volunteer(&self, volunteer_id: Uuid) -> Result<Volunteer, Error>;
    /// Volunteers whose attended or completed set references the opportunity
    async fn find_volunteers_by_opportunity(
        &self,
        opportunity_id: Uuid,
    ) -> Result<Vec<Volunteer>, Error>;
    async fn get_company(&self, company_id: Uuid) -> Result<Company, Error>;
    /// Atomically write every record in the change set
    ///
    /// Either all records are written and returned with their new version, or nothing is written.
    async fn commit(&self, changes: ChangeSet) -> Result<ChangeSet, Error>;
}

/// Records written together by a single operation
///
/// Every record carries the version it was read at. A record with version `0` is a new record.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChangeSet {
    pub opportunities: Vec<Opportunity>,
    pub deleted_opportunities: Vec<Opportunity>,
    pub volunteers: Vec<Volunteer>,
    pub companies: Vec<Company>,
}

impl ChangeSet {
    pub fn with_opportunity(mut self, opportunity: Opportunity) -> Self {
        self.opportunities.push(opportunity);
        self
    }

    pub fn deleting_opportunity(mut self, opportunity: Opportunity) -> Self {
        self.deleted_opportunities.push(opportunity);
        self
    }

    pub fn with_volunteer(mut self, volunteer: Volunteer) -> Self {
        self.volunteers.push(volunteer);
        self
    }

    pub fn with_company(mut self, company: Company) -> Self {
        self.companies.push(company);
        self
    }
}

/// Stored-side filter for opportunity listings
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OpportunityFilter {
    pub kind: Option<Kind>,
    pub category: Option<Category>,
    pub sponsored_by: Option<Uuid>,
    /// Case-insensitive substring of the location
    pub location: Option<String>,
    /// Only opportunities whose entry cost is strictly above this value
    pub points_required_above: Option<u32>,
}

impl OpportunityFilter {
    pub fn matches(&self, opportunity: &Opportunity) -> bool {
        self.kind.map_or(true, |kind| opportunity.kind == kind)
            && self
                .category
                .map_or(true, |category| opportunity.category == category)
            && self
                .sponsored_by
                .map_or(true, |company| opportunity.sponsored_by == Some(company))
            && self.location.as_ref().map_or(true, |location| {
                opportunity
                    .location
                    .to_lowercase()
                    .contains(&location.to_lowercase())
            })
            && self
                .points_required_above
                .map_or(true, |points| opportunity.points_required > points)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("opportunity {0} does not exist")]
    OpportunityNotFound(Uuid),
    #[error("volunteer {0} does not exist")]
    VolunteerNotFound(Uuid),
    #[error("company {0} does not exist")]
    CompanyNotFound(Uuid),

    /// The record was modified since it was read
    ///
    /// Nothing from the change set was written.
    #[error("record {0} was modified concurrently")]
    VersionConflict(Uuid),

    /// A unique field already belongs to another record
    #[error("{field} '{value}' is already taken")]
    UniqueViolation { field: &'static str, value: String },

    /// Concrete adapter errors
    ///
    /// This could represent any errors from a concrete adapter that is not part of the domain
    /// model, such as connectivity, configuration, or permission errors.
    #[error("adapter error: {0:?}")]
    Adapter(Box<dyn std::error::Error + Send + Sync>),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::test_opportunity;
    use chrono::Utc;
    use rstest::*;
    use speculoos::prelude::*;

    #[rstest]
    #[case(OpportunityFilter::default(), true)]
    #[case(OpportunityFilter { location: Some("corniche".to_string()), ..Default::default() }, true)]
    #[case(OpportunityFilter { location: Some("riyadh".to_string()), ..Default::default() }, false)]
    #[case(OpportunityFilter { kind: Some(Kind::ExclusiveEvent), ..Default::default() }, false)]
    #[case(OpportunityFilter { category: Some(Category::Environmental), ..Default::default() }, true)]
    #[case(OpportunityFilter { points_required_above: Some(0), ..Default::default() }, false)]
    fn test_filter_matches(#[case] filter: OpportunityFilter, #[case] expected: bool) {
        let opportunity = test_opportunity(Utc::now());

        assert_that!(filter.matches(&opportunity)).is_equal_to(expected);
    }
}
