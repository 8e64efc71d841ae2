use std::{fmt, str::FromStr};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ValidationError;

/// Volunteering opportunity or points-gated exclusive event
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Opportunity {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub location: String,
    pub category: Category,
    #[serde(rename = "type")]
    pub kind: Kind,
    /// Scheduled start of the opportunity
    pub date: DateTime<Utc>,
    /// Duration in hours
    pub duration: f64,
    /// Points awarded to each attendee of a volunteering opportunity
    pub points: u32,
    /// Points a volunteer pays to join an exclusive event
    ///
    /// Ignored for volunteering opportunities.
    #[serde(default)]
    pub points_required: u32,
    pub max_participants: u32,
    #[serde(default)]
    pub current_participants: u32,
    #[serde(default)]
    pub participants: Vec<Uuid>,
    #[serde(default)]
    pub status: Status,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    /// Sponsoring company, `None` for platform-run opportunities
    #[serde(default)]
    pub sponsored_by: Option<Uuid>,
    #[serde(default)]
    pub sustainability_impact: Option<SustainabilityImpact>,
    /// Set once participants have been settled by a completion
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic concurrency counter, `0` for records never stored
    #[serde(default)]
    pub version: u64,
}

impl Opportunity {
    pub fn remaining_spots(&self) -> u32 {
        self.max_participants.saturating_sub(self.current_participants)
    }

    pub fn is_full(&self) -> bool {
        self.current_participants >= self.max_participants
    }

    pub fn has_participant(&self, volunteer_id: Uuid) -> bool {
        self.participants.contains(&volunteer_id)
    }

    /// Cost in points that joining this opportunity deducts from a volunteer
    ///
    /// Only exclusive events have a cost.
    pub fn entry_cost(&self) -> Option<u32> {
        match self.kind {
            Kind::ExclusiveEvent if self.points_required > 0 => Some(self.points_required),
            _ => None,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.completed_at.is_some()
    }

    pub fn is_canceled(&self) -> bool {
        self.status == Status::Canceled
    }

    pub fn has_started(&self, now: DateTime<Utc>) -> bool {
        self.date < now
    }

    pub fn carbon_reduction(&self) -> f64 {
        self.sustainability_impact
            .as_ref()
            .and_then(|impact| impact.carbon_reduction)
            .unwrap_or(0.0)
    }

    /// Add a participant, keeping the participant count in step with the list
    pub fn push_participant(&mut self, volunteer_id: Uuid) {
        self.participants.push(volunteer_id);
        self.current_participants = self.participants.len() as u32;
    }

    /// Remove a participant, returning `false` if they were not registered
    pub fn remove_participant(&mut self, volunteer_id: Uuid) -> bool {
        let before = self.participants.len();
        self.participants.retain(|id| *id != volunteer_id);
        self.current_participants = self.participants.len() as u32;
        before != self.participants.len()
    }

    /// Status as it should be persisted at `now`
    ///
    /// A canceled opportunity stays `Canceled` and a settled one is always `Completed`. Everything
    /// else follows the clock.
    pub fn current_status(&self, now: DateTime<Utc>) -> Status {
        if self.is_canceled() {
            Status::Canceled
        } else if self.is_settled() {
            Status::Completed
        } else {
            derive_status(now, self.date, self.duration)
        }
    }

    /// Refresh the derived fields before the record is written
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.status = self.current_status(now);
        self.updated_at = now;
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_text("title", &self.title)?;
        require_text("description", &self.description)?;
        require_text("location", &self.location)?;
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(ValidationError::new("duration must be a positive number of hours"));
        }
        if self.points < 1 {
            return Err(ValidationError::new("points must be at least 1"));
        }
        if self.max_participants < 1 {
            return Err(ValidationError::new("maxParticipants must be at least 1"));
        }
        if self.current_participants > self.max_participants {
            return Err(ValidationError::new(format!(
                "maxParticipants cannot be lower than the {} current participants",
                self.current_participants
            )));
        }
        if let Some(impact) = &self.sustainability_impact {
            impact.validate()?;
        }
        Ok(())
    }
}

fn require_text(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(format!("{field} is required")));
    }
    Ok(())
}

/// Status an opportunity has at `now` purely from its schedule
pub fn derive_status(now: DateTime<Utc>, date: DateTime<Utc>, duration_hours: f64) -> Status {
    if date > now {
        return Status::Upcoming;
    }
    let seconds = (duration_hours * 3600.0) as i64;
    if now < date + Duration::seconds(seconds) {
        Status::Ongoing
    } else {
        Status::Completed
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Environmental,
    Social,
    Educational,
    Humanitarian,
    Other,
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "environmental" => Ok(Category::Environmental),
            "social" => Ok(Category::Social),
            "educational" => Ok(Category::Educational),
            "humanitarian" => Ok(Category::Humanitarian),
            "other" => Ok(Category::Other),
            _ => Err(ValidationError::new(format!("unknown category: {s}"))),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Category::Environmental => "environmental",
            Category::Social => "social",
            Category::Educational => "educational",
            Category::Humanitarian => "humanitarian",
            Category::Other => "other",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Kind {
    /// Regular volunteering, awards points on completion
    #[default]
    Volunteering,
    /// Costs points to join, never awards points
    ExclusiveEvent,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Upcoming,
    Ongoing,
    Completed,
    Canceled,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SustainabilityImpact {
    /// In kilograms
    pub carbon_reduction: Option<f64>,
    /// In liters
    pub water_saved: Option<f64>,
    /// In kilograms
    pub waste_reduced: Option<f64>,
    pub trees_planted: Option<u32>,
    pub description: Option<String>,
}

impl SustainabilityImpact {
    fn validate(&self) -> Result<(), ValidationError> {
        let measures = [
            ("carbonReduction", self.carbon_reduction),
            ("waterSaved", self.water_saved),
            ("wasteReduced", self.waste_reduced),
        ];
        for (name, value) in measures {
            if let Some(value) = value {
                if !value.is_finite() || value < 0.0 {
                    return Err(ValidationError::new(format!(
                        "sustainabilityImpact.{name} must be a non-negative number"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rstest::*;
    use speculoos::prelude::*;

    pub(crate) fn opportunity(date: DateTime<Utc>) -> Opportunity {
        Opportunity {
            id: Uuid::new_v4(),
            title: "Beach clean-up".to_string(),
            description: "Collect plastic along the shore".to_string(),
            location: "Jeddah Corniche".to_string(),
            category: Category::Environmental,
            kind: Kind::Volunteering,
            date,
            duration: 3.0,
            points: 50,
            points_required: 0,
            max_participants: 10,
            current_participants: 0,
            participants: Vec::new(),
            status: Status::Upcoming,
            skills: Vec::new(),
            requirements: Vec::new(),
            images: Vec::new(),
            sponsored_by: None,
            sustainability_impact: None,
            completed_at: None,
            created_at: date,
            updated_at: date,
            version: 0,
        }
    }

    #[rstest]
    #[case(Duration::hours(1), Status::Upcoming)]
    #[case(Duration::zero(), Status::Ongoing)]
    #[case(Duration::hours(-2), Status::Ongoing)]
    #[case(Duration::hours(-3), Status::Completed)]
    #[case(Duration::days(-10), Status::Completed)]
    fn test_derive_status(#[case] offset: Duration, #[case] expected: Status) {
        // GIVEN an opportunity lasting 3 hours starting at `now + offset`
        let now = Utc::now();

        // WHEN deriving the status
        let res = derive_status(now, now + offset, 3.0);

        // THEN it depends on where `now` falls in the schedule
        assert_that!(res).is_equal_to(expected);
    }

    #[test]
    fn test_canceled_is_sticky() {
        let now = Utc::now();
        let mut opportunity = opportunity(now + Duration::days(1));
        opportunity.status = Status::Canceled;

        opportunity.touch(now);

        assert_that!(opportunity.status).is_equal_to(Status::Canceled);
    }

    #[test]
    fn test_settled_is_completed_even_in_future() {
        let now = Utc::now();
        let mut opportunity = opportunity(now + Duration::days(1));
        opportunity.completed_at = Some(now);

        opportunity.touch(now);

        assert_that!(opportunity.status).is_equal_to(Status::Completed);
    }

    #[test]
    fn test_canceled_wins_over_settled() {
        let now = Utc::now();
        let mut opportunity = opportunity(now - Duration::days(1));
        opportunity.status = Status::Canceled;
        opportunity.completed_at = Some(now);

        assert_that!(opportunity.current_status(now)).is_equal_to(Status::Canceled);
    }

    #[test]
    fn test_participants_track_count() {
        let mut opportunity = opportunity(Utc::now());
        let volunteer = Uuid::new_v4();

        opportunity.push_participant(volunteer);
        assert_that!(opportunity.current_participants).is_equal_to(1);
        assert_that!(opportunity.remaining_spots()).is_equal_to(9);

        assert_that!(opportunity.remove_participant(volunteer)).is_true();
        assert_that!(opportunity.remove_participant(volunteer)).is_false();
        assert_that!(opportunity.current_participants).is_equal_to(0);
    }

    #[rstest]
    #[case::no_points(|o: &mut Opportunity| o.points = 0)]
    #[case::no_capacity(|o: &mut Opportunity| o.max_participants = 0)]
    #[case::blank_title(|o: &mut Opportunity| o.title = "  ".to_string())]
    #[case::no_duration(|o: &mut Opportunity| o.duration = 0.0)]
    #[case::over_capacity(|o: &mut Opportunity| {
        o.max_participants = 1;
        o.current_participants = 2;
    })]
    #[case::negative_carbon(|o: &mut Opportunity| {
        o.sustainability_impact = Some(SustainabilityImpact {
            carbon_reduction: Some(-1.0),
            ..Default::default()
        })
    })]
    fn test_validate_rejects(#[case] mutate: fn(&mut Opportunity)) {
        let mut opportunity = opportunity(Utc::now());
        mutate(&mut opportunity);

        assert_that!(opportunity.validate()).is_err();
    }

    #[test]
    fn test_entry_cost_only_for_exclusive_events() {
        let mut opportunity = opportunity(Utc::now());
        opportunity.points_required = 100;
        assert_that!(opportunity.entry_cost()).is_none();

        opportunity.kind = Kind::ExclusiveEvent;
        assert_that!(opportunity.entry_cost()).is_some().is_equal_to(100);
    }

    #[test]
    fn test_category_parse() {
        assert_that!("Environmental".parse::<Category>())
            .is_ok()
            .is_equal_to(Category::Environmental);
        assert_that!("sports".parse::<Category>()).is_err();
    }
}
