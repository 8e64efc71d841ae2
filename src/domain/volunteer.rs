use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Volunteer account and its participation ledger
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volunteer {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub role: VolunteerRole,
    /// Current balance of points
    #[serde(default)]
    pub points: u32,
    /// Opportunities joined and not yet completed
    #[serde(default)]
    pub attended_opportunities: Vec<Uuid>,
    #[serde(default)]
    pub completed_opportunities: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub version: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolunteerRole {
    #[default]
    Volunteer,
    Admin,
}

impl Volunteer {
    pub fn new(username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            email: email.into().to_lowercase(),
            role: VolunteerRole::Volunteer,
            points: 0,
            attended_opportunities: Vec::new(),
            completed_opportunities: Vec::new(),
            created_at: Utc::now(),
            version: 0,
        }
    }

    /// Remove `amount` points from the balance
    ///
    /// The balance never goes below zero: on failure the current balance is returned and nothing
    /// changes.
    pub fn spend_points(&mut self, amount: u32) -> Result<(), u32> {
        self.points = self.points.checked_sub(amount).ok_or(self.points)?;
        Ok(())
    }

    pub fn credit_points(&mut self, amount: u32) {
        self.points = self.points.saturating_add(amount);
    }

    pub fn attend(&mut self, opportunity_id: Uuid) {
        if !self.attended_opportunities.contains(&opportunity_id) {
            self.attended_opportunities.push(opportunity_id);
        }
    }

    pub fn unattend(&mut self, opportunity_id: Uuid) {
        self.attended_opportunities.retain(|id| *id != opportunity_id);
    }

    /// Move an opportunity from the attended to the completed set
    ///
    /// The completed set holds each opportunity at most once.
    pub fn complete(&mut self, opportunity_id: Uuid) {
        self.unattend(opportunity_id);
        if !self.completed_opportunities.contains(&opportunity_id) {
            self.completed_opportunities.push(opportunity_id);
        }
    }

    /// Drop every reference to a deleted opportunity
    pub fn forget(&mut self, opportunity_id: Uuid) {
        self.unattend(opportunity_id);
        self.completed_opportunities.retain(|id| *id != opportunity_id);
    }

    pub fn references(&self, opportunity_id: Uuid) -> bool {
        self.attended_opportunities.contains(&opportunity_id)
            || self.completed_opportunities.contains(&opportunity_id)
    }
}
