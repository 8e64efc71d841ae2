use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Company sponsoring opportunities
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub description: String,
    #[serde(default)]
    pub logo: Option<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub sponsored_opportunities: Vec<Uuid>,
    #[serde(default)]
    pub impact_metrics: ImpactMetrics,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub version: u64,
}

impl Company {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            email: email.into().to_lowercase(),
            description: description.into(),
            logo: None,
            website: None,
            sponsored_opportunities: Vec::new(),
            impact_metrics: ImpactMetrics::default(),
            created_at: Utc::now(),
            version: 0,
        }
    }

    pub fn sponsor(&mut self, opportunity_id: Uuid) {
        if !self.sponsored_opportunities.contains(&opportunity_id) {
            self.sponsored_opportunities.push(opportunity_id);
        }
    }

    pub fn unsponsor(&mut self, opportunity_id: Uuid) {
        self.sponsored_opportunities.retain(|id| *id != opportunity_id);
    }

    /// Accumulate the impact of a completed opportunity
    pub fn update_impact_metrics(&mut self, delta: &ImpactDelta) -> ImpactMetrics {
        self.impact_metrics.accumulate(delta);
        self.impact_metrics.clone()
    }
}

/// Cumulative impact of a company's sponsored opportunities
///
/// Metrics only ever grow.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImpactMetrics {
    /// In kilograms
    pub carbon_offset: f64,
    pub volunteers_engaged: u64,
    pub hours_contributed: f64,
}

impl ImpactMetrics {
    pub fn accumulate(&mut self, delta: &ImpactDelta) {
        self.carbon_offset += non_negative(delta.carbon_offset);
        self.volunteers_engaged += delta.volunteers_engaged.unwrap_or(0);
        self.hours_contributed += non_negative(delta.hours_contributed);
    }
}

fn non_negative(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite()).unwrap_or(0.0).max(0.0)
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ImpactDelta {
    pub carbon_offset: Option<f64>,
    pub volunteers_engaged: Option<u64>,
    pub hours_contributed: Option<f64>,
}
