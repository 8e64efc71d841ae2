use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

mod company;
mod opportunity;
mod volunteer;

pub use company::{Company, ImpactDelta, ImpactMetrics};
pub use opportunity::{derive_status, Category, Kind, Opportunity, Status, SustainabilityImpact};
pub use volunteer::{Volunteer, VolunteerRole};

#[cfg(test)]
pub(crate) use opportunity::tests::opportunity as test_opportunity;

/// Authenticated caller of an operation
///
/// This is resolved from a bearer token before reaching the domain logic, which trusts it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Actor {
    Volunteer(Uuid),
    Company(Uuid),
    Admin(Uuid),
}

impl Actor {
    pub fn new(id: Uuid, role: Role) -> Self {
        match role {
            Role::Volunteer => Actor::Volunteer(id),
            Role::Company => Actor::Company(id),
            Role::Admin => Actor::Admin(id),
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Actor::Volunteer(id) | Actor::Company(id) | Actor::Admin(id) => *id,
        }
    }

    pub fn role(&self) -> Role {
        match self {
            Actor::Volunteer(_) => Role::Volunteer,
            Actor::Company(_) => Role::Company,
            Actor::Admin(_) => Role::Admin,
        }
    }

    /// Whether the actor may edit, delete or complete an opportunity sponsored by `sponsored_by`
    pub fn can_manage(&self, sponsored_by: Option<Uuid>) -> bool {
        match self {
            Actor::Admin(_) => true,
            Actor::Company(id) => sponsored_by == Some(*id),
            Actor::Volunteer(_) => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Volunteer,
    Company,
    Admin,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Volunteer => f.write_str("volunteer"),
            Role::Company => f.write_str("company"),
            Role::Admin => f.write_str("admin"),
        }
    }
}

/// Input that is malformed or out of range
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub Cow<'static, str>);

impl ValidationError {
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        Self(message.into())
    }
}
