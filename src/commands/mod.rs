use std::{borrow::Cow, future::Future, pin::Pin, sync::Arc};

use uuid::Uuid;

use crate::{
    domain::{Actor, Opportunity, ValidationError},
    ports::database::Error as DatabaseError,
};

pub mod complete_opportunity;
pub mod create_opportunity;
pub mod delete_opportunity;
pub mod join_opportunity;
pub mod leave_opportunity;
pub mod queries;
pub mod update_opportunity;

/// Opportunity lifecycle operations
///
/// Each operation is a [`tower::Service`] implementation over its own request type.
pub struct DomainLogic<D> {
    database: Arc<D>,
}

impl<D> DomainLogic<D> {
    pub fn new(database: Arc<D>) -> Self {
        Self { database }
    }
}

impl<D> Clone for DomainLogic<D> {
    fn clone(&self) -> Self {
        Self {
            database: self.database.clone(),
        }
    }
}

pub type CommandFuture<T> = Pin<Box<dyn Future<Output = Result<T, Error>> + Send>>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("database port error: {0:?}")]
    Database(DatabaseError),

    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("{resource} not found with id of {id}")]
    NotFound { resource: &'static str, id: Uuid },
    #[error("{0}")]
    Forbidden(Cow<'static, str>),

    #[error("This opportunity is already full")]
    Capacity,
    #[error("You are already registered for this opportunity")]
    DuplicateRegistration,
    #[error("You need {required} points to join this event, but you only have {available}")]
    InsufficientPoints { required: u32, available: u32 },
    #[error("You are not registered for this opportunity")]
    NotRegistered,
    #[error("Cannot leave an opportunity that has already occurred")]
    PastEvent,
    #[error("This opportunity has already been marked as completed")]
    AlreadyCompleted,
    #[error("This opportunity has been canceled")]
    Canceled,

    /// A record was written by someone else between read and commit
    #[error("{0} was modified concurrently, please retry")]
    Conflict(Uuid),
}

impl Error {
    /// Stable name of the error kind, shown to API clients
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Database(_) => "InternalError",
            Error::Validation(_) => "ValidationError",
            Error::NotFound { .. } => "NotFoundError",
            Error::Forbidden(_) => "ForbiddenError",
            Error::Capacity => "CapacityError",
            Error::DuplicateRegistration => "DuplicateRegistrationError",
            Error::InsufficientPoints { .. } => "InsufficientPointsError",
            Error::NotRegistered => "NotRegisteredError",
            Error::PastEvent => "PastEventError",
            Error::AlreadyCompleted => "AlreadyCompletedError",
            Error::Canceled => "CanceledError",
            Error::Conflict(_) => "ConflictError",
        }
    }
}

impl From<DatabaseError> for Error {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::OpportunityNotFound(id) => Error::NotFound {
                resource: "Opportunity",
                id,
            },
            DatabaseError::VolunteerNotFound(id) => Error::NotFound {
                resource: "Volunteer",
                id,
            },
            DatabaseError::CompanyNotFound(id) => Error::NotFound {
                resource: "Company",
                id,
            },
            DatabaseError::VersionConflict(id) => Error::Conflict(id),
            DatabaseError::UniqueViolation { .. } => {
                Error::Validation(ValidationError::new(err.to_string()))
            }
            DatabaseError::Adapter(_) => Error::Database(err),
        }
    }
}

/// Only the sponsoring company or an admin may manage an opportunity
fn authorize_manage(actor: &Actor, opportunity: &Opportunity, action: &str) -> Result<(), Error> {
    if actor.can_manage(opportunity.sponsored_by) {
        return Ok(());
    }
    Err(Error::Forbidden(
        format!("Not authorized to {action} this opportunity").into(),
    ))
}

/// Participants may only change while an opportunity is neither canceled nor settled
fn ensure_open(opportunity: &Opportunity) -> Result<(), Error> {
    if opportunity.is_canceled() {
        return Err(Error::Canceled);
    }
    if opportunity.is_settled() {
        return Err(Error::AlreadyCompleted);
    }
    Ok(())
}

/// Only volunteers take part in opportunities
fn require_volunteer(actor: &Actor) -> Result<Uuid, Error> {
    match actor {
        Actor::Volunteer(id) => Ok(*id),
        Actor::Company(_) | Actor::Admin(_) => Err(Error::Forbidden(
            format!("Role {} is not authorized to access this route", actor.role()).into(),
        )),
    }
}
