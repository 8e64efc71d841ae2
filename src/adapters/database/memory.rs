use crate::{
    domain::{Company, Opportunity, ValidationError, Volunteer},
    ports::database::{ChangeSet, DatabasePort, Error, OpportunityFilter},
};
use chrono::Utc;
use serde::Deserialize;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};
use uuid::Uuid;

#[derive(Clone, Debug, Default)]
pub struct MemoryDatabase {
    tables: Arc<Mutex<Tables>>,
}

#[derive(Debug, Default)]
struct Tables {
    opportunities: HashMap<Uuid, Opportunity>,
    volunteers: HashMap<Uuid, Volunteer>,
    companies: HashMap<Uuid, Company>,
}

/// Initial content of a [`MemoryDatabase`]
#[derive(Debug, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub volunteers: Vec<Volunteer>,
    #[serde(default)]
    pub companies: Vec<Company>,
    #[serde(default)]
    pub opportunities: Vec<Opportunity>,
}

impl MemoryDatabase {
    /// Create a database holding the seed records
    ///
    /// Versions found in the seed are ignored, every record starts as a fresh insert. Participant
    /// counts and statuses are recomputed, and an opportunity that does not validate rejects the
    /// whole seed.
    pub async fn from_seed(seed: Seed) -> Result<Self, Error> {
        let database = Self::default();
        let now = Utc::now();
        let opportunities = seed
            .opportunities
            .into_iter()
            .map(|mut opportunity| -> Result<Opportunity, InvalidSeed> {
                opportunity.version = 0;
                opportunity.current_participants = opportunity.participants.len() as u32;
                opportunity.touch(now);
                opportunity
                    .validate()
                    .map_err(|source| InvalidSeed {
                        opportunity_id: opportunity.id,
                        source,
                    })?;
                Ok(opportunity)
            })
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| Error::Adapter(Box::new(err)))?;
        let changes = ChangeSet {
            opportunities,
            deleted_opportunities: Vec::new(),
            volunteers: seed
                .volunteers
                .into_iter()
                .map(|v| Volunteer { version: 0, ..v })
                .collect(),
            companies: seed
                .companies
                .into_iter()
                .map(|c| Company { version: 0, ..c })
                .collect(),
        };
        database.commit(changes).await?;
        Ok(database)
    }
}

#[async_trait::async_trait]
impl DatabasePort for MemoryDatabase {
    async fn get_opportunity(&self, opportunity_id: Uuid) -> Result<Opportunity, Error> {
        self.tables
            .lock()?
            .opportunities
            .get(&opportunity_id)
            .cloned()
            .ok_or(Error::OpportunityNotFound(opportunity_id))
    }

    async fn list_opportunities(
        &self,
        filter: OpportunityFilter,
    ) -> Result<Vec<Opportunity>, Error> {
        let opportunities = self
            .tables
            .lock()?
            .opportunities
            .values()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();

        Ok(opportunities)
    }

    async fn get_volunteer(&self, volunteer_id: Uuid) -> Result<Volunteer, Error> {
        self.tables
            .lock()?
            .volunteers
            .get(&volunteer_id)
            .cloned()
            .ok_or(Error::VolunteerNotFound(volunteer_id))
    }

    async fn find_volunteers_by_opportunity(
        &self,
        opportunity_id: Uuid,
    ) -> Result<Vec<Volunteer>, Error> {
        let volunteers = self
            .tables
            .lock()?
            .volunteers
            .values()
            .filter(|v| v.references(opportunity_id))
            .cloned()
            .collect();

        Ok(volunteers)
    }

    async fn get_company(&self, company_id: Uuid) -> Result<Company, Error> {
        self.tables
            .lock()?
            .companies
            .get(&company_id)
            .cloned()
            .ok_or(Error::CompanyNotFound(company_id))
    }

    async fn commit(&self, mut changes: ChangeSet) -> Result<ChangeSet, Error> {
        let mut tables = self.tables.lock()?;

        // Check everything before writing anything
        for opportunity in changes
            .opportunities
            .iter()
            .chain(changes.deleted_opportunities.iter())
        {
            check_version(&tables.opportunities, opportunity)?;
        }
        for volunteer in &changes.volunteers {
            check_version(&tables.volunteers, volunteer)?;
        }
        check_unique(&tables.volunteers, &changes.volunteers, "email", |v| &v.email)?;
        for company in &changes.companies {
            check_version(&tables.companies, company)?;
        }
        check_unique(&tables.companies, &changes.companies, "name", |c| &c.name)?;
        check_unique(&tables.companies, &changes.companies, "email", |c| &c.email)?;

        for opportunity in &changes.deleted_opportunities {
            tables.opportunities.remove(&opportunity.id);
        }
        for opportunity in changes.opportunities.iter_mut() {
            opportunity.version += 1;
            tables
                .opportunities
                .insert(opportunity.id, opportunity.clone());
        }
        for volunteer in changes.volunteers.iter_mut() {
            volunteer.version += 1;
            tables.volunteers.insert(volunteer.id, volunteer.clone());
        }
        for company in changes.companies.iter_mut() {
            company.version += 1;
            tables.companies.insert(company.id, company.clone());
        }

        Ok(changes)
    }
}

/// Stored records with an optimistic concurrency counter
trait Versioned {
    fn id(&self) -> Uuid;
    fn version(&self) -> u64;
}

macro_rules! impl_versioned {
    ($($record:ty),*) => {
        $(impl Versioned for $record {
            fn id(&self) -> Uuid {
                self.id
            }
            fn version(&self) -> u64 {
                self.version
            }
        })*
    };
}

impl_versioned!(Opportunity, Volunteer, Company);

fn check_version<R: Versioned>(table: &HashMap<Uuid, R>, record: &R) -> Result<(), Error> {
    match table.get(&record.id()) {
        None if record.version() == 0 => Ok(()),
        Some(stored) if record.version() != 0 && stored.version() == record.version() => Ok(()),
        _ => Err(Error::VersionConflict(record.id())),
    }
}

/// Every pending record's `value` must differ from the other pending records and from stored
/// records the change set leaves in place
fn check_unique<R: Versioned>(
    table: &HashMap<Uuid, R>,
    pending: &[R],
    field: &'static str,
    value: impl Fn(&R) -> &String,
) -> Result<(), Error> {
    for record in pending {
        let taken = table
            .values()
            .filter(|stored| pending.iter().all(|p| p.id() != stored.id()))
            .chain(pending.iter())
            .any(|other| {
                other.id() != record.id() && value(other).eq_ignore_ascii_case(value(record))
            });
        if taken {
            return Err(Error::UniqueViolation {
                field,
                value: value(record).clone(),
            });
        }
    }
    Ok(())
}

/// Seeded opportunity that breaks the opportunity rules
#[derive(Debug, thiserror::Error)]
#[error("seeded opportunity {opportunity_id} is invalid: {source}")]
pub struct InvalidSeed {
    opportunity_id: Uuid,
    source: ValidationError,
}

/// Erased [`PoisonError`]
///
/// `PoisonError` keeps the `MutexGuard` internally, which is not send. Thus we erase the error
/// and only keep the string representation instead.
#[derive(Debug, thiserror::Error)]
#[error("poison error: {0}")]
pub struct ErasedPoisonError(String);

/// We need to create a custom `From` implementation here for an error that's specific to this
/// adapter.
impl<T> From<PoisonError<T>> for Error {
    fn from(err: PoisonError<T>) -> Self {
        Self::Adapter(Box::new(ErasedPoisonError(err.to_string())))
    }
}
