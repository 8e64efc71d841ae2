//! Opportunity lifecycle service for the Nabta volunteering marketplace.
//!
//! Volunteers join opportunities sponsored by companies. Volunteering opportunities award points
//! once completed, exclusive events cost points to join. Completing an opportunity also adds to
//! the sponsoring company's cumulative impact.
//!
//! The crate follows a ports and adapters layout:
//! - [`domain`] holds the records and their rules
//! - [`ports`] are the traits the domain logic depends on
//! - [`commands`] implements every operation as a [`tower::Service`]
//! - [`adapters`] provide the in-memory store, token verification and the HTTP surface

pub mod adapters;
pub mod commands;
pub mod config;
pub mod domain;
pub mod ports;
