//! # Storage Module
//!
//! Handles all data persistence for the shelter management system.
//!
//! The record store is an embedded SQLite database reached through a single
//! [`DbConnection`] handle that the caller constructs and passes into every
//! service; there is no hidden global connection. Opening the handle creates
//! the database file when it is missing and brings the schema up to the
//! current version.
//!
//! ## Key Responsibilities
//!
//! - **Connection Management**: pool lifecycle with explicit open and close
//! - **Schema Migration**: idempotent, versioned steps gated on SQLite's
//!   user_version pragma, run once at open
//! - **Repositories**: one per entity (animals, owners, boxes, treatments)
//!   with raw-SQL CRUD and the cross-cutting overdue-treatment query
//! - **Reference Hydration**: loads resolve referential fields, so an
//!   animal carries its treatments, an owner its animal ids, and a box its
//!   derived occupant
//! - **Transaction Scope**: multi-row mutations (housing moves, delete
//!   cascades, read-modify-write updates) run against `_tx` method variants
//!   inside one transaction
//!
//! Relationship data has a single writer: the animals table holds the
//! authoritative owner and box references, and everything else is derived
//! from it at load time.

pub mod connection;
pub mod repositories;

// Re-export the main types that other modules need
pub use connection::DbConnection;
pub use repositories::{
    AnimalRepository,
    BoxRepository,
    OwnerRepository,
    TreatmentRepository,
};
