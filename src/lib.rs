// src/lib.rs
//! Group restaurant picking: a shared session, swipe votes from every
//! participant, and the places enough of them agree on.
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod ids;
pub mod ledger;
pub mod models;
pub mod overpass;
pub mod places;
pub mod poll;
pub mod progress;
pub mod reconcile;
pub mod routes;
pub mod services;
pub mod store;
pub mod sync;

pub use error::{Result, SessionError};
