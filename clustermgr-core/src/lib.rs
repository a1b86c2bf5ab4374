//! Clustermgr Core
//!
//! Core library for the event-broker provisioning tool: the broker domain
//! model, the provider contract and the shared error taxonomy.

pub mod provider;
pub mod resource;
