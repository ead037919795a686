//! Module for core business logic services.
//!
//! This module encapsulates services that sit between the GraphQL resolvers
//! and the stores: gateway wiring, the publish/subscribe broker and input
//! validation.

pub mod gateway;
pub mod pubsub;
pub mod validation;
