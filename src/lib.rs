//! Storefront Pilot - Membership billing and payment-event reconciliation
//!
//! This crate reconciles Paddle payment events into membership and
//! wallet state exactly once per event, and exposes the billing REST
//! API on top of that ledger.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
