//! Adapters - implementations of ports against concrete technology.
//!
//! Each submodule adapts one edge of the hexagon: `postgres` and
//! `memory` implement the billing store, `paddle` talks to the payment
//! provider, and `http` exposes the REST surface.

pub mod http;
pub mod memory;
pub mod paddle;
pub mod postgres;
