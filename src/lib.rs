#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(deprecated)]

//!
//! Capability-Registry is an object-capability authorization registry for a
//! modular, deterministic state machine.
//!
//! Modules obtain one [`ScopedRegistry`] each from the root
//! [`CapabilityRegistry`] and use it to mint, claim, authenticate and release
//! [`Capability`] objects for named resources (ports, channel ends, ...).
//! Authentication is by object identity plus name, never by a value the caller
//! could reconstruct.
//!
//! State is split in two:
//! - durable owner sets and the global index counter, committed with the
//!   host's state;
//! - an ephemeral forward/reverse index in a memory-only store, rebuilt from
//!   the durable state by [`CapabilityRegistry::init_mem_store`] on every
//!   process start.
//!
//! Both stores are reached through a per-transaction [`store::Context`].

// Store keys and scalar encodings.
pub mod types;

// Capability objects and owner sets.
pub mod access;

pub use access::{Capability, CapabilityOwners, Owner};

// Key-value stores, transaction branching and gas metering.
pub mod store;

// Module for registry error types.
pub mod error;

pub use error::{CapabilityError, StoreError};

// Root registry and scoped handles.
pub mod registry;

pub use registry::{CapabilityRegistry, Lifecycle, ScopedRegistry};

pub mod genesis;

pub mod config;

#[cfg(feature = "subscriber")]
pub mod logging;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;
