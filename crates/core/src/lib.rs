//! # Curator Core
//!
//! Domain types, traits, and error definitions for the Curator dispatch runtime.
//! This crate has **zero framework dependencies** — it defines the domain model
//! that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every subsystem is defined as a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod action;
pub mod decision;
pub mod memory;
pub mod oracle;
pub mod persona;
pub mod event;

// Re-export key types at crate root for ergonomics
pub use error::{Error, Result};
pub use action::{ActionRegistry, ActionSpec, Args, Capability, ParamSpec, ParamType, RegistryBuilder};
pub use decision::Decision;
pub use memory::{DecisionMemory, MemoryRecord, RecordHandle};
pub use oracle::{OracleBackend, OutputMode};
pub use persona::Persona;
pub use event::{DomainEvent, EventBus};
