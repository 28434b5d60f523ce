#![doc = include_str!("../README.md")]
//!
//! # Module Structure
//!
//! - [`error`]: Domain error types (`ReconcileError`)
//! - [`platform`]: Platform abstraction (`Platform` trait, `PctPlatform`)
//! - [`probe`]: Status probing (`StatusProbe`)
//! - [`retry`]: Bounded fixed-delay retry (`RetryPolicy`, `RetryPolicies`, `Retrier`)
//! - [`lifecycle`]: Convergence to running/responsive (`LifecycleReconciler`)
//! - [`exec`]: In-container command execution with escalation (`CommandExecutor`)
//! - [`persisted`]: Line-level config file editing (`PersistedConfig`, `Directive`)
//! - [`policy`]: Identifier policy (`IdentifierPolicy`, `PolicyDecision`)
//! - [`privilege`]: Privileged mode cycle (`PrivilegeConfigurator`)
//! - [`validation`]: Stateless predicate checks (`ValidationLayer`, `Validity`)
//! - [`reconciler`]: Facade (`Reconciler`, `ReconcilerBuilder`)
//!
//! # Architecture
//!
//! ```text
//! ValidationLayer ─┐        PrivilegeConfigurator
//!                  │          │            │
//!                  ▼          ▼            │
//!             CommandExecutor ─────────────┤
//!                  │                       ▼
//!                  └──────────> LifecycleReconciler
//!                                  │          │
//!                              StatusProbe  Retrier
//!                                  │          │
//!                                  ▼          ▼
//!                                 Platform (pct)
//! ```

pub mod error;
pub mod exec;
pub mod lifecycle;
pub mod persisted;
pub mod platform;
pub mod policy;
pub mod privilege;
pub mod probe;
pub mod reconciler;
pub mod retry;
pub mod validation;

// --- Public API Re-exports ---

// Facade
pub use reconciler::{Reconciler, ReconcilerBuilder};

// Error
pub use error::ReconcileError;

// Platform
pub use platform::{ExecOutput, PctPlatform, Platform};

// Components
pub use exec::CommandExecutor;
pub use lifecycle::{Convergence, LifecycleReconciler};
pub use privilege::{PrivilegeConfigurator, PrivilegeOutcome};
pub use probe::StatusProbe;
pub use retry::{Retrier, RetryPolicies, RetryPolicy};

// Config editing and policy
pub use persisted::{Directive, DirectiveMode, PersistedConfig, privilege_directives};
pub use policy::{IdentifierPolicy, PolicyDecision};

// Validation
pub use validation::{ValidationLayer, Validity};
