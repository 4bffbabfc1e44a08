#![forbid(unsafe_code)]

//! Reconciles a hypervisor image directory against the control plane.
//!
//! [`reconcile()`] is the pure part: classification, parent annotation and
//! flatten candidates over already gathered facts. [`AuditEngine`] gathers
//! those facts through the [`services`] traits and then calls it.

pub mod annotate;
pub mod classify;
pub mod domain;
pub mod engine;
pub mod error;
pub mod flatten;
pub mod reconciliation;
pub mod report;
pub mod services;
pub mod stores;

pub use engine::{AuditEngine, Services};
pub use error::Error;
pub use reconciliation::{Reconciliation, reconcile};
pub use report::AuditReport;
