//! Audit-trail provisioning
//!
//! Per-dialect template catalogs, the contract a catalog must satisfy
//! before a tracking-enabled backend is built, and the provisioner that
//! installs the audit table and triggers.

pub mod catalog;
pub mod contract;
pub mod provisioner;
pub mod templates;
pub mod tracker;

pub use catalog::{Bindings, Operation, TemplateCatalog, TemplateRole};
pub use contract::{IGNORE_TABLE, NOT_IMPLEMENTED, TrackedTableSet};
pub use provisioner::{ProvisionReport, TriggerProvisioner};
pub use tracker::{AuditedHelper, AuditedHelperBuilder};
