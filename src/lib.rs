//! Access reporting for AWS IAM Identity Center.
//!
//! The [`engine`] collects users, groups, accounts and permission sets
//! through an [`engine::IdentityDirectory`], scores every permission set
//! against the [`engine::ScoringTable`] and joins the result into
//! [`domain::AccessRecord`] rows; [`output`] serializes those rows.
//!
//! ```no_run
//! use sso_audit::engine::{PolicyAnalyzer, ScoringTable};
//! # fn main() -> sso_audit::AuditResult<()> {
//! let table = ScoringTable::builtin()?;
//! let analysis = PolicyAnalyzer::new(&table).analyze_actions(&["iam:CreateUser".to_string()]);
//! println!("{}", analysis.access_level);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod output;

pub use config::AuditConfig;
pub use domain::{AccessLevel, AccessRecord, RiskLevel};
pub use error::{AuditError, Result as AuditResult};
pub use output::ReportFormat;
