mod analyzer;
pub mod aws;
mod cache;
mod classifier;
mod collector;
pub mod directory;
mod policy;
mod rules;
pub mod security;

pub use analyzer::{ActionAnalysis, PolicyAnalyzer};
pub use aws::AwsDirectory;
pub use cache::CachedDirectory;
pub use classifier::AccountClassifier;
pub use collector::{AccessReport, Collector, Inventory, DIRECT_ASSIGNMENT};
pub use directory::IdentityDirectory;
pub use policy::allowed_actions;
pub use rules::{ActionScore, DefaultScores, ScoringTable, Weights};
pub use security::RoleSecurityReport;
