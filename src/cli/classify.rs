use std::path::Path;

use anyhow::Result;
use colored::Colorize;

use sso_audit::engine::AccountClassifier;

use super::report::load_config;

pub fn run_classify(names: &[String], config: Option<&Path>, profile: Option<&str>) -> Result<()> {
    let config = load_config(config, profile)?;
    let classifier = AccountClassifier::new(&config.classification);

    if names.is_empty() {
        println!("Classification rules (first match wins):");
        for label in classifier.labels() {
            println!("  {}", label.bold());
        }
        return Ok(());
    }

    let width = names.iter().map(|n| n.chars().count()).max().unwrap_or(0);
    for name in names {
        println!("{name:<width$}  {}", classifier.classify(name).cyan());
    }

    Ok(())
}
