use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::presets::{PRESET_CI, PRESET_MINIMAL, PRESET_STANDARD};
use sso_audit::config::CONFIG_FILE;

pub fn run_init(preset: &str, force: bool) -> Result<()> {
    let config_path = PathBuf::from(CONFIG_FILE);

    if config_path.exists() && !force {
        anyhow::bail!(
            "{CONFIG_FILE} already exists. Use --force to overwrite the existing configuration."
        );
    }

    let contents = match preset {
        "minimal" => PRESET_MINIMAL,
        "ci" => PRESET_CI,
        _ => PRESET_STANDARD,
    };

    fs::write(&config_path, contents)
        .with_context(|| format!("Failed to write configuration to {}", config_path.display()))?;

    println!(
        "{CONFIG_FILE} created with '{}' preset at {}",
        preset,
        config_path.display()
    );

    Ok(())
}
