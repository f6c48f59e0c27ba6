use keeper_core::config::{KeeperConfig, WarnLevel};

use crate::output::print_json;
use crate::setup::ConfigArgs;

/// Print the effective configuration and its validation warnings.
pub fn run(args: &ConfigArgs, json: bool) -> anyhow::Result<()> {
    let config = args.effective()?;
    let warnings = config.validate();

    if json {
        let value = serde_json::json!({
            "config": config,
            "warnings": warnings,
        });
        print_json(&value)?;
    } else {
        print!("{}", serde_yaml::to_string(&config)?);
        if warnings.is_empty() {
            println!("# Config is valid. No warnings.");
        }
        for w in &warnings {
            let prefix = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("# [{prefix}] {}", w.message);
        }
    }

    if KeeperConfig::has_errors(&warnings) {
        anyhow::bail!("config validation found errors");
    }

    Ok(())
}
