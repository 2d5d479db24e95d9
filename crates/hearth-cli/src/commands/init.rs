use std::path::{Path, PathBuf};

use anyhow::bail;
use hearth_core::HearthConfig;

pub const CONFIG_FILE: &str = "hearth.toml";

/// Write a scaffold config mounting `handler` into `dir`.
pub fn init(dir: &Path, handler: &str, force: bool) -> anyhow::Result<PathBuf> {
    let config = HearthConfig::scaffold(handler);
    config.validate()?;

    let output = dir.join(CONFIG_FILE);
    if output.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", output.display());
    }
    std::fs::write(&output, config.to_toml_string()?)?;
    Ok(output)
}
