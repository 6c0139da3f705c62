//! Config command - prints the effective configuration

use anyhow::Result;

use crate::config::{default_config_path, SweepdConfig};

pub fn execute(config: &SweepdConfig) -> Result<()> {
    if let Some(path) = default_config_path() {
        println!("# default location: {}", path.display());
    }
    print!("{}", config.to_toml()?);
    Ok(())
}
