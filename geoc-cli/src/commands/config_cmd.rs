use std::path::PathBuf;

use geoc_shared::HostConfig;

use crate::project;

/// Resolve the host config from `file`, or from geoc.toml's `[host]` table.
pub fn resolve(file: Option<PathBuf>) -> anyhow::Result<HostConfig> {
    match file {
        Some(path) => {
            let source = std::fs::read_to_string(&path)?;
            Ok(HostConfig::from_toml_str(&source)?)
        }
        None => Ok(project::detect_project_context()?.file.host),
    }
}

pub fn run(file: Option<PathBuf>) -> anyhow::Result<()> {
    let config = resolve(file)?;
    print!("{}", config.to_toml_string()?);
    Ok(())
}
