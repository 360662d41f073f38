use std::path::{Path, PathBuf};

use geoc_shared::config::HostConfig;
use serde::{Deserialize, Serialize};

pub const PROJECT_FILE: &str = "geoc.toml";

/// `[project]` table of geoc.toml. Paths are relative to the project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectPaths {
    /// Where `zig build` runs.
    pub guest_dir: String,
    /// The guest module produced by `zig build`, relative to `guest_dir`.
    pub guest_wasm: String,
    /// The wasm-pack crate for the browser host.
    pub host_crate: String,
    pub dist_dir: String,
}

impl Default for ProjectPaths {
    fn default() -> Self {
        Self {
            guest_dir: ".".into(),
            guest_wasm: "zig-out/bin/geoc.wasm".into(),
            host_crate: "geoc-web".into(),
            dist_dir: "dist".into(),
        }
    }
}

/// Contents of geoc.toml.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectFile {
    pub project: ProjectPaths,
    pub host: HostConfig,
}

/// The resolved project context.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    /// Directory holding geoc.toml
    pub project_root: PathBuf,
    pub file: ProjectFile,
}

impl ProjectContext {
    pub fn guest_dir(&self) -> PathBuf {
        self.project_root.join(&self.file.project.guest_dir)
    }

    pub fn guest_wasm(&self) -> PathBuf {
        self.guest_dir().join(&self.file.project.guest_wasm)
    }

    pub fn host_crate(&self) -> PathBuf {
        self.project_root.join(&self.file.project.host_crate)
    }

    pub fn dist_dir(&self) -> PathBuf {
        self.project_root.join(&self.file.project.dist_dir)
    }
}

/// Detect project context from the current directory, walking up.
pub fn detect_project_context() -> anyhow::Result<ProjectContext> {
    detect_project_context_from(&std::env::current_dir()?)
}

/// Detect project context starting from a specific directory, walking up.
pub fn detect_project_context_from(start: &Path) -> anyhow::Result<ProjectContext> {
    let mut dir = start.to_path_buf();
    loop {
        let path = dir.join(PROJECT_FILE);
        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let file: ProjectFile = toml::from_str(&content)?;
            file.host.validate()?;
            log::debug!("using project file {}", path.display());
            return Ok(ProjectContext {
                project_root: dir,
                file,
            });
        }
        if !dir.pop() {
            anyhow::bail!(
                "Could not find a geoc project.\n\
                 Run `geocli` from a directory containing {PROJECT_FILE} or one of its subdirectories."
            );
        }
    }
}
