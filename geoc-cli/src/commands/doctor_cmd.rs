use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolStatus {
    Found { version: String, path: PathBuf },
    NotFound,
}

impl ToolStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Found { .. })
    }
}

/// Tools a full build needs, with the flag each uses to report its version.
const TOOLS: [(&str, &str); 3] = [("zig", "version"), ("cargo", "--version"), ("wasm-pack", "--version")];

async fn check_tool(name: &str, version_arg: &str) -> ToolStatus {
    let Ok(path) = which::which(name) else {
        return ToolStatus::NotFound;
    };
    let version = match tokio::process::Command::new(&path).arg(version_arg).output().await {
        Ok(out) => first_line(&String::from_utf8_lossy(&out.stdout)),
        Err(e) => {
            log::warn!("{name} found at {} but did not run: {e}", path.display());
            String::from("unknown")
        }
    };
    ToolStatus::Found { version, path }
}

fn first_line(text: &str) -> String {
    text.lines().next().unwrap_or("unknown").trim().to_string()
}

pub async fn run() -> anyhow::Result<()> {
    let mut missing = 0;
    for (name, version_arg) in TOOLS {
        let status = check_tool(name, version_arg).await;
        if !status.is_available() {
            missing += 1;
        }
        match status {
            ToolStatus::Found { version, path } => {
                println!("  ok       {name:<10} {version} ({})", path.display());
            }
            ToolStatus::NotFound => println!("  missing  {name}"),
        }
    }
    if missing > 0 {
        anyhow::bail!("{missing} required tool(s) missing");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_line() {
        assert_eq!(first_line("cargo 1.80.0 (abc)\nextra\n"), "cargo 1.80.0 (abc)");
        assert_eq!(first_line(""), "unknown");
    }

    #[tokio::test]
    async fn test_missing_tool() {
        let status = check_tool("geocli-no-such-tool", "--version").await;
        assert_eq!(status, ToolStatus::NotFound);
        assert!(!status.is_available());
    }
}
