use std::path::{Path, PathBuf};

use crate::project::ProjectContext;

/// File name of the guest module inside the dist directory.
pub const GUEST_FILE: &str = "geoc.wasm";
pub const HOST_CONFIG_FILE: &str = "host.toml";

fn zig_args(release: bool) -> Vec<&'static str> {
    if release {
        vec!["build", "-Doptimize=ReleaseSmall"]
    } else {
        vec!["build"]
    }
}

fn wasm_pack_args(release: bool, out_dir: &Path) -> Vec<String> {
    let profile = if release { "--release" } else { "--dev" };
    vec![
        "build".into(),
        "--target".into(),
        "web".into(),
        profile.into(),
        "--out-dir".into(),
        out_dir.display().to_string(),
    ]
}

async fn step<S: AsRef<std::ffi::OsStr>>(program: &str, args: &[S], cwd: &Path) -> anyhow::Result<()> {
    if which::which(program).is_err() {
        anyhow::bail!("`{program}` not found on PATH (run `geocli doctor`)");
    }
    println!("Running {program} in {}...", cwd.display());

    let status = tokio::process::Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(std::process::Stdio::inherit())
        .stdout(std::process::Stdio::inherit())
        .stderr(std::process::Stdio::inherit())
        .status()
        .await?;

    if !status.success() {
        anyhow::bail!("{program} exited with {status}");
    }
    Ok(())
}

/// Copy the guest module into dist and write the resolved host config next to
/// it. Returns the paths written.
pub fn assemble_dist(ctx: &ProjectContext) -> anyhow::Result<(PathBuf, PathBuf)> {
    let dist = ctx.dist_dir();
    std::fs::create_dir_all(&dist)?;

    let source = ctx.guest_wasm();
    if !source.exists() {
        anyhow::bail!("guest module {} was not produced", source.display());
    }
    let guest = dist.join(GUEST_FILE);
    std::fs::copy(&source, &guest)?;

    let config = dist.join(HOST_CONFIG_FILE);
    std::fs::write(&config, ctx.file.host.to_toml_string()?)?;
    Ok((guest, config))
}

pub async fn run(release: bool, ctx: ProjectContext) -> anyhow::Result<()> {
    step("zig", &zig_args(release), &ctx.guest_dir()).await?;
    step(
        "wasm-pack",
        &wasm_pack_args(release, &ctx.dist_dir().join("pkg")),
        &ctx.host_crate(),
    )
    .await?;

    let (guest, config) = assemble_dist(&ctx)?;
    log::info!("wrote {} and {}", guest.display(), config.display());
    println!("Build complete: {}", ctx.dist_dir().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{detect_project_context_from, PROJECT_FILE};

    #[test]
    fn test_release_flags() {
        assert_eq!(zig_args(false), vec!["build"]);
        assert_eq!(zig_args(true), vec!["build", "-Doptimize=ReleaseSmall"]);

        let args = wasm_pack_args(true, Path::new("/tmp/out"));
        assert_eq!(&args[..4], ["build", "--target", "web", "--release"]);
        assert_eq!(args.last().map(String::as_str), Some("/tmp/out"));
        assert!(wasm_pack_args(false, Path::new("o")).contains(&"--dev".to_string()));
    }

    #[test]
    fn test_assemble_dist_copies_guest_and_writes_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(PROJECT_FILE),
            "[project]\nguest_wasm = \"out/engine.wasm\"\n\n[host.animation]\nframe_count = 10\n",
        )
        .unwrap();
        std::fs::create_dir(dir.path().join("out")).unwrap();
        std::fs::write(dir.path().join("out/engine.wasm"), b"\0asm").unwrap();

        let ctx = detect_project_context_from(dir.path()).unwrap();
        let (guest, config) = assemble_dist(&ctx).unwrap();

        assert_eq!(std::fs::read(&guest).unwrap(), b"\0asm");
        let written = std::fs::read_to_string(&config).unwrap();
        let parsed = geoc_shared::HostConfig::from_toml_str(&written).unwrap();
        assert_eq!(parsed.animation.frame_count, 10);
    }

    #[test]
    fn test_assemble_dist_without_guest_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(PROJECT_FILE), "").unwrap();

        let ctx = detect_project_context_from(dir.path()).unwrap();
        assert!(assemble_dist(&ctx).is_err());
    }
}
