mod cli;
mod commands;
mod project;

use clap::Parser;

use cli::{Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Command::Build { release } => {
            let ctx = project::detect_project_context()?;
            commands::build_cmd::run(release, ctx).await
        }
        Command::Config { file } => commands::config_cmd::run(file),
        Command::Doctor => commands::doctor_cmd::run().await,
    }
}
