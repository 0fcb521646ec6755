use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use warden_server::{Command, WardenCli, commands, serve};

#[tokio::main]
pub async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    match WardenCli::parse().into_command() {
        Command::Serve(config) => serve(config).await,
        Command::Issue(args) => {
            println!("{}", commands::issue(&args)?);
            Ok(())
        }
        Command::Verify(args) => {
            println!("{}", commands::verify(&args)?);
            Ok(())
        }
    }
}
