use clap::{Parser, Subcommand};
use dotenv::dotenv;
use standup_bot::config::DatabaseConfig;
use standup_bot::StatusStore;
use std::error::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Manage the standups table.
#[derive(Parser, Debug)]
#[command(name = "db", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the standups table if it doesn't exist yet
    Init,
    /// Drop every stored standup and recreate an empty table
    #[command(alias = "drop-tables")]
    Reset,
    /// Drop the standups table without recreating it
    Drop,
}

fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = DatabaseConfig::from_env()?;
    let store = establish_store(&config)?;

    match cli.command {
        Command::Init => store.create_tables()?,
        Command::Reset => {
            info!("dropping all standups");
            store.reset()?
        }
        Command::Drop => {
            info!("dropping all standups");
            store.drop_tables()?
        }
    }

    Ok(())
}

fn establish_store(config: &DatabaseConfig) -> Result<StatusStore, Box<dyn Error>> {
    // one connection is plenty for a one-off schema change
    let store = StatusStore::connect(&config.url, 1, config.timeout)?;
    Ok(store)
}

#[cfg(test)]
mod test {
    use super::{Cli, Command};
    use clap::Parser;

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from(["db", "init"]).unwrap();
        assert!(matches!(cli.command, Command::Init));

        let cli = Cli::try_parse_from(["db", "reset"]).unwrap();
        assert!(matches!(cli.command, Command::Reset));

        let cli = Cli::try_parse_from(["db", "drop-tables"]).unwrap();
        assert!(matches!(cli.command, Command::Reset));

        let cli = Cli::try_parse_from(["db", "drop"]).unwrap();
        assert!(matches!(cli.command, Command::Drop));
    }

    #[test]
    fn requires_a_subcommand() {
        assert!(Cli::try_parse_from(["db"]).is_err());
    }
}
