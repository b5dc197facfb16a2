use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Overrides;

#[derive(Parser)]
#[command(name = "parkwatch")]
#[command(about = "Checks where a car is parked and posts changes to a webhook")]
#[command(version)]
pub struct Cli {
    /// Config file (defaults to <config dir>/parkwatch/config.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Print progress and diagnostics to stderr
    #[arg(long, short = 'v', global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Look up the parking location, store it and notify on change
    Check(CheckArgs),

    /// Show the stored snapshot for a vehicle
    Status(StatusArgs),

    /// Show recorded changes, newest first
    History(HistoryArgs),

    /// Check that the store is reachable and writable
    Ping(PingArgs),
}

#[derive(Parser)]
pub struct VehicleArgs {
    /// Vehicle number typed into the lookup page
    #[arg(long = "vehicle", env = "CAR_NUMBER")]
    pub vehicle: Option<String>,
}

#[derive(Parser)]
pub struct StoreArgs {
    /// SQLite database holding snapshots and history
    #[arg(long = "db", env = "PARKWATCH_DB")]
    pub db: Option<PathBuf>,
}

#[derive(Parser)]
pub struct CheckArgs {
    #[command(flatten)]
    pub vehicle: VehicleArgs,

    #[command(flatten)]
    pub store: StoreArgs,

    /// Parking lookup page
    #[arg(long, env = "PARKING_URL")]
    pub page_url: Option<String>,

    /// WebDriver endpoint (chromedriver)
    #[arg(long, env = "WEBDRIVER_URL")]
    pub webdriver_url: Option<String>,

    /// Incoming webhook for notifications
    #[arg(long, env = "MATTERMOST_WEBHOOK_URL")]
    pub webhook_url: Option<String>,

    /// Run the cycle but never send a notification
    #[arg(long, default_value_t = false)]
    pub no_notify: bool,

    /// Print the cycle outcome as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Parser)]
pub struct StatusArgs {
    #[command(flatten)]
    pub vehicle: VehicleArgs,

    #[command(flatten)]
    pub store: StoreArgs,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Parser)]
pub struct HistoryArgs {
    #[command(flatten)]
    pub vehicle: VehicleArgs,

    #[command(flatten)]
    pub store: StoreArgs,

    /// Number of entries to show
    #[arg(long, default_value_t = 5)]
    pub limit: usize,

    /// Output as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Parser)]
pub struct PingArgs {
    #[command(flatten)]
    pub store: StoreArgs,
}

impl CheckArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            vehicle_id: self.vehicle.vehicle.clone(),
            page_url: self.page_url.clone(),
            webdriver_url: self.webdriver_url.clone(),
            store_path: self.store.db.clone(),
            webhook_url: self.webhook_url.clone(),
        }
    }
}

impl StatusArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            vehicle_id: self.vehicle.vehicle.clone(),
            store_path: self.store.db.clone(),
            ..Overrides::default()
        }
    }
}

impl HistoryArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            vehicle_id: self.vehicle.vehicle.clone(),
            store_path: self.store.db.clone(),
            ..Overrides::default()
        }
    }
}

impl PingArgs {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            store_path: self.store.db.clone(),
            ..Overrides::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_flags_become_overrides() {
        let cli = Cli::parse_from([
            "parkwatch",
            "check",
            "--vehicle",
            "1234",
            "--db",
            "/tmp/parkwatch.db",
            "--page-url",
            "https://parking.example/lookup",
            "--no-notify",
        ]);

        let Command::Check(args) = cli.command else {
            panic!("expected check");
        };
        assert!(args.no_notify);
        let overrides = args.overrides();
        assert_eq!(overrides.vehicle_id.as_deref(), Some("1234"));
        assert_eq!(overrides.store_path, Some(PathBuf::from("/tmp/parkwatch.db")));
        assert_eq!(overrides.page_url.as_deref(), Some("https://parking.example/lookup"));
    }

    #[test]
    fn history_limit_defaults_to_five() {
        let cli = Cli::parse_from(["parkwatch", "history", "--vehicle", "1234", "-v"]);
        assert!(cli.verbose);
        let Command::History(args) = cli.command else {
            panic!("expected history");
        };
        assert_eq!(args.limit, 5);
    }
}
