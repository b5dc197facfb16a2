use clap::Parser;
use parkwatch::cli::{Cli, Command};
use parkwatch::config::{Config, Overrides};
use parkwatch::cycle;
use parkwatch::extract::{KeypadExtractor, WebDriverLauncher};
use parkwatch::notify::{Notifier, WebhookNotifier};
use parkwatch::report;
use parkwatch::store::{SnapshotStore, SqliteStore};

fn load_config(cli: &Cli, overrides: Overrides) -> Config {
    match Config::load(cli.config.as_deref(), overrides, cli.verbose) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            std::process::exit(1);
        }
    }
}

fn require_vehicle(config: &Config) -> String {
    match config.vehicle_id() {
        Ok(id) => id.to_string(),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}

/// Commands other than `check` are pointless without a store.
fn require_store(config: &Config) -> SqliteStore {
    let Some(path) = &config.store_path else {
        eprintln!("No store configured. Set --db, PARKWATCH_DB or store_path.");
        std::process::exit(1);
    };

    match SqliteStore::open(path) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error opening store: {e}");
            std::process::exit(1);
        }
    }
}

fn main() {
    let cli = Cli::parse();

    match &cli.command {
        Command::Check(args) => {
            let config = load_config(&cli, args.overrides());
            let vehicle_id = require_vehicle(&config);

            // a store that cannot be opened degrades to acquisition-only
            let store = config.store_path.as_ref().and_then(|path| match SqliteStore::open(path) {
                Ok(store) => {
                    if config.verbose {
                        eprintln!("store ready: {}", path.display());
                    }
                    Some(store)
                }
                Err(e) => {
                    eprintln!("warning: store unavailable, continuing without it: {e}");
                    None
                }
            });

            let notifier = if args.no_notify {
                None
            } else {
                let notifier = WebhookNotifier::from_config(&config);
                if notifier.is_none() {
                    eprintln!("warning: no webhook configured, notifications will not be sent");
                }
                notifier
            };

            let extractor = KeypadExtractor::from_config(
                WebDriverLauncher::new(&config.webdriver_url),
                &config,
            );

            let outcome = cycle::run_cycle(
                &vehicle_id,
                &extractor,
                store.as_ref().map(|s| s as &dyn SnapshotStore),
                notifier.as_ref().map(|n| n as &dyn Notifier),
                &config,
            );

            report::print_outcome(&outcome, args.json);

            if !outcome.succeeded() {
                std::process::exit(1);
            }
        }
        Command::Status(args) => {
            let config = load_config(&cli, args.overrides());
            let vehicle_id = require_vehicle(&config);
            let store = require_store(&config);

            match store.get(&vehicle_id) {
                Ok(snapshot) => report::print_snapshot(snapshot.as_ref(), args.json),
                Err(e) => {
                    eprintln!("Error loading snapshot: {e}");
                    std::process::exit(1);
                }
            }
        }
        Command::History(args) => {
            let config = load_config(&cli, args.overrides());
            let vehicle_id = require_vehicle(&config);
            let store = require_store(&config);

            match store.list_history(&vehicle_id, args.limit) {
                Ok(entries) => report::print_history(&entries, args.json),
                Err(e) => {
                    eprintln!("Error loading history: {e}");
                    std::process::exit(1);
                }
            }
        }
        Command::Ping(args) => {
            let config = load_config(&cli, args.overrides());
            let store = require_store(&config);

            if let Err(e) = store.ping() {
                eprintln!("Store did not answer: {e}");
                std::process::exit(1);
            }

            match store.check_connection() {
                Ok(()) => println!("Store is reachable and writable."),
                Err(e) => {
                    eprintln!("Store answered but the round-trip check failed: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}
