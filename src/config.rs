use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{error, info};
use rocket::{
    fairing::{Fairing, Info, Kind},
    tokio::time::Duration,
    Build, Rocket,
};
use serde::Deserialize;

use crate::{
    clock::{SharedClock, SystemClock},
    model::{JsonFileStore, Ledger, SharedLedger, PLACEHOLDER_PHOTO},
};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_snapshot_path")]
    snapshot_path: PathBuf,
    #[serde(default = "default_status_interval")]
    status_interval: u64,
    #[serde(default = "default_placeholder_photo")]
    placeholder_photo: String,
}

fn default_snapshot_path() -> PathBuf {
    PathBuf::from("polls.json")
}

fn default_status_interval() -> u64 {
    1
}

fn default_placeholder_photo() -> String {
    PLACEHOLDER_PHOTO.to_string()
}

impl Config {
    /// Where the poll snapshot is kept.
    /// Configured via `SNAPSHOT_PATH`.
    pub fn snapshot_path(&self) -> &Path {
        &self.snapshot_path
    }

    /// How often poll statuses are re-derived. Never shorter than a second.
    /// Configured via `STATUS_INTERVAL`, in seconds.
    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval.max(1))
    }

    /// Photo URL for candidates registered without one.
    /// Configured via `PLACEHOLDER_PHOTO`.
    pub fn placeholder_photo(&self) -> &str {
        &self.placeholder_photo
    }
}

/// A fairing that loads the application config and puts it in managed state.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

/// A fairing that restores the ledger from the configured snapshot and places
/// it, along with the system clock, into managed state.
/// Must be attached after [`ConfigFairing`].
pub struct LedgerFairing;

#[rocket::async_trait]
impl Fairing for LedgerFairing {
    fn info(&self) -> Info {
        Info {
            name: "Ledger",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        let Some(config) = rocket.state::<Config>().cloned() else {
            error!("Ledger fairing needs the config to be loaded first");
            return Err(rocket);
        };

        info!("Restoring ledger from {}...", config.snapshot_path().display());
        let store = JsonFileStore::new(config.snapshot_path());
        let ledger = match Ledger::load(store) {
            Ok(ledger) => ledger.with_placeholder_photo(config.placeholder_photo()),
            Err(e) => {
                error!("Failed to restore ledger: {e}");
                return Err(rocket);
            }
        };
        info!("...ledger online with {} polls!", ledger.polls().len());

        // Manage the state.
        let clock: SharedClock = Arc::new(SystemClock);
        let ledger: SharedLedger = ledger.shared();
        rocket = rocket.manage(ledger).manage(clock);
        Ok(rocket)
    }
}
