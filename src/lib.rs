#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

use crate::{
    clock::SharedClock,
    logging::LoggerFairing,
    model::SharedLedger,
    status_watch::StatusWatchFairing,
};

pub mod api;
pub mod clock;
pub mod error;
pub mod logging;
pub mod model;
pub mod status_watch;

mod config;

pub use config::{Config, ConfigFairing, LedgerFairing};

/// The full server: config, the ledger restored from its snapshot, request
/// logging, the background status watch, and every route.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .attach(ConfigFairing)
        .attach(LedgerFairing)
        .attach(LoggerFairing)
        .attach(StatusWatchFairing::default())
        .mount("/", api::routes())
}

/// A server around an existing ledger and clock, without the background task.
pub fn rocket_for_ledger(ledger: SharedLedger, clock: SharedClock) -> Rocket<Build> {
    rocket::build()
        .attach(ConfigFairing)
        .manage(ledger)
        .manage(clock)
        .mount("/", api::routes())
}

/// A fresh snapshot location for a single test.
#[cfg(test)]
fn test_snapshot_path() -> std::path::PathBuf {
    use rand::{distributions::Alphanumeric, Rng};

    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(12)
        .map(char::from)
        .collect();
    std::env::temp_dir().join(format!("poll-ledger-test-{suffix}.json"))
}
