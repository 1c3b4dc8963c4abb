//! Setup for the main tracker application.
//!
//! The [`setup`] function builds the application dependencies from the
//! configuration: it initializes the static variables, the logging and the
//! domain tracker.
use std::sync::Arc;

use super::logging;
use crate::config::Configuration;
use crate::core::{statistics, Tracker};
use crate::shared::clock::static_time;
use crate::shared::crypto::ephemeral_instance_keys;

/// It initializes the process-wide static values.
pub fn initialize_static() {
    // Set the time of the application start.
    lazy_static::initialize(&static_time::TIME_AT_APP_START);

    // Initialize the ephemeral instance random seed.
    lazy_static::initialize(&ephemeral_instance_keys::RANDOM_SEED);
}

/// It builds the tracker from the configuration.
///
/// Missing `config_path` means built-in defaults.
///
/// # Errors
///
/// Will return a configuration error when the configuration file cannot be
/// loaded or parsed.
pub fn setup(config_path: Option<&str>) -> Result<(Arc<Configuration>, Arc<Tracker>), crate::config::Error> {
    initialize_static();

    let config = Arc::new(Configuration::load(config_path)?);

    logging::setup(&config);

    let stats_event_sender = statistics::setup(true);

    let tracker = Arc::new(Tracker::new(&config, stats_event_sender));

    Ok((config, tracker))
}
