//! Application jobs launchers.
//!
//! The main application setup has only two main stages:
//!
//! 1. Setup the domain layer: the core tracker.
//! 2. Launch all the application services as concurrent jobs.
//!
//! This module contains all the functions needed to start those jobs.
use std::net::SocketAddr;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::servers::signals::Halted;

pub mod http_tracker;
pub mod swarm_cleanup;
pub mod udp_tracker;

/// The message that the spawned service sends back to the job starter once
/// it is bound and listening.
#[derive(Debug)]
pub struct Started {
    pub address: SocketAddr,
}

/// A running service job: the spawned task and the channel used to ask it
/// to shut down.
#[derive(Debug)]
pub struct Job {
    pub name: &'static str,
    pub handle: JoinHandle<()>,
    pub tx_halt: oneshot::Sender<Halted>,
}

impl Job {
    /// It signals the service to shut down and returns its handle so the
    /// caller can await the task.
    pub fn halt(self) -> JoinHandle<()> {
        // The service may already be gone; nothing to do then.
        let _ = self.tx_halt.send(Halted::Normal);
        self.handle
    }
}
