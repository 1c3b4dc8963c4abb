//! Setup for the application: process-wide statics, logging and the jobs
//! that run the tracker services.
pub mod app;
pub mod jobs;
pub mod logging;
