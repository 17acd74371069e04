pub mod refresh_schedule;
pub mod snapshot;
