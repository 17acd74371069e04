pub mod server;
pub mod status;
