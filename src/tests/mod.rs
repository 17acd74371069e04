pub mod common;

mod status_routes;
