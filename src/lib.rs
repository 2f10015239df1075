pub mod config;
pub mod errors;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod session;
pub mod state;
