pub mod auth;
pub mod configuration;
pub mod error;
pub mod invites;
pub mod middleware;
pub mod routes;
pub mod startup;
pub mod telemetry;
pub mod validators;
