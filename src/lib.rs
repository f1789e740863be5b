pub mod auth;
pub mod db;
pub mod forms;
pub mod server;
pub mod telemetry;
pub mod text;
