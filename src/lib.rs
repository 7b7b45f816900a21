pub mod admin;
pub mod controller;
pub mod db;
pub mod effects;
pub mod feed;
pub mod render;
pub mod server;
pub mod standings;
pub mod store;
pub mod tokio_tools;
