pub mod config;
pub mod favorite;
pub mod location;
pub mod user;
pub mod world;
