//! HTTP query surface

pub mod clans;
pub mod extract;
pub mod health;
pub mod players;

pub use clans::clan_routes;
pub use health::health_routes;
pub use players::player_routes;
