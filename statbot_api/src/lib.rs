//! Clients for the game-statistics providers the bot queries.

mod client;
mod errors;
pub mod identity;
pub use self::client::Client;
pub use self::errors::Error;
