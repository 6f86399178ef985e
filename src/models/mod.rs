//! Blockchain models.

pub use self::address::*;
pub use self::message::*;
pub use self::state_init::*;

mod address;
mod message;
mod state_init;

#[cfg(test)]
mod tests;
