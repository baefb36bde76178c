//! Port traits: the seams between the trading core and the outside world.

pub mod audit_port;
pub mod config_port;
pub mod feed_port;
