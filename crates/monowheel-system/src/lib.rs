#![cfg_attr(not(test), no_std)]

mod fmt;

pub mod remote;
pub mod system;

// Re-export main types
pub use remote::{Endpoint, RemoteHandler, Request, Response};
pub use system::{BalanceLoop, DriveLoop, SharedValues, SteerLoop};
