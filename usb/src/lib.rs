pub use rusb;
pub mod config;
pub mod context;
pub mod devices;
pub mod error;
pub mod handle;
pub mod info;
pub mod status;

mod device;
mod parser;

pub use config::{InterfaceSelection, UvcConfig};
pub use context::Context;
pub use device::base;
pub use devices::{Device, DeviceDescriptor};
pub use error::{Result, UvcError};
pub use handle::{DeviceHandle, StreamSession};
pub use status::{StatusCallback, StatusUpdate};
