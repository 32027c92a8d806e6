pub mod base;

// libusb is reached through rusb on every platform, it provides the trait implementations
// for rusb's contexts, devices and handles.
mod libusb {
    pub mod device;
}

#[cfg(test)]
pub(crate) mod mock;
