// This file primarily wraps USB devices into the 'Plain Old Rust Structs' handed out by the
// registry. A `Device` is reference counted, cloning it takes a reference and dropping it
// releases one; the USB library's own reference is held once, for as long as any clone lives.

use crate::context::ContextInner;
use crate::device::base::{UsbBackend, UsbDevice, UsbHandle};
use crate::error::Result;
use crate::handle::DeviceHandle;
use log::debug;
use std::fmt;
use std::sync::Arc;

// libusb reads string descriptors into a 64 byte, NUL terminated buffer.
const SERIAL_NUMBER_LENGTH: usize = 63;

pub struct Device<B: UsbBackend = rusb::Context> {
    inner: Arc<DeviceInner<B>>,
}

struct DeviceInner<B: UsbBackend> {
    context: Arc<ContextInner<B>>,
    usb_device: B::Device,
}

impl<B: UsbBackend> Device<B> {
    pub(crate) fn new(context: Arc<ContextInner<B>>, usb_device: B::Device) -> Self {
        Self {
            inner: Arc::new(DeviceInner {
                context,
                usb_device,
            }),
        }
    }

    pub(crate) fn context(&self) -> &Arc<ContextInner<B>> {
        &self.inner.context
    }

    pub(crate) fn usb_device(&self) -> &B::Device {
        &self.inner.usb_device
    }

    /// Takes another reference on the device.
    pub fn ref_device(&self) -> Self {
        self.clone()
    }

    /// Releases this reference, the device is freed with its last one.
    pub fn unref_device(self) {}

    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    pub fn bus_number(&self) -> u8 {
        self.inner.usb_device.bus_number()
    }

    pub fn address(&self) -> u8 {
        self.inner.usb_device.address()
    }

    /// Reads the device's ids, and its strings if the device can be opened. Failing to open
    /// the device leaves the strings unset.
    pub fn get_device_descriptor(&self) -> Result<DeviceDescriptor> {
        let usb_descriptor = self.inner.usb_device.device_descriptor()?;

        let mut descriptor = DeviceDescriptor {
            vendor_id: usb_descriptor.vendor_id,
            product_id: usb_descriptor.product_id,
            ..Default::default()
        };

        match self.inner.usb_device.open() {
            Ok(handle) => {
                let timeout = self.inner.context.config.string_timeout;

                descriptor.serial_number = usb_descriptor
                    .serial_number_index
                    .and_then(|index| handle.read_string_ascii(index).ok())
                    .map(|serial| serial.chars().take(SERIAL_NUMBER_LENGTH).collect::<String>())
                    .filter(|serial| !serial.is_empty());
                descriptor.manufacturer = usb_descriptor
                    .manufacturer_index
                    .and_then(|index| handle.read_string(index, timeout).ok());
                descriptor.product = usb_descriptor
                    .product_index
                    .and_then(|index| handle.read_string(index, timeout).ok());
            }
            Err(error) => {
                debug!("Unable to open {:?} to read its strings: {}", self, error);
            }
        }

        Ok(descriptor)
    }

    pub fn open(&self) -> Result<DeviceHandle<B>> {
        DeviceHandle::open(self)
    }
}

impl<B: UsbBackend> Clone for Device<B> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<B: UsbBackend> fmt::Debug for Device<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Device")
            .field("bus_number", &self.bus_number())
            .field("address", &self.address())
            .field("ref_count", &self.ref_count())
            .finish()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceDescriptor {
    pub(crate) vendor_id: u16,
    pub(crate) product_id: u16,
    pub(crate) serial_number: Option<String>,
    pub(crate) manufacturer: Option<String>,
    pub(crate) product: Option<String>,
}

impl DeviceDescriptor {
    pub fn vendor_id(&self) -> u16 {
        self.vendor_id
    }

    pub fn product_id(&self) -> u16 {
        self.product_id
    }

    pub fn serial_number(&self) -> Option<&str> {
        self.serial_number.as_deref()
    }

    pub fn manufacturer(&self) -> Option<&str> {
        self.manufacturer.as_deref()
    }

    pub fn product(&self) -> Option<&str> {
        self.product.as_deref()
    }
}
