use crate::config::UvcConfig;
use crate::device::base::{UsbBackend, UsbDevice};
use crate::devices::Device;
use crate::error::{Result, UvcError};
use crate::handle::DeviceHandle;
use log::debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use uvc_types::{CLASS_VIDEO, SUBCLASS_VIDEO_STREAMING};

/// Process level handle on the USB subsystem, tracking every device handle opened through it.
pub struct Context<B: UsbBackend = rusb::Context> {
    inner: Arc<ContextInner<B>>,
}

pub(crate) struct ContextInner<B: UsbBackend> {
    pub(crate) backend: B,
    pub(crate) config: UvcConfig,
    open_devices: Mutex<Vec<OpenDevice>>,
    next_handle_id: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct OpenDevice {
    pub(crate) handle_id: u64,
    pub(crate) bus_number: u8,
    pub(crate) address: u8,
}

impl Context<rusb::Context> {
    pub fn new() -> Result<Self> {
        Self::with_config(UvcConfig::default())
    }

    pub fn with_config(config: UvcConfig) -> Result<Self> {
        let usb_context = rusb::Context::new()?;
        Ok(Self::with_backend(usb_context, config))
    }
}

impl<B: UsbBackend> Context<B> {
    pub fn with_backend(backend: B, config: UvcConfig) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                backend,
                config,
                open_devices: Mutex::new(Vec::new()),
                next_handle_id: AtomicU64::new(1),
            }),
        }
    }

    pub fn config(&self) -> &UvcConfig {
        &self.inner.config
    }

    /// Lists every attached device exposing a VideoStreaming interface. Devices whose
    /// configuration can't be read are skipped.
    pub fn get_device_list(&self) -> Result<Vec<Device<B>>> {
        let usb_devices = self.inner.backend.devices().map_err(|error| {
            debug!("Unable to enumerate USB devices: {}", error);
            UvcError::Io
        })?;

        let mut devices = Vec::new();
        for usb_device in usb_devices {
            let config = match usb_device.config_descriptor(0) {
                Ok(config) => config,
                Err(error) => {
                    debug!(
                        "Skipping device {:03}:{:03}, no configuration: {}",
                        usb_device.bus_number(),
                        usb_device.address(),
                        error
                    );
                    continue;
                }
            };

            if config.has_interface(CLASS_VIDEO, SUBCLASS_VIDEO_STREAMING) {
                devices.push(Device::new(self.inner.clone(), usb_device));
            }
        }

        Ok(devices)
    }

    /// Finds the first camera matching every given criterion. `None` or an id of 0 matches
    /// anything, the serial number comparison is exact.
    pub fn find_device(
        &self,
        vendor_id: Option<u16>,
        product_id: Option<u16>,
        serial_number: Option<&str>,
    ) -> Result<Device<B>> {
        let vendor_id = vendor_id.filter(|&vid| vid != 0);
        let product_id = product_id.filter(|&pid| pid != 0);

        for device in self.get_device_list()? {
            let descriptor = match device.get_device_descriptor() {
                Ok(descriptor) => descriptor,
                Err(error) => {
                    debug!("Unable to read descriptor of {:?}: {}", device, error);
                    continue;
                }
            };

            let matches = vendor_id.map_or(true, |vid| descriptor.vendor_id() == vid)
                && product_id.map_or(true, |pid| descriptor.product_id() == pid)
                && serial_number.map_or(true, |serial| descriptor.serial_number() == Some(serial));

            if matches {
                return Ok(device);
            }
        }

        Err(UvcError::NoDevice)
    }

    pub fn open(&self, device: &Device<B>) -> Result<DeviceHandle<B>> {
        DeviceHandle::open(device)
    }

    /// Number of currently open device handles.
    pub fn num_devices(&self) -> usize {
        self.inner.open_devices().len()
    }

    pub fn is_open(&self, device: &Device<B>) -> bool {
        self.inner.is_open(device.bus_number(), device.address())
    }
}

impl<B: UsbBackend> ContextInner<B> {
    fn open_devices(&self) -> MutexGuard<'_, Vec<OpenDevice>> {
        self.open_devices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn next_handle_id(&self) -> u64 {
        self.next_handle_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn register(&self, device: OpenDevice) {
        self.open_devices().push(device);
    }

    pub(crate) fn unregister(&self, handle_id: u64) {
        self.open_devices()
            .retain(|device| device.handle_id != handle_id);
    }

    pub(crate) fn is_open(&self, bus_number: u8, address: u8) -> bool {
        self.open_devices()
            .iter()
            .any(|device| device.bus_number == bus_number && device.address == address)
    }
}
