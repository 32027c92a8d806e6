use crate::config::InterfaceSelection;
use crate::context::OpenDevice;
use crate::device::base::{UsbBackend, UsbDevice, UsbHandle};
use crate::devices::Device;
use crate::error::{Result, UvcError};
use crate::info::DeviceInfo;
use crate::parser::build_device_info;
use crate::status::{SharedStatusSink, StatusListener, StatusSink, StatusUpdate};
use log::{debug, error, info, warn};
use std::iter;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::mpsc::Sender;

// The Apple iSight needs its payload headers handled differently by the streaming side.
const ISIGHT_VENDOR_ID: u16 = 0x05ac;
const ISIGHT_PRODUCT_ID: u16 = 0x8501;

pub type UsbHandleOf<B> = <<B as UsbBackend>::Device as UsbDevice>::Handle;

/// An active video stream owned by a device handle. The handle stops it before it closes.
pub trait StreamSession: Send {
    fn stop(&mut self) -> Result<()>;
}

/// An open camera. Dropping the handle closes it; `close` does the same explicitly.
pub struct DeviceHandle<B: UsbBackend = rusb::Context> {
    handle_id: u64,
    device: Device<B>,
    usb_handle: Option<Arc<UsbHandleOf<B>>>,
    info: DeviceInfo,
    claimed_interfaces: Vec<u8>,
    is_isight: bool,
    status_sink: SharedStatusSink,
    status_listener: Option<StatusListener>,
    stream: Option<Box<dyn StreamSession>>,
    registered: bool,
}

impl<B: UsbBackend> DeviceHandle<B> {
    pub(crate) fn open(device: &Device<B>) -> Result<Self> {
        let usb_device = device.usb_device();
        let usb_handle = usb_device.open()?;
        let context = device.context().clone();

        // From here on, any early return drops `handle`, which undoes whatever was done so far.
        let mut handle = DeviceHandle {
            handle_id: context.next_handle_id(),
            device: device.ref_device(),
            usb_handle: Some(Arc::new(usb_handle)),
            info: DeviceInfo::default(),
            claimed_interfaces: Vec::new(),
            is_isight: false,
            status_sink: Arc::new(Mutex::new(None)),
            status_listener: None,
            stream: None,
            registered: false,
        };

        handle.info = build_device_info(usb_device)?;
        handle.claim_interfaces()?;

        handle.is_isight = usb_device
            .device_descriptor()
            .map(|descriptor| {
                descriptor.vendor_id == ISIGHT_VENDOR_ID
                    && descriptor.product_id == ISIGHT_PRODUCT_ID
            })
            .unwrap_or(false);

        if handle.info.ctrl_if.endpoint_address != 0 {
            handle.start_status_listener()?;
        }

        context.register(OpenDevice {
            handle_id: handle.handle_id,
            bus_number: device.bus_number(),
            address: device.address(),
        });
        handle.registered = true;

        info!(
            "Opened UVC {:x}.{:02x} device at {:03}:{:03}",
            handle.info.ctrl_if.bcd_uvc >> 8,
            handle.info.ctrl_if.bcd_uvc & 0xff,
            device.bus_number(),
            device.address()
        );
        Ok(handle)
    }

    fn usb_handle_mut(&mut self) -> Result<&mut UsbHandleOf<B>> {
        // Only reachable while the status listener isn't holding a reference.
        self.usb_handle
            .as_mut()
            .and_then(Arc::get_mut)
            .ok_or(UvcError::Busy)
    }

    fn interfaces_to_claim(&self) -> Vec<u8> {
        match self.device.context().config.interface_selection {
            InterfaceSelection::Fixed => vec![0, 1],
            InterfaceSelection::Discovered => iter::once(self.info.ctrl_if.interface_number)
                .chain(
                    self.info
                        .stream_ifs
                        .iter()
                        .map(|stream_if| stream_if.interface_number),
                )
                .collect(),
        }
    }

    fn claim_interfaces(&mut self) -> Result<()> {
        let detach = self.device.context().config.detach_kernel_driver;

        for interface in self.interfaces_to_claim() {
            let usb_handle = self.usb_handle_mut()?;

            if detach {
                // Platforms without kernel driver support report an error here.
                let driver_active = match usb_handle.kernel_driver_active(interface) {
                    Ok(active) => active,
                    Err(error) => {
                        debug!(
                            "Unable to check for a kernel driver on interface {}: {}",
                            interface, error
                        );
                        false
                    }
                };

                if driver_active {
                    usb_handle.detach_kernel_driver(interface)?;
                    debug!("Detached kernel driver from interface {}", interface);
                }
            }

            usb_handle.claim_interface(interface)?;
            self.claimed_interfaces.push(interface);
            debug!("Claimed interface {}", interface);
        }

        Ok(())
    }

    fn release_interfaces(&mut self) {
        let claimed = std::mem::take(&mut self.claimed_interfaces);
        if claimed.is_empty() {
            return;
        }

        let usb_handle = match self.usb_handle_mut() {
            Ok(usb_handle) => usb_handle,
            Err(_) => {
                warn!("USB handle still shared, unable to release interfaces {:?}", claimed);
                return;
            }
        };

        // Kernel drivers detached on open are left detached.
        for interface in claimed {
            if let Err(error) = usb_handle.release_interface(interface) {
                debug!("Unable to release interface {}: {}", interface, error);
            }
        }
    }

    fn start_status_listener(&mut self) -> Result<()> {
        let usb_handle = self.usb_handle.clone().ok_or(UvcError::NoDevice)?;
        let name = format!(
            "uvc-status-{:03}-{:03}",
            self.device.bus_number(),
            self.device.address()
        );

        let listener = StatusListener::spawn(
            name,
            usb_handle,
            self.info.ctrl_if.clone(),
            self.status_sink.clone(),
            &self.device.context().config,
        )
        .map_err(|spawn_error| {
            error!(
                "Device has a status interrupt endpoint, but unable to read from it: {}",
                spawn_error
            );
            UvcError::NoMem
        })?;

        self.status_listener = Some(listener);
        Ok(())
    }

    fn teardown(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            if let Err(error) = stream.stop() {
                warn!("Unable to stop stream cleanly: {}", error);
            }
        }

        if let Some(mut listener) = self.status_listener.take() {
            listener.stop();
        }

        self.release_interfaces();
        self.usb_handle = None;

        if self.registered {
            self.device.context().unregister(self.handle_id);
            self.registered = false;
        }
    }

    /// Stops any stream and the status listener, then releases the device.
    pub fn close(mut self) {
        info!(
            "Closing UVC device at {:03}:{:03}",
            self.device.bus_number(),
            self.device.address()
        );
        self.teardown();
    }

    pub fn device(&self) -> &Device<B> {
        &self.device
    }

    pub fn info(&self) -> &DeviceInfo {
        &self.info
    }

    pub fn is_isight(&self) -> bool {
        self.is_isight
    }

    pub fn claimed_interfaces(&self) -> &[u8] {
        &self.claimed_interfaces
    }

    pub fn usb_handle(&self) -> Option<&UsbHandleOf<B>> {
        self.usb_handle.as_deref()
    }

    /// Whether a status listener is still reading the interrupt endpoint. It stops by itself
    /// when a transfer fails, for example because the device was unplugged.
    pub fn is_listening(&self) -> bool {
        self.status_listener
            .as_ref()
            .map(|listener| !listener.is_finished())
            .unwrap_or(false)
    }

    fn set_status_sink(&self, sink: Option<StatusSink>) {
        *self
            .status_sink
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = sink;
    }

    /// Registers a callback for control changes, replacing any previous receiver.
    pub fn set_status_callback<F>(&self, callback: F)
    where
        F: FnMut(&StatusUpdate) + Send + 'static,
    {
        self.set_status_sink(Some(StatusSink::Callback(Box::new(callback))));
    }

    /// Sends control changes into a channel instead. Updates are dropped while it is full.
    pub fn set_status_sender(&self, sender: Sender<StatusUpdate>) {
        self.set_status_sink(Some(StatusSink::Channel(sender)));
    }

    pub fn clear_status_callback(&self) {
        self.set_status_sink(None);
    }

    pub fn attach_stream(&mut self, stream: Box<dyn StreamSession>) -> Result<()> {
        if self.stream.is_some() {
            return Err(UvcError::Busy);
        }
        self.stream = Some(stream);
        Ok(())
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }

    pub fn stop_streaming(&mut self) -> Result<()> {
        match self.stream.take() {
            Some(mut stream) => stream.stop(),
            None => Ok(()),
        }
    }
}

impl<B: UsbBackend> Drop for DeviceHandle<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}
