use std::time::Duration;

// The USB host library as seen by the UVC core. Everything crossing this boundary is an owned
// 'Plain Old Rust Struct', so descriptor parsing never has to care about libusb memory.

pub trait UsbBackend: Send + Sync + 'static {
    type Device: UsbDevice;

    fn devices(&self) -> Result<Vec<Self::Device>, rusb::Error>;
}

pub trait UsbDevice: Clone + Send + Sync + 'static {
    type Handle: UsbHandle;

    fn bus_number(&self) -> u8;
    fn address(&self) -> u8;

    fn device_descriptor(&self) -> Result<UsbDeviceDescriptor, rusb::Error>;
    fn config_descriptor(&self, index: u8) -> Result<ConfigDescriptor, rusb::Error>;

    fn open(&self) -> Result<Self::Handle, rusb::Error>;
}

pub trait UsbHandle: Send + Sync + 'static {
    fn kernel_driver_active(&self, interface: u8) -> Result<bool, rusb::Error>;
    fn detach_kernel_driver(&mut self, interface: u8) -> Result<(), rusb::Error>;
    fn claim_interface(&mut self, interface: u8) -> Result<(), rusb::Error>;
    fn release_interface(&mut self, interface: u8) -> Result<(), rusb::Error>;

    fn read_string_ascii(&self, index: u8) -> Result<String, rusb::Error>;
    fn read_string(&self, index: u8, timeout: Duration) -> Result<String, rusb::Error>;

    fn read_interrupt(
        &self,
        endpoint: u8,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, rusb::Error>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsbDeviceDescriptor {
    pub vendor_id: u16,
    pub product_id: u16,
    pub manufacturer_index: Option<u8>,
    pub product_index: Option<u8>,
    pub serial_number_index: Option<u8>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigDescriptor {
    pub number: u8,
    pub interfaces: Vec<Interface>,
}

/// One interface of a configuration, with all of its alternate settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Interface {
    pub number: u8,
    pub alt_settings: Vec<InterfaceDescriptor>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InterfaceDescriptor {
    pub interface_number: u8,
    pub setting_number: u8,
    pub class_code: u8,
    pub sub_class_code: u8,
    pub protocol_code: u8,
    pub endpoints: Vec<EndpointDescriptor>,
    pub extra: Vec<u8>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EndpointDescriptor {
    pub address: u8,
    pub max_packet_size: u16,
    pub interval: u8,
}

impl ConfigDescriptor {
    pub fn has_interface(&self, class_code: u8, sub_class_code: u8) -> bool {
        self.interfaces.iter().any(|interface| {
            interface.alt_settings.iter().any(|setting| {
                setting.class_code == class_code && setting.sub_class_code == sub_class_code
            })
        })
    }
}

impl Interface {
    pub fn first_setting(&self) -> Option<&InterfaceDescriptor> {
        self.alt_settings.first()
    }
}
