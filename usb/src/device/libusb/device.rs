use crate::device::base::{
    ConfigDescriptor, EndpointDescriptor, Interface, InterfaceDescriptor, UsbBackend, UsbDevice,
    UsbDeviceDescriptor, UsbHandle,
};
use rusb::{Context, Device, DeviceHandle, GlobalContext, UsbContext};
use std::time::Duration;

impl UsbBackend for Context {
    type Device = Device<Context>;

    fn devices(&self) -> Result<Vec<Self::Device>, rusb::Error> {
        Ok(UsbContext::devices(self)?.iter().collect())
    }
}

impl UsbBackend for GlobalContext {
    type Device = Device<GlobalContext>;

    fn devices(&self) -> Result<Vec<Self::Device>, rusb::Error> {
        Ok(rusb::devices()?.iter().collect())
    }
}

impl<T: UsbContext + 'static> UsbDevice for Device<T> {
    type Handle = DeviceHandle<T>;

    fn bus_number(&self) -> u8 {
        Device::bus_number(self)
    }

    fn address(&self) -> u8 {
        Device::address(self)
    }

    fn device_descriptor(&self) -> Result<UsbDeviceDescriptor, rusb::Error> {
        let descriptor = Device::device_descriptor(self)?;
        Ok(UsbDeviceDescriptor {
            vendor_id: descriptor.vendor_id(),
            product_id: descriptor.product_id(),
            manufacturer_index: descriptor.manufacturer_string_index(),
            product_index: descriptor.product_string_index(),
            serial_number_index: descriptor.serial_number_string_index(),
        })
    }

    fn config_descriptor(&self, index: u8) -> Result<ConfigDescriptor, rusb::Error> {
        let config = Device::config_descriptor(self, index)?;

        // Copy the whole tree out, the parsed capability records only ever reference this copy.
        let interfaces = config
            .interfaces()
            .map(|interface| Interface {
                number: interface.number(),
                alt_settings: interface
                    .descriptors()
                    .map(|setting| InterfaceDescriptor {
                        interface_number: setting.interface_number(),
                        setting_number: setting.setting_number(),
                        class_code: setting.class_code(),
                        sub_class_code: setting.sub_class_code(),
                        protocol_code: setting.protocol_code(),
                        endpoints: setting
                            .endpoint_descriptors()
                            .map(|endpoint| EndpointDescriptor {
                                address: endpoint.address(),
                                max_packet_size: endpoint.max_packet_size(),
                                interval: endpoint.interval(),
                            })
                            .collect(),
                        extra: setting.extra().to_vec(),
                    })
                    .collect(),
            })
            .collect();

        Ok(ConfigDescriptor {
            number: config.number(),
            interfaces,
        })
    }

    fn open(&self) -> Result<Self::Handle, rusb::Error> {
        Device::open(self)
    }
}

impl<T: UsbContext + 'static> UsbHandle for DeviceHandle<T> {
    fn kernel_driver_active(&self, interface: u8) -> Result<bool, rusb::Error> {
        DeviceHandle::kernel_driver_active(self, interface)
    }

    fn detach_kernel_driver(&mut self, interface: u8) -> Result<(), rusb::Error> {
        DeviceHandle::detach_kernel_driver(self, interface)
    }

    fn claim_interface(&mut self, interface: u8) -> Result<(), rusb::Error> {
        DeviceHandle::claim_interface(self, interface)
    }

    fn release_interface(&mut self, interface: u8) -> Result<(), rusb::Error> {
        DeviceHandle::release_interface(self, interface)
    }

    fn read_string_ascii(&self, index: u8) -> Result<String, rusb::Error> {
        self.read_string_descriptor_ascii(index)
    }

    fn read_string(&self, index: u8, timeout: Duration) -> Result<String, rusb::Error> {
        let languages = self.read_languages(timeout)?;
        let language = languages.first().copied().ok_or(rusb::Error::NotFound)?;
        self.read_string_descriptor(language, index, timeout)
    }

    fn read_interrupt(
        &self,
        endpoint: u8,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, rusb::Error> {
        DeviceHandle::read_interrupt(self, endpoint, buf, timeout)
    }
}
