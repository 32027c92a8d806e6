// An in-memory USB bus used by the tests. It implements the same traits as the rusb backend,
// and records what the core does to it (claims, detaches, opens, references).

use crate::device::base::{
    ConfigDescriptor, EndpointDescriptor, Interface, InterfaceDescriptor, UsbBackend, UsbDevice,
    UsbDeviceDescriptor, UsbHandle,
};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::sleep;
use std::time::Duration;

#[derive(Clone, Default)]
pub(crate) struct MockBus {
    state: Arc<Mutex<BusState>>,
}

#[derive(Default)]
struct BusState {
    devices: Vec<MockDeviceSpec>,
    fail_enumeration: bool,
    usb_refs: HashMap<u8, usize>,
    open_handles: HashMap<u8, usize>,
    claimed: Vec<(u8, u8)>,
    detached: Vec<(u8, u8)>,
    status_packets: HashMap<u8, VecDeque<Result<Vec<u8>, rusb::Error>>>,
}

#[derive(Clone, Default)]
pub(crate) struct MockDeviceSpec {
    pub address: u8,
    pub descriptor: UsbDeviceDescriptor,
    pub config: Option<ConfigDescriptor>,
    pub strings: HashMap<u8, String>,
    pub open_error: Option<rusb::Error>,
    pub claim_error: Option<rusb::Error>,
    pub kernel_driver_active: bool,
    pub kernel_driver_error: Option<rusb::Error>,
}

impl MockDeviceSpec {
    pub fn camera(address: u8, vendor_id: u16, product_id: u16, config: ConfigDescriptor) -> Self {
        Self {
            address,
            descriptor: UsbDeviceDescriptor {
                vendor_id,
                product_id,
                manufacturer_index: Some(1),
                product_index: Some(2),
                serial_number_index: Some(3),
            },
            config: Some(config),
            ..Default::default()
        }
    }

    pub fn with_serial(mut self, serial: &str) -> Self {
        self.strings.insert(3, serial.to_string());
        self
    }

    pub fn with_strings(mut self, manufacturer: &str, product: &str) -> Self {
        self.strings.insert(1, manufacturer.to_string());
        self.strings.insert(2, product.to_string());
        self
    }
}

impl MockBus {
    pub fn new(devices: Vec<MockDeviceSpec>) -> Self {
        let bus = MockBus::default();
        bus.lock().devices = devices;
        bus
    }

    fn lock(&self) -> MutexGuard<'_, BusState> {
        self.state.lock().unwrap()
    }

    fn spec(&self, address: u8) -> MockDeviceSpec {
        self.lock()
            .devices
            .iter()
            .find(|spec| spec.address == address)
            .cloned()
            .expect("mock device disappeared")
    }

    pub fn fail_enumeration(&self) {
        self.lock().fail_enumeration = true;
    }

    /// Live references the core holds on the device, the equivalent of libusb's refcount.
    pub fn usb_refs(&self, address: u8) -> usize {
        self.lock().usb_refs.get(&address).copied().unwrap_or(0)
    }

    pub fn open_handles(&self, address: u8) -> usize {
        self.lock().open_handles.get(&address).copied().unwrap_or(0)
    }

    pub fn claimed(&self, address: u8) -> Vec<u8> {
        self.lock()
            .claimed
            .iter()
            .filter(|(device, _)| *device == address)
            .map(|(_, interface)| *interface)
            .collect()
    }

    pub fn detached(&self, address: u8) -> Vec<u8> {
        self.lock()
            .detached
            .iter()
            .filter(|(device, _)| *device == address)
            .map(|(_, interface)| *interface)
            .collect()
    }

    pub fn push_status(&self, address: u8, packet: &[u8]) {
        self.lock()
            .status_packets
            .entry(address)
            .or_default()
            .push_back(Ok(packet.to_vec()));
    }

    pub fn push_status_error(&self, address: u8, error: rusb::Error) {
        self.lock()
            .status_packets
            .entry(address)
            .or_default()
            .push_back(Err(error));
    }

    pub fn pending_status(&self, address: u8) -> usize {
        self.lock()
            .status_packets
            .get(&address)
            .map(VecDeque::len)
            .unwrap_or(0)
    }

    fn device(&self, address: u8) -> MockDevice {
        *self.lock().usb_refs.entry(address).or_default() += 1;
        MockDevice {
            bus: self.clone(),
            address,
        }
    }
}

impl UsbBackend for MockBus {
    type Device = MockDevice;

    fn devices(&self) -> Result<Vec<Self::Device>, rusb::Error> {
        let addresses: Vec<u8> = {
            let state = self.lock();
            if state.fail_enumeration {
                return Err(rusb::Error::Io);
            }
            state.devices.iter().map(|spec| spec.address).collect()
        };
        Ok(addresses
            .into_iter()
            .map(|address| self.device(address))
            .collect())
    }
}

pub(crate) struct MockDevice {
    bus: MockBus,
    address: u8,
}

impl Clone for MockDevice {
    fn clone(&self) -> Self {
        self.bus.device(self.address)
    }
}

impl Drop for MockDevice {
    fn drop(&mut self) {
        if let Some(refs) = self.bus.lock().usb_refs.get_mut(&self.address) {
            *refs -= 1;
        }
    }
}

impl UsbDevice for MockDevice {
    type Handle = MockHandle;

    fn bus_number(&self) -> u8 {
        1
    }

    fn address(&self) -> u8 {
        self.address
    }

    fn device_descriptor(&self) -> Result<UsbDeviceDescriptor, rusb::Error> {
        Ok(self.bus.spec(self.address).descriptor)
    }

    fn config_descriptor(&self, index: u8) -> Result<ConfigDescriptor, rusb::Error> {
        match (index, self.bus.spec(self.address).config) {
            (0, Some(config)) => Ok(config),
            _ => Err(rusb::Error::NotFound),
        }
    }

    fn open(&self) -> Result<Self::Handle, rusb::Error> {
        if let Some(error) = self.bus.spec(self.address).open_error {
            return Err(error);
        }
        *self.bus.lock().open_handles.entry(self.address).or_default() += 1;
        Ok(MockHandle {
            bus: self.bus.clone(),
            address: self.address,
        })
    }
}

pub(crate) struct MockHandle {
    bus: MockBus,
    address: u8,
}

impl Drop for MockHandle {
    fn drop(&mut self) {
        if let Some(handles) = self.bus.lock().open_handles.get_mut(&self.address) {
            *handles -= 1;
        }
    }
}

impl UsbHandle for MockHandle {
    fn kernel_driver_active(&self, interface: u8) -> Result<bool, rusb::Error> {
        let spec = self.bus.spec(self.address);
        if let Some(error) = spec.kernel_driver_error {
            return Err(error);
        }
        let detached = self.bus.detached(self.address).contains(&interface);
        Ok(spec.kernel_driver_active && !detached)
    }

    fn detach_kernel_driver(&mut self, interface: u8) -> Result<(), rusb::Error> {
        self.bus.lock().detached.push((self.address, interface));
        Ok(())
    }

    fn claim_interface(&mut self, interface: u8) -> Result<(), rusb::Error> {
        if let Some(error) = self.bus.spec(self.address).claim_error {
            return Err(error);
        }
        self.bus.lock().claimed.push((self.address, interface));
        Ok(())
    }

    fn release_interface(&mut self, interface: u8) -> Result<(), rusb::Error> {
        let mut state = self.bus.lock();
        let address = self.address;
        match state
            .claimed
            .iter()
            .position(|claim| *claim == (address, interface))
        {
            Some(position) => {
                state.claimed.remove(position);
                Ok(())
            }
            None => Err(rusb::Error::NotFound),
        }
    }

    fn read_string_ascii(&self, index: u8) -> Result<String, rusb::Error> {
        self.bus
            .spec(self.address)
            .strings
            .get(&index)
            .cloned()
            .ok_or(rusb::Error::Pipe)
    }

    fn read_string(&self, index: u8, _timeout: Duration) -> Result<String, rusb::Error> {
        self.read_string_ascii(index)
    }

    fn read_interrupt(
        &self,
        _endpoint: u8,
        buf: &mut [u8],
        timeout: Duration,
    ) -> Result<usize, rusb::Error> {
        let next = self
            .bus
            .lock()
            .status_packets
            .get_mut(&self.address)
            .and_then(VecDeque::pop_front);

        match next {
            Some(Ok(packet)) => {
                let length = packet.len().min(buf.len());
                buf[..length].copy_from_slice(&packet[..length]);
                Ok(length)
            }
            Some(Err(error)) => Err(error),
            None => {
                sleep(timeout.min(Duration::from_millis(2)));
                Err(rusb::Error::Timeout)
            }
        }
    }
}

/// Builders for class-specific descriptor blocks, laid out as UVC 1.1 defines them.
pub(crate) mod fixtures {
    use super::*;
    use crate::info::FrameIntervals;
    use uvc_types::CS_INTERFACE;

    pub fn vc_header(bcd_uvc: u16, streaming_interfaces: &[u8]) -> Vec<u8> {
        let length = 12 + streaming_interfaces.len();
        let mut block = vec![length as u8, CS_INTERFACE, 0x01];
        block.extend_from_slice(&bcd_uvc.to_le_bytes());
        block.extend_from_slice(&(length as u16).to_le_bytes());
        block.extend_from_slice(&48_000_000u32.to_le_bytes());
        block.push(streaming_interfaces.len() as u8);
        block.extend_from_slice(streaming_interfaces);
        block
    }

    pub fn input_terminal(terminal_id: u8, terminal_type: u16, controls: &[u8]) -> Vec<u8> {
        let mut block = vec![0, CS_INTERFACE, 0x02, terminal_id];
        block.extend_from_slice(&terminal_type.to_le_bytes());
        block.extend_from_slice(&[0, 0]);
        if terminal_type == 0x0201 {
            block.extend_from_slice(&0u16.to_le_bytes());
            block.extend_from_slice(&0u16.to_le_bytes());
            block.extend_from_slice(&0u16.to_le_bytes());
            block.push(controls.len() as u8);
            block.extend_from_slice(controls);
        }
        block[0] = block.len() as u8;
        block
    }

    pub fn processing_unit(unit_id: u8, source_id: u8, controls: &[u8]) -> Vec<u8> {
        let mut block = vec![0, CS_INTERFACE, 0x05, unit_id, source_id, 0, 0];
        block.push(controls.len() as u8);
        block.extend_from_slice(controls);
        block.push(0);
        block[0] = block.len() as u8;
        block
    }

    pub fn extension_unit(unit_id: u8, guid: [u8; 16], pins: &[u8], controls: &[u8]) -> Vec<u8> {
        let mut block = vec![0, CS_INTERFACE, 0x06, unit_id];
        block.extend_from_slice(&guid);
        block.push(8);
        block.push(pins.len() as u8);
        block.extend_from_slice(pins);
        block.push(controls.len() as u8);
        block.extend_from_slice(controls);
        block.push(0);
        block[0] = block.len() as u8;
        block
    }

    pub fn vs_input_header(endpoint_address: u8, terminal_link: u8) -> Vec<u8> {
        let mut block = vec![14, CS_INTERFACE, 0x01, 1, 0, 0];
        block.push(endpoint_address);
        block.push(0);
        block.push(terminal_link);
        block.extend_from_slice(&[0, 0, 0, 1, 0]);
        block
    }

    pub fn format_uncompressed(format_index: u8, guid: [u8; 16], bits_per_pixel: u8) -> Vec<u8> {
        let mut block = vec![27, CS_INTERFACE, 0x04, format_index, 1];
        block.extend_from_slice(&guid);
        block.extend_from_slice(&[bits_per_pixel, 1, 0, 0, 0, 0]);
        block
    }

    pub fn frame_uncompressed(
        frame_index: u8,
        width: u16,
        height: u16,
        intervals: &FrameIntervals,
    ) -> Vec<u8> {
        let buffer_size = u32::from(width) * u32::from(height) * 2;
        let mut block = vec![0, CS_INTERFACE, 0x05, frame_index, 0];
        block.extend_from_slice(&width.to_le_bytes());
        block.extend_from_slice(&height.to_le_bytes());
        block.extend_from_slice(&(buffer_size * 8).to_le_bytes());
        block.extend_from_slice(&(buffer_size * 240).to_le_bytes());
        block.extend_from_slice(&buffer_size.to_le_bytes());
        block.extend_from_slice(&333_333u32.to_le_bytes());
        match intervals {
            FrameIntervals::Continuous { min, max, step } => {
                block.push(0);
                for value in [min, max, step] {
                    block.extend_from_slice(&value.to_le_bytes());
                }
            }
            FrameIntervals::Discrete(_) => {
                let values = intervals.values();
                block.push(values.len() as u8);
                for value in values {
                    block.extend_from_slice(&value.to_le_bytes());
                }
            }
        }
        block[0] = block.len() as u8;
        block
    }

    /// A two interface camera: VideoControl at index 0, VideoStreaming at index 1.
    pub fn camera_config(
        vc_extra: Vec<u8>,
        vs_extra: Vec<u8>,
        status_endpoint: Option<u8>,
    ) -> ConfigDescriptor {
        let endpoints = status_endpoint
            .map(|address| {
                vec![EndpointDescriptor {
                    address,
                    max_packet_size: 16,
                    interval: 6,
                }]
            })
            .unwrap_or_default();

        ConfigDescriptor {
            number: 1,
            interfaces: vec![
                Interface {
                    number: 0,
                    alt_settings: vec![InterfaceDescriptor {
                        interface_number: 0,
                        setting_number: 0,
                        class_code: 14,
                        sub_class_code: 1,
                        protocol_code: 0,
                        endpoints,
                        extra: vc_extra,
                    }],
                },
                Interface {
                    number: 1,
                    alt_settings: vec![
                        InterfaceDescriptor {
                            interface_number: 1,
                            setting_number: 0,
                            class_code: 14,
                            sub_class_code: 2,
                            protocol_code: 0,
                            endpoints: vec![],
                            extra: vs_extra,
                        },
                        InterfaceDescriptor {
                            interface_number: 1,
                            setting_number: 1,
                            class_code: 14,
                            sub_class_code: 2,
                            protocol_code: 0,
                            endpoints: vec![EndpointDescriptor {
                                address: 0x81,
                                max_packet_size: 3072,
                                interval: 1,
                            }],
                            extra: vec![],
                        },
                    ],
                },
            ],
        }
    }

    /// A complete, conformant camera with two camera terminals and a processing unit.
    pub fn standard_camera_config(bcd_uvc: u16, status_endpoint: Option<u8>) -> ConfigDescriptor {
        camera_config(
            [
                vc_header(bcd_uvc, &[1]),
                input_terminal(1, 0x0201, &[0x0a, 0x00, 0x00]),
                input_terminal(2, 0x0201, &[0x00, 0x00, 0x00]),
                processing_unit(3, 1, &[0x7f, 0x15]),
            ]
            .concat(),
            [
                vs_input_header(0x81, 3),
                format_uncompressed(1, [0x59; 16], 16),
                frame_uncompressed(1, 640, 480, &FrameIntervals::Discrete(vec![333333, 0])),
            ]
            .concat(),
            status_endpoint,
        )
    }

    /// A device that is not a camera at all, such as a keyboard.
    pub fn hid_config() -> ConfigDescriptor {
        ConfigDescriptor {
            number: 1,
            interfaces: vec![Interface {
                number: 0,
                alt_settings: vec![InterfaceDescriptor {
                    interface_number: 0,
                    class_code: 3,
                    sub_class_code: 1,
                    protocol_code: 1,
                    ..Default::default()
                }],
            }],
        }
    }
}
