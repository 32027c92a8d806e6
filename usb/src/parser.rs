use crate::device::base::{ConfigDescriptor, UsbDevice};
use crate::error::{Result, UvcError};
use crate::info::{
    ControlInterface, DeviceInfo, ExtensionUnit, FormatDescriptor, FrameDescriptor,
    FrameIntervals, InputTerminal, ProcessingUnit, StreamingInterface,
};
use byteorder::{ByteOrder, LittleEndian};
use log::debug;
use uvc_types::{
    is_supported_uvc_version, TerminalType, VcDescriptorSubtype, VsDescriptorSubtype, CLASS_VIDEO,
    CS_INTERFACE, SUBCLASS_VIDEO_CONTROL,
};

/// Fetches configuration 0 of the device and parses it into a capability tree.
pub(crate) fn build_device_info<D: UsbDevice>(device: &D) -> Result<DeviceInfo> {
    let config = device.config_descriptor(0).map_err(|error| {
        debug!("Unable to read the configuration descriptor: {}", error);
        UvcError::Io
    })?;
    DeviceInfo::parse(config)
}

impl DeviceInfo {
    /// Builds the capability tree from a configuration descriptor. The descriptor is kept
    /// inside the returned tree.
    pub fn parse(config: ConfigDescriptor) -> Result<DeviceInfo> {
        let mut parser = DescriptorParser {
            config: &config,
            ctrl_if: ControlInterface::default(),
            stream_ifs: Vec::new(),
        };
        parser.scan_control()?;

        let DescriptorParser {
            ctrl_if,
            stream_ifs,
            ..
        } = parser;

        Ok(DeviceInfo {
            config,
            ctrl_if,
            stream_ifs,
        })
    }
}

struct DescriptorParser<'a> {
    config: &'a ConfigDescriptor,
    ctrl_if: ControlInterface,
    stream_ifs: Vec<StreamingInterface>,
}

impl<'a> DescriptorParser<'a> {
    fn scan_control(&mut self) -> Result<()> {
        let config = self.config;
        let setting = config
            .interfaces
            .iter()
            .filter_map(|interface| interface.first_setting())
            .find(|setting| {
                setting.class_code == CLASS_VIDEO && setting.sub_class_code == SUBCLASS_VIDEO_CONTROL
            })
            .ok_or_else(|| UvcError::invalid_device("no VideoControl interface"))?;

        self.ctrl_if.interface_number = setting.interface_number;
        if let Some(endpoint) = setting.endpoints.first() {
            self.ctrl_if.endpoint_address = endpoint.address;
        }

        for_each_block(&setting.extra, |block| self.parse_vc(block))
    }

    fn parse_vc(&mut self, block: &[u8]) -> Result<()> {
        if block[1] != CS_INTERFACE {
            debug!("Skipping non class-specific VideoControl block of type {}", block[1]);
            return Ok(());
        }

        match VcDescriptorSubtype::from_id(block[2]) {
            Some(VcDescriptorSubtype::Header) => self.parse_vc_header(block),
            Some(VcDescriptorSubtype::InputTerminal) => self.parse_vc_input_terminal(block),
            Some(VcDescriptorSubtype::OutputTerminal) | Some(VcDescriptorSubtype::SelectorUnit) => {
                Ok(())
            }
            Some(VcDescriptorSubtype::ProcessingUnit) => self.parse_vc_processing_unit(block),
            Some(VcDescriptorSubtype::ExtensionUnit) => self.parse_vc_extension_unit(block),
            None => Err(UvcError::invalid_device(format!(
                "unknown VideoControl descriptor subtype {:#04x}",
                block[2]
            ))),
        }
    }

    fn parse_vc_header(&mut self, block: &[u8]) -> Result<()> {
        require(block, 12, "VideoControl header")?;

        let bcd_uvc = LittleEndian::read_u16(&block[3..5]);
        self.ctrl_if.bcd_uvc = bcd_uvc;
        if !is_supported_uvc_version(bcd_uvc) {
            return Err(UvcError::UnsupportedVersion(bcd_uvc));
        }

        for &interface_idx in &block[12..] {
            self.scan_streaming(interface_idx)?;
        }
        Ok(())
    }

    fn parse_vc_input_terminal(&mut self, block: &[u8]) -> Result<()> {
        require(block, 6, "input terminal")?;

        let terminal_type = LittleEndian::read_u16(&block[4..6]);
        if terminal_type != TerminalType::Camera.id() {
            debug!(
                "Skipping input terminal {} of type {:#06x}",
                block[3], terminal_type
            );
            return Ok(());
        }

        require(block, 15, "camera terminal")?;
        let control_size = block[14] as usize;
        require(block, 15 + control_size, "camera terminal controls")?;

        self.ctrl_if.input_terminals.push(InputTerminal {
            terminal_id: block[3],
            terminal_type,
            objective_focal_length_min: LittleEndian::read_u16(&block[8..10]),
            objective_focal_length_max: LittleEndian::read_u16(&block[10..12]),
            ocular_focal_length: LittleEndian::read_u16(&block[12..14]),
            bm_controls: read_controls(&block[15..15 + control_size]),
        });
        Ok(())
    }

    fn parse_vc_processing_unit(&mut self, block: &[u8]) -> Result<()> {
        require(block, 8, "processing unit")?;
        let control_size = block[7] as usize;
        require(block, 8 + control_size, "processing unit controls")?;

        self.ctrl_if.processing_units.push(ProcessingUnit {
            unit_id: block[3],
            source_id: block[4],
            bm_controls: read_controls(&block[8..8 + control_size]),
        });
        Ok(())
    }

    fn parse_vc_extension_unit(&mut self, block: &[u8]) -> Result<()> {
        require(block, 22, "extension unit")?;
        let num_in_pins = block[21] as usize;
        require(block, 23 + num_in_pins, "extension unit pins")?;

        let control_size = block[22 + num_in_pins] as usize;
        let start_of_controls = 23 + num_in_pins;
        require(
            block,
            start_of_controls + control_size,
            "extension unit controls",
        )?;

        let mut guid_extension_code = [0; 16];
        guid_extension_code.copy_from_slice(&block[4..20]);

        self.ctrl_if.extension_units.push(ExtensionUnit {
            unit_id: block[3],
            guid_extension_code,
            bm_controls: read_controls(&block[start_of_controls..start_of_controls + control_size]),
        });
        Ok(())
    }

    fn scan_streaming(&mut self, interface_idx: u8) -> Result<()> {
        let config = self.config;
        let setting = config
            .interfaces
            .get(interface_idx as usize)
            .and_then(|interface| interface.first_setting())
            .ok_or_else(|| {
                UvcError::invalid_device(format!(
                    "VideoControl header references missing streaming interface {}",
                    interface_idx
                ))
            })?;

        let mut stream_if = StreamingInterface {
            interface_number: setting.interface_number,
            ..Default::default()
        };
        for_each_block(&setting.extra, |block| parse_vs(&mut stream_if, block))?;

        self.stream_ifs.push(stream_if);
        Ok(())
    }
}

fn parse_vs(stream_if: &mut StreamingInterface, block: &[u8]) -> Result<()> {
    match VsDescriptorSubtype::from_id(block[2]) {
        Some(VsDescriptorSubtype::InputHeader) => parse_vs_input_header(stream_if, block),
        Some(VsDescriptorSubtype::FormatUncompressed) => {
            parse_vs_format_uncompressed(stream_if, block)
        }
        Some(VsDescriptorSubtype::FrameUncompressed) => {
            parse_vs_frame_uncompressed(stream_if, block)
        }
        _ => {
            debug!(
                "Skipping VideoStreaming descriptor subtype {:#04x} on interface {}",
                block[2], stream_if.interface_number
            );
            Ok(())
        }
    }
}

fn parse_vs_input_header(stream_if: &mut StreamingInterface, block: &[u8]) -> Result<()> {
    require(block, 9, "VideoStreaming input header")?;

    stream_if.endpoint_address = block[6] & 0x8f;
    stream_if.terminal_link = block[8];
    Ok(())
}

fn parse_vs_format_uncompressed(stream_if: &mut StreamingInterface, block: &[u8]) -> Result<()> {
    require(block, 27, "uncompressed format")?;

    let mut guid_format = [0; 16];
    guid_format.copy_from_slice(&block[5..21]);

    stream_if.formats.push(FormatDescriptor {
        interface_number: stream_if.interface_number,
        descriptor_subtype: block[2],
        format_index: block[3],
        guid_format,
        bits_per_pixel: block[21],
        default_frame_index: block[22],
        aspect_ratio_x: block[23],
        aspect_ratio_y: block[24],
        interlace_flags: block[25],
        copy_protect: block[26],
        frames: Vec::new(),
    });
    Ok(())
}

fn parse_vs_frame_uncompressed(stream_if: &mut StreamingInterface, block: &[u8]) -> Result<()> {
    require(block, 26, "uncompressed frame")?;

    let format = stream_if.formats.last_mut().ok_or_else(|| {
        UvcError::invalid_device("frame descriptor appears before any format descriptor")
    })?;

    let interval_type = block[25] as usize;
    let frame_intervals = if interval_type == 0 {
        require(block, 38, "continuous frame intervals")?;
        FrameIntervals::Continuous {
            min: LittleEndian::read_u32(&block[26..30]),
            max: LittleEndian::read_u32(&block[30..34]),
            step: LittleEndian::read_u32(&block[34..38]),
        }
    } else {
        require(block, 26 + interval_type * 4, "discrete frame intervals")?;
        let mut table: Vec<u32> = block[26..26 + interval_type * 4]
            .chunks_exact(4)
            .map(LittleEndian::read_u32)
            .collect();
        table.push(0);
        FrameIntervals::Discrete(table)
    };

    format.frames.push(FrameDescriptor {
        format_index: format.format_index,
        descriptor_subtype: block[2],
        frame_index: block[3],
        capabilities: block[4],
        width: LittleEndian::read_u16(&block[5..7]),
        height: LittleEndian::read_u16(&block[7..9]),
        min_bit_rate: LittleEndian::read_u32(&block[9..13]),
        max_bit_rate: LittleEndian::read_u32(&block[13..17]),
        max_video_frame_buffer_size: LittleEndian::read_u32(&block[17..21]),
        default_frame_interval: LittleEndian::read_u32(&block[21..25]),
        frame_intervals,
    });
    Ok(())
}

/// Walks a chain of length-prefixed descriptor blocks, stopping once fewer than 3 bytes remain.
fn for_each_block<F>(buffer: &[u8], mut parse: F) -> Result<()>
where
    F: FnMut(&[u8]) -> Result<()>,
{
    let mut remaining = buffer;
    while remaining.len() >= 3 {
        let block_size = remaining[0] as usize;
        if block_size < 3 || block_size > remaining.len() {
            return Err(UvcError::invalid_device(format!(
                "descriptor block length {} with {} bytes remaining",
                block_size,
                remaining.len()
            )));
        }

        let (block, rest) = remaining.split_at(block_size);
        parse(block)?;
        remaining = rest;
    }
    Ok(())
}

fn require(block: &[u8], length: usize, what: &str) -> Result<()> {
    if block.len() < length {
        return Err(UvcError::invalid_device(format!(
            "{} descriptor is {} bytes, expected at least {}",
            what,
            block.len(),
            length
        )));
    }
    Ok(())
}

// bmControls is accumulated from the last byte down, so the first byte ends up least significant.
fn read_controls(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .rev()
        .fold(0, |controls, &byte| (controls << 8) | u64::from(byte))
}
