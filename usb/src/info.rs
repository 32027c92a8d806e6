// The capability tree of one camera. The tree is owned top-down by `DeviceInfo`, children refer
// back to their parents by number (interface number, format index) rather than by reference.

use crate::device::base::ConfigDescriptor;
use enumset::EnumSet;
use uvc_types::{CameraControl, ProcessingControl};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceInfo {
    pub(crate) config: ConfigDescriptor,
    pub(crate) ctrl_if: ControlInterface,
    pub(crate) stream_ifs: Vec<StreamingInterface>,
}

impl DeviceInfo {
    /// The configuration descriptor the tree was parsed from.
    pub fn config(&self) -> &ConfigDescriptor {
        &self.config
    }

    pub fn control_interface(&self) -> &ControlInterface {
        &self.ctrl_if
    }

    pub fn streaming_interfaces(&self) -> &[StreamingInterface] {
        &self.stream_ifs
    }

    pub fn streaming_interface(&self, interface_number: u8) -> Option<&StreamingInterface> {
        self.stream_ifs
            .iter()
            .find(|stream_if| stream_if.interface_number == interface_number)
    }

    pub fn input_terminal(&self, terminal_id: u8) -> Option<&InputTerminal> {
        self.ctrl_if
            .input_terminals
            .iter()
            .find(|terminal| terminal.terminal_id == terminal_id)
    }

    pub fn processing_unit(&self, unit_id: u8) -> Option<&ProcessingUnit> {
        self.ctrl_if
            .processing_units
            .iter()
            .find(|unit| unit.unit_id == unit_id)
    }

    pub fn extension_unit(&self, unit_id: u8) -> Option<&ExtensionUnit> {
        self.ctrl_if
            .extension_units
            .iter()
            .find(|unit| unit.unit_id == unit_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlInterface {
    pub(crate) interface_number: u8,
    pub(crate) bcd_uvc: u16,
    pub(crate) endpoint_address: u8,
    pub(crate) input_terminals: Vec<InputTerminal>,
    pub(crate) processing_units: Vec<ProcessingUnit>,
    pub(crate) extension_units: Vec<ExtensionUnit>,
}

impl ControlInterface {
    pub fn interface_number(&self) -> u8 {
        self.interface_number
    }

    pub fn bcd_uvc(&self) -> u16 {
        self.bcd_uvc
    }

    /// Address of the status interrupt endpoint, 0 if the interface has none.
    pub fn endpoint_address(&self) -> u8 {
        self.endpoint_address
    }

    pub fn input_terminals(&self) -> &[InputTerminal] {
        &self.input_terminals
    }

    pub fn processing_units(&self) -> &[ProcessingUnit] {
        &self.processing_units
    }

    pub fn extension_units(&self) -> &[ExtensionUnit] {
        &self.extension_units
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputTerminal {
    pub(crate) terminal_id: u8,
    pub(crate) terminal_type: u16,
    pub(crate) objective_focal_length_min: u16,
    pub(crate) objective_focal_length_max: u16,
    pub(crate) ocular_focal_length: u16,
    pub(crate) bm_controls: u64,
}

impl InputTerminal {
    pub fn terminal_id(&self) -> u8 {
        self.terminal_id
    }

    pub fn terminal_type(&self) -> u16 {
        self.terminal_type
    }

    pub fn objective_focal_length_min(&self) -> u16 {
        self.objective_focal_length_min
    }

    pub fn objective_focal_length_max(&self) -> u16 {
        self.objective_focal_length_max
    }

    pub fn ocular_focal_length(&self) -> u16 {
        self.ocular_focal_length
    }

    pub fn bm_controls(&self) -> u64 {
        self.bm_controls
    }

    pub fn camera_controls(&self) -> EnumSet<CameraControl> {
        EnumSet::from_u64_truncated(self.bm_controls)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessingUnit {
    pub(crate) unit_id: u8,
    pub(crate) source_id: u8,
    pub(crate) bm_controls: u64,
}

impl ProcessingUnit {
    pub fn unit_id(&self) -> u8 {
        self.unit_id
    }

    pub fn source_id(&self) -> u8 {
        self.source_id
    }

    pub fn bm_controls(&self) -> u64 {
        self.bm_controls
    }

    pub fn controls(&self) -> EnumSet<ProcessingControl> {
        EnumSet::from_u64_truncated(self.bm_controls)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionUnit {
    pub(crate) unit_id: u8,
    pub(crate) guid_extension_code: [u8; 16],
    pub(crate) bm_controls: u64,
}

impl ExtensionUnit {
    pub fn unit_id(&self) -> u8 {
        self.unit_id
    }

    pub fn guid_extension_code(&self) -> &[u8; 16] {
        &self.guid_extension_code
    }

    pub fn bm_controls(&self) -> u64 {
        self.bm_controls
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamingInterface {
    pub(crate) interface_number: u8,
    pub(crate) endpoint_address: u8,
    pub(crate) terminal_link: u8,
    pub(crate) formats: Vec<FormatDescriptor>,
}

impl StreamingInterface {
    pub fn interface_number(&self) -> u8 {
        self.interface_number
    }

    pub fn endpoint_address(&self) -> u8 {
        self.endpoint_address
    }

    pub fn terminal_link(&self) -> u8 {
        self.terminal_link
    }

    pub fn formats(&self) -> &[FormatDescriptor] {
        &self.formats
    }

    pub fn format(&self, format_index: u8) -> Option<&FormatDescriptor> {
        self.formats
            .iter()
            .find(|format| format.format_index == format_index)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatDescriptor {
    pub(crate) interface_number: u8,
    pub(crate) descriptor_subtype: u8,
    pub(crate) format_index: u8,
    pub(crate) guid_format: [u8; 16],
    pub(crate) bits_per_pixel: u8,
    pub(crate) default_frame_index: u8,
    pub(crate) aspect_ratio_x: u8,
    pub(crate) aspect_ratio_y: u8,
    pub(crate) interlace_flags: u8,
    pub(crate) copy_protect: u8,
    pub(crate) frames: Vec<FrameDescriptor>,
}

impl FormatDescriptor {
    /// Number of the streaming interface this format belongs to.
    pub fn interface_number(&self) -> u8 {
        self.interface_number
    }

    pub fn descriptor_subtype(&self) -> u8 {
        self.descriptor_subtype
    }

    pub fn format_index(&self) -> u8 {
        self.format_index
    }

    pub fn guid_format(&self) -> &[u8; 16] {
        &self.guid_format
    }

    pub fn bits_per_pixel(&self) -> u8 {
        self.bits_per_pixel
    }

    pub fn default_frame_index(&self) -> u8 {
        self.default_frame_index
    }

    pub fn aspect_ratio(&self) -> (u8, u8) {
        (self.aspect_ratio_x, self.aspect_ratio_y)
    }

    pub fn interlace_flags(&self) -> u8 {
        self.interlace_flags
    }

    pub fn copy_protect(&self) -> u8 {
        self.copy_protect
    }

    pub fn frames(&self) -> &[FrameDescriptor] {
        &self.frames
    }

    pub fn frame(&self, frame_index: u8) -> Option<&FrameDescriptor> {
        self.frames
            .iter()
            .find(|frame| frame.frame_index == frame_index)
    }
}

/// A frame advertises either a continuous interval range or a discrete table, never both.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameIntervals {
    Continuous { min: u32, max: u32, step: u32 },

    /// The discrete table, always terminated by a trailing 0.
    Discrete(Vec<u32>),
}

impl FrameIntervals {
    /// The advertised discrete intervals without the trailing 0, empty for a continuous range.
    pub fn values(&self) -> &[u32] {
        match self {
            FrameIntervals::Continuous { .. } => &[],
            FrameIntervals::Discrete(table) => match table.split_last() {
                Some((_, values)) => values,
                None => &[],
            },
        }
    }
}

impl Default for FrameIntervals {
    fn default() -> Self {
        FrameIntervals::Continuous {
            min: 0,
            max: 0,
            step: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameDescriptor {
    pub(crate) format_index: u8,
    pub(crate) descriptor_subtype: u8,
    pub(crate) frame_index: u8,
    pub(crate) capabilities: u8,
    pub(crate) width: u16,
    pub(crate) height: u16,
    pub(crate) min_bit_rate: u32,
    pub(crate) max_bit_rate: u32,
    pub(crate) max_video_frame_buffer_size: u32,
    pub(crate) default_frame_interval: u32,
    pub(crate) frame_intervals: FrameIntervals,
}

impl FrameDescriptor {
    /// Index of the format this frame belongs to.
    pub fn format_index(&self) -> u8 {
        self.format_index
    }

    pub fn descriptor_subtype(&self) -> u8 {
        self.descriptor_subtype
    }

    pub fn frame_index(&self) -> u8 {
        self.frame_index
    }

    pub fn capabilities(&self) -> u8 {
        self.capabilities
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    pub fn min_bit_rate(&self) -> u32 {
        self.min_bit_rate
    }

    pub fn max_bit_rate(&self) -> u32 {
        self.max_bit_rate
    }

    pub fn max_video_frame_buffer_size(&self) -> u32 {
        self.max_video_frame_buffer_size
    }

    pub fn default_frame_interval(&self) -> u32 {
        self.default_frame_interval
    }

    pub fn frame_intervals(&self) -> &FrameIntervals {
        &self.frame_intervals
    }

    /// `(min, max, step)` when the frame advertises a continuous range.
    pub fn interval_range(&self) -> Option<(u32, u32, u32)> {
        match self.frame_intervals {
            FrameIntervals::Continuous { min, max, step } => Some((min, max, step)),
            FrameIntervals::Discrete(_) => None,
        }
    }

    /// The 0 terminated discrete table when the frame advertises one.
    pub fn intervals(&self) -> Option<&[u32]> {
        match &self.frame_intervals {
            FrameIntervals::Continuous { .. } => None,
            FrameIntervals::Discrete(table) => Some(table),
        }
    }
}
