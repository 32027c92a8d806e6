use enumset::EnumSetType;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter};

/// The supported `bcdUVC` values, 1.00, 1.0a and 1.10.
pub const SUPPORTED_UVC_VERSIONS: [u16; 3] = [0x0100, 0x010a, 0x0110];

/// USB-IF class code for video devices.
pub const CLASS_VIDEO: u8 = 14;
pub const SUBCLASS_VIDEO_CONTROL: u8 = 1;
pub const SUBCLASS_VIDEO_STREAMING: u8 = 2;

/// Descriptor type of every class-specific interface descriptor.
pub const CS_INTERFACE: u8 = 36;

#[derive(Copy, Clone, Debug, Display, EnumIter, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum VcDescriptorSubtype {
    Header,
    InputTerminal,
    OutputTerminal,
    SelectorUnit,
    ProcessingUnit,
    ExtensionUnit,
}

impl VcDescriptorSubtype {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0x01 => Some(VcDescriptorSubtype::Header),
            0x02 => Some(VcDescriptorSubtype::InputTerminal),
            0x03 => Some(VcDescriptorSubtype::OutputTerminal),
            0x04 => Some(VcDescriptorSubtype::SelectorUnit),
            0x05 => Some(VcDescriptorSubtype::ProcessingUnit),
            0x06 => Some(VcDescriptorSubtype::ExtensionUnit),
            _ => None,
        }
    }

    pub fn id(&self) -> u8 {
        match self {
            VcDescriptorSubtype::Header => 0x01,
            VcDescriptorSubtype::InputTerminal => 0x02,
            VcDescriptorSubtype::OutputTerminal => 0x03,
            VcDescriptorSubtype::SelectorUnit => 0x04,
            VcDescriptorSubtype::ProcessingUnit => 0x05,
            VcDescriptorSubtype::ExtensionUnit => 0x06,
        }
    }
}

#[derive(Copy, Clone, Debug, Display, EnumIter, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum VsDescriptorSubtype {
    InputHeader,
    OutputHeader,
    StillImageFrame,
    FormatUncompressed,
    FrameUncompressed,
    FormatMjpeg,
    FrameMjpeg,
    FormatMpeg2ts,
    FormatDv,
    ColorFormat,
    FormatFrameBased,
    FrameFrameBased,
    FormatStreamBased,
}

impl VsDescriptorSubtype {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0x01 => Some(VsDescriptorSubtype::InputHeader),
            0x02 => Some(VsDescriptorSubtype::OutputHeader),
            0x03 => Some(VsDescriptorSubtype::StillImageFrame),
            0x04 => Some(VsDescriptorSubtype::FormatUncompressed),
            0x05 => Some(VsDescriptorSubtype::FrameUncompressed),
            0x06 => Some(VsDescriptorSubtype::FormatMjpeg),
            0x07 => Some(VsDescriptorSubtype::FrameMjpeg),
            0x0a => Some(VsDescriptorSubtype::FormatMpeg2ts),
            0x0c => Some(VsDescriptorSubtype::FormatDv),
            0x0d => Some(VsDescriptorSubtype::ColorFormat),
            0x10 => Some(VsDescriptorSubtype::FormatFrameBased),
            0x11 => Some(VsDescriptorSubtype::FrameFrameBased),
            0x12 => Some(VsDescriptorSubtype::FormatStreamBased),
            _ => None,
        }
    }

    pub fn id(&self) -> u8 {
        match self {
            VsDescriptorSubtype::InputHeader => 0x01,
            VsDescriptorSubtype::OutputHeader => 0x02,
            VsDescriptorSubtype::StillImageFrame => 0x03,
            VsDescriptorSubtype::FormatUncompressed => 0x04,
            VsDescriptorSubtype::FrameUncompressed => 0x05,
            VsDescriptorSubtype::FormatMjpeg => 0x06,
            VsDescriptorSubtype::FrameMjpeg => 0x07,
            VsDescriptorSubtype::FormatMpeg2ts => 0x0a,
            VsDescriptorSubtype::FormatDv => 0x0c,
            VsDescriptorSubtype::ColorFormat => 0x0d,
            VsDescriptorSubtype::FormatFrameBased => 0x10,
            VsDescriptorSubtype::FrameFrameBased => 0x11,
            VsDescriptorSubtype::FormatStreamBased => 0x12,
        }
    }
}

/// Input terminal types. Only `Camera` terminals are kept in a parsed tree.
#[derive(Copy, Clone, Debug, Display, EnumIter, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TerminalType {
    VendorSpecific,
    Camera,
    MediaTransportInput,
}

impl TerminalType {
    pub fn from_id(id: u16) -> Option<Self> {
        match id {
            0x0200 => Some(TerminalType::VendorSpecific),
            0x0201 => Some(TerminalType::Camera),
            0x0202 => Some(TerminalType::MediaTransportInput),
            _ => None,
        }
    }

    pub fn id(&self) -> u16 {
        match self {
            TerminalType::VendorSpecific => 0x0200,
            TerminalType::Camera => 0x0201,
            TerminalType::MediaTransportInput => 0x0202,
        }
    }
}

#[derive(Copy, Clone, Debug, Display, EnumIter, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StatusClass {
    Control,
    ControlCamera,
    ControlProcessing,
}

impl StatusClass {
    pub fn id(&self) -> u8 {
        match self {
            StatusClass::Control => 0x10,
            StatusClass::ControlCamera => 0x11,
            StatusClass::ControlProcessing => 0x12,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StatusAttribute {
    ValueChange,
    InfoChange,
    FailureChange,
    Unknown(u8),
}

impl From<u8> for StatusAttribute {
    fn from(value: u8) -> Self {
        match value {
            0x00 => StatusAttribute::ValueChange,
            0x01 => StatusAttribute::InfoChange,
            0x02 => StatusAttribute::FailureChange,
            other => StatusAttribute::Unknown(other),
        }
    }
}

// Bit positions of a camera terminal's bmControls (UVC 1.1, table 3-6).
#[derive(Debug, Display, EnumIter, EnumSetType)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CameraControl {
    ScanningMode = 0,
    AutoExposureMode = 1,
    AutoExposurePriority = 2,
    ExposureTimeAbsolute = 3,
    ExposureTimeRelative = 4,
    FocusAbsolute = 5,
    FocusRelative = 6,
    IrisAbsolute = 7,
    IrisRelative = 8,
    ZoomAbsolute = 9,
    ZoomRelative = 10,
    PanTiltAbsolute = 11,
    PanTiltRelative = 12,
    RollAbsolute = 13,
    RollRelative = 14,
    FocusAuto = 17,
    Privacy = 18,
}

// Bit positions of a processing unit's bmControls (UVC 1.1, table 3-8).
#[derive(Debug, Display, EnumIter, EnumSetType)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ProcessingControl {
    Brightness = 0,
    Contrast = 1,
    Hue = 2,
    Saturation = 3,
    Sharpness = 4,
    Gamma = 5,
    WhiteBalanceTemperature = 6,
    WhiteBalanceComponent = 7,
    BacklightCompensation = 8,
    Gain = 9,
    PowerLineFrequency = 10,
    HueAuto = 11,
    WhiteBalanceTemperatureAuto = 12,
    WhiteBalanceComponentAuto = 13,
    DigitalMultiplier = 14,
    DigitalMultiplierLimit = 15,
    AnalogVideoStandard = 16,
    AnalogVideoLockStatus = 17,
}

pub fn is_supported_uvc_version(bcd_uvc: u16) -> bool {
    SUPPORTED_UVC_VERSIONS.contains(&bcd_uvc)
}
