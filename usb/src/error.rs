pub type Result<T, E = UvcError> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UvcError {
    #[error("USB transport failed")]
    Io,

    #[error("Invalid parameter")]
    InvalidParam,

    #[error("Access denied (insufficient permissions)")]
    Access,

    #[error("Invalid UVC device: {0}")]
    InvalidDevice(String),

    #[error("Unsupported UVC version {0:#06x}")]
    UnsupportedVersion(u16),

    #[error("Operation not supported")]
    NotSupported,

    #[error("No UVC device was found")]
    NoDevice,

    #[error("Insufficient memory")]
    NoMem,

    #[error("Resource busy")]
    Busy,

    #[error("Pipe error")]
    Pipe,

    #[error("Operation timed out")]
    Timeout,

    #[error("System call interrupted")]
    Interrupted,

    #[error("Overflow")]
    Overflow,

    #[error("Entity not found")]
    NotFound,

    #[error("Unknown USB error")]
    Other,
}

impl UvcError {
    pub(crate) fn invalid_device(reason: impl Into<String>) -> Self {
        UvcError::InvalidDevice(reason.into())
    }
}

impl From<rusb::Error> for UvcError {
    fn from(error: rusb::Error) -> Self {
        match error {
            rusb::Error::Io => UvcError::Io,
            rusb::Error::InvalidParam => UvcError::InvalidParam,
            rusb::Error::Access => UvcError::Access,
            rusb::Error::NoDevice => UvcError::NoDevice,
            rusb::Error::NotFound => UvcError::NotFound,
            rusb::Error::Busy => UvcError::Busy,
            rusb::Error::Timeout => UvcError::Timeout,
            rusb::Error::Overflow => UvcError::Overflow,
            rusb::Error::Pipe => UvcError::Pipe,
            rusb::Error::Interrupted => UvcError::Interrupted,
            rusb::Error::NoMem => UvcError::NoMem,
            rusb::Error::NotSupported => UvcError::NotSupported,
            _ => UvcError::Other,
        }
    }
}
