use std::time::Duration;
use strum::Display;

/// Which interfaces are claimed when a device is opened.
#[derive(Copy, Clone, Debug, Default, Display, PartialEq, Eq)]
pub enum InterfaceSelection {
    /// Interfaces 0 (VideoControl) and 1 (VideoStreaming), regardless of what the
    /// descriptors say. Matches every conformant single-stream camera.
    #[default]
    Fixed,

    /// The VideoControl interface plus every streaming interface listed in the VC header.
    Discovered,
}

#[derive(Clone, Debug)]
pub struct UvcConfig {
    pub(crate) string_timeout: Duration,
    pub(crate) status_poll_interval: Duration,
    pub(crate) status_buffer_size: usize,
    pub(crate) detach_kernel_driver: bool,
    pub(crate) interface_selection: InterfaceSelection,
}

impl Default for UvcConfig {
    fn default() -> Self {
        Self {
            string_timeout: Duration::from_millis(100),
            status_poll_interval: Duration::from_millis(250),
            status_buffer_size: 32,
            detach_kernel_driver: true,
            interface_selection: InterfaceSelection::Fixed,
        }
    }
}

impl UvcConfig {
    pub fn string_timeout(mut self, timeout: Duration) -> Self {
        self.string_timeout = timeout;
        self
    }

    /// How long a single interrupt read waits before the status listener checks whether it
    /// has been asked to stop. A timed out read is simply issued again.
    pub fn status_poll_interval(mut self, interval: Duration) -> Self {
        self.status_poll_interval = interval;
        self
    }

    pub fn status_buffer_size(mut self, size: usize) -> Self {
        // A VideoControl status packet is at least 5 bytes long.
        self.status_buffer_size = size.max(5);
        self
    }

    pub fn detach_kernel_driver(mut self, detach: bool) -> Self {
        self.detach_kernel_driver = detach;
        self
    }

    pub fn interface_selection(mut self, selection: InterfaceSelection) -> Self {
        self.interface_selection = selection;
        self
    }

    pub fn get_string_timeout(&self) -> Duration {
        self.string_timeout
    }

    pub fn get_status_poll_interval(&self) -> Duration {
        self.status_poll_interval
    }

    pub fn get_status_buffer_size(&self) -> usize {
        self.status_buffer_size
    }

    pub fn get_detach_kernel_driver(&self) -> bool {
        self.detach_kernel_driver
    }

    pub fn get_interface_selection(&self) -> InterfaceSelection {
        self.interface_selection
    }
}
