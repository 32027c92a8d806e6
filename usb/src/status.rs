use crate::config::UvcConfig;
use crate::device::base::UsbHandle;
use crate::info::ControlInterface;
use log::{debug, warn};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::mpsc::Sender;
use uvc_types::{StatusAttribute, StatusClass};

/// A control change reported on the VideoControl interrupt endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub status_class: StatusClass,
    pub event: u8,
    pub selector: u8,
    pub attribute: StatusAttribute,
    pub data: Vec<u8>,
}

/// Runs on the status listener thread, it must not block and must not call back into the
/// handle that delivered the update.
pub type StatusCallback = Box<dyn FnMut(&StatusUpdate) + Send>;

pub(crate) enum StatusSink {
    Callback(StatusCallback),
    Channel(Sender<StatusUpdate>),
}

pub(crate) type SharedStatusSink = Arc<Mutex<Option<StatusSink>>>;

/// Decodes a single status packet. Returns `None` for anything that isn't a control change on a
/// known camera terminal or processing unit.
pub(crate) fn process_status_packet(
    ctrl_if: &ControlInterface,
    packet: &[u8],
) -> Option<StatusUpdate> {
    debug!("Got status transfer of {} bytes", packet.len());

    if packet.len() < 4 {
        debug!("Short read of status update ({} bytes)", packet.len());
        return None;
    }

    let originator = packet[1];
    match packet[0] & 0x0f {
        1 => {
            if packet.len() < 5 {
                return None;
            }

            let event = packet[2];
            let selector = packet[3];

            // Entity 0 is the VideoControl interface itself.
            if originator == 0 {
                debug!("Ignoring status update for the VideoControl interface");
                return None;
            }

            if event != 0 {
                debug!("Ignoring VideoControl status event {}", event);
                return None;
            }

            debug!("Status update for entity {}, selector {}", originator, selector);

            let status_class = if ctrl_if
                .input_terminals
                .iter()
                .any(|terminal| terminal.terminal_id == originator)
            {
                StatusClass::ControlCamera
            } else if ctrl_if
                .processing_units
                .iter()
                .any(|unit| unit.unit_id == originator)
            {
                StatusClass::ControlProcessing
            } else {
                warn!(
                    "Got status update for unknown VideoControl entity {}",
                    originator
                );
                return None;
            };

            Some(StatusUpdate {
                status_class,
                event,
                selector,
                attribute: StatusAttribute::from(packet[4]),
                data: packet[5..].to_vec(),
            })
        }
        2 => {
            debug!("Dropping VideoStreaming status update from interface {}", originator);
            None
        }
        other => {
            debug!("Dropping status update with unknown type {}", other);
            None
        }
    }
}

fn deliver(sink: &SharedStatusSink, update: StatusUpdate) {
    let mut sink = sink.lock().unwrap_or_else(PoisonError::into_inner);
    match sink.as_mut() {
        Some(StatusSink::Callback(callback)) => callback(&update),
        Some(StatusSink::Channel(sender)) => match sender.try_send(update) {
            Ok(()) => {}
            Err(TrySendError::Full(update)) => {
                debug!("Status channel full, dropping {:?}", update);
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Status channel closed, dropping update");
            }
        },
        None => debug!("No status receiver registered, dropping {:?}", update),
    }
}

/// Owns the thread reading the VideoControl interrupt endpoint.
pub(crate) struct StatusListener {
    stopping: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl StatusListener {
    pub(crate) fn spawn<H: UsbHandle>(
        name: String,
        handle: Arc<H>,
        ctrl_if: ControlInterface,
        sink: SharedStatusSink,
        config: &UvcConfig,
    ) -> io::Result<Self> {
        let stopping = Arc::new(AtomicBool::new(false));
        let thread_stopping = stopping.clone();
        let poll_interval = config.status_poll_interval;
        let buffer_size = config.status_buffer_size;

        let thread = thread::Builder::new().name(name).spawn(move || {
            run_status_loop(
                handle.as_ref(),
                &ctrl_if,
                &sink,
                &thread_stopping,
                poll_interval,
                buffer_size,
            );
        })?;

        Ok(Self {
            stopping,
            thread: Some(thread),
        })
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.thread
            .as_ref()
            .map(JoinHandle::is_finished)
            .unwrap_or(true)
    }

    /// Asks the thread to stop and waits for it. Once this returns the thread no longer holds
    /// its reference to the USB handle.
    pub(crate) fn stop(&mut self) {
        self.stopping.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Status listener thread panicked");
            }
        }
    }
}

impl Drop for StatusListener {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_status_loop<H: UsbHandle>(
    handle: &H,
    ctrl_if: &ControlInterface,
    sink: &SharedStatusSink,
    stopping: &AtomicBool,
    poll_interval: Duration,
    buffer_size: usize,
) {
    let endpoint = ctrl_if.endpoint_address;
    let mut buffer = vec![0; buffer_size];

    while !stopping.load(Ordering::Relaxed) {
        match handle.read_interrupt(endpoint, &mut buffer, poll_interval) {
            Ok(length) => {
                if let Some(update) = process_status_packet(ctrl_if, &buffer[..length]) {
                    deliver(sink, update);
                }
            }
            Err(rusb::Error::Timeout) => continue,
            Err(error @ (rusb::Error::Overflow | rusb::Error::Pipe)) => {
                // A stall or an oversized packet only loses that packet.
                debug!(
                    "Status transfer on endpoint {:#04x} failed, reading again: {}",
                    endpoint, error
                );
            }
            Err(error) => {
                // Transfer errors, cancellation and disconnects all end the listener.
                debug!(
                    "Status transfer on endpoint {:#04x} ended: {}",
                    endpoint, error
                );
                break;
            }
        }
    }
}
