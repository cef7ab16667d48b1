//! # Transport Module
//!
//! Opens the serial link to the instrument bridge.
//!
//! The ingest loop is generic over `AsyncRead`, so this module only needs to
//! produce an opened stream; framing and decoding live in [`crate::nmea`].

use crate::error::{AnchorWatchError, Result};
use tokio_serial::SerialPortBuilderExt;
use tracing::{debug, info, warn};

/// Default device paths to try (in order of preference)
const DEFAULT_DEVICE_PATHS: &[&str] = &[
    "/dev/ttyUSB0", // USB-to-serial adapters
    "/dev/ttyACM0", // USB CDC devices
];

/// Instrument-feed serial port handler
pub struct InstrumentSerial {
    /// Serial port handle
    port: tokio_serial::SerialStream,
    /// Device path (e.g., /dev/ttyUSB0)
    device_path: String,
}

impl std::fmt::Debug for InstrumentSerial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InstrumentSerial")
            .field("device_path", &self.device_path)
            .finish_non_exhaustive()
    }
}

impl InstrumentSerial {
    /// Open the configured port, falling back to auto-detection when the
    /// configured path fails.
    ///
    /// # Arguments
    ///
    /// * `configured_path` - Port from the configuration file
    /// * `baud_rate` - Line speed, typically 4800 for instrument feeds
    ///
    /// # Errors
    ///
    /// Returns error if neither the configured path nor any default path
    /// can be opened
    pub fn open(configured_path: &str, baud_rate: u32) -> Result<Self> {
        let mut paths = vec![configured_path];
        paths.extend(
            DEFAULT_DEVICE_PATHS
                .iter()
                .copied()
                .filter(|&p| p != configured_path),
        );
        Self::open_with_paths(&paths, baud_rate)
    }

    /// Open the first path that succeeds from the given list.
    pub fn open_with_paths(paths: &[&str], baud_rate: u32) -> Result<Self> {
        for path in paths {
            debug!("Trying to open serial port: {}", path);

            match Self::open_port(path, baud_rate) {
                Ok(port) => {
                    info!("Opened instrument feed at {} ({} baud)", path, baud_rate);
                    return Ok(Self {
                        port,
                        device_path: path.to_string(),
                    });
                }
                Err(e) => {
                    warn!("Failed to open {}: {}", path, e);
                    continue;
                }
            }
        }

        Err(AnchorWatchError::Transport(format!(
            "no instrument feed found at: {}",
            paths.join(", ")
        )))
    }

    /// Open a specific serial port with 8N1 settings.
    fn open_port(path: &str, baud_rate: u32) -> Result<tokio_serial::SerialStream> {
        let port = tokio_serial::new(path, baud_rate)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| AnchorWatchError::Transport(format!("Failed to open {}: {}", path, e)))?;

        Ok(port)
    }

    /// Get the device path of the opened serial port
    pub fn device_path(&self) -> &str {
        &self.device_path
    }

    /// Consume the handler, yielding the raw stream for the ingest loop.
    pub fn into_stream(self) -> tokio_serial::SerialStream {
        self.port
    }
}
