//! Transport layer for byte-stream I/O abstraction

use crate::error::Result;

pub mod serial;
pub use serial::SerialTransport;

/// Byte-stream transport capability.
///
/// The GNSS receiver is consumed through this seam; the daemon never
/// touches UART framing directly.
pub trait Transport: Send {
    /// Read data into buffer, returns number of bytes read.
    /// Returns `Ok(0)` when no data is available within the transport's
    /// internal timeout.
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize>;

    /// Write data from buffer, returns number of bytes written
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Flush any pending writes
    fn flush(&mut self) -> Result<()>;

    /// Check if data is available to read
    fn available(&mut self) -> Result<usize> {
        Ok(0)
    }
}
