//! Packet channel to the meter.

use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::Path;

use tracing::info;

use super::frame::FRAME_SIZE;

/// Blocking channel exchanging whole HID reports with a device.
///
/// Opening and closing the channel is the caller's business; the protocol
/// engine only borrows it for the duration of each exchange.
pub trait Transport {
    /// Send one complete report.
    fn write(&mut self, packet: &[u8]) -> io::Result<()>;

    /// Block until one report arrives and return its bytes.
    fn read(&mut self) -> io::Result<Vec<u8>>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write(&mut self, packet: &[u8]) -> io::Result<()> {
        (**self).write(packet)
    }

    fn read(&mut self) -> io::Result<Vec<u8>> {
        (**self).read()
    }
}

/// Linux `hidraw` character device.
///
/// Writes include the leading report ID byte; reads return the report
/// without it.
pub struct HidrawTransport {
    file: File,
}

impl HidrawTransport {
    /// Open a hidraw node such as `/dev/hidraw0`.
    ///
    /// # Errors
    /// Returns the underlying IO error if the node cannot be opened for
    /// reading and writing.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        info!("Opening HID device {}", path.display());
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        Ok(Self { file })
    }
}

impl Transport for HidrawTransport {
    fn write(&mut self, packet: &[u8]) -> io::Result<()> {
        self.file.write_all(packet)
    }

    fn read(&mut self) -> io::Result<Vec<u8>> {
        let mut buf = [0u8; FRAME_SIZE];
        let n = self.file.read(&mut buf)?;
        if n == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "HID device returned no data"));
        }
        Ok(buf[..n].to_vec())
    }
}
