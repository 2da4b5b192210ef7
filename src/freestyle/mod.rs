//! Shared HID text protocol of Abbott FreeStyle meters.
//!
//! Commands are short ASCII strings wrapped in fixed 64-byte HID reports.
//! Replies may span several reports and end in a checksum line and a
//! `CMD OK` / `CMD Fail!` status line.
//!
//! # Example
//!
//! ```no_run
//! use freestyle_hid::freestyle::{FreestyleDevice, HidrawTransport};
//!
//! let transport = HidrawTransport::open("/dev/hidraw0")?;
//! let mut device = FreestyleDevice::new(transport);
//! device.connect()?;
//! println!("Serial: {}", device.serial_number()?);
//! for record in device.multirecord(b"$result?")? {
//!     println!("{}", record?.join(","));
//! }
//! # Ok::<(), freestyle_hid::freestyle::FreestyleError>(())
//! ```

pub mod checksum;
mod device;
mod error;
pub mod frame;
mod records;
pub mod reply;
mod transport;


pub use device::{DEFAULT_MAX_STRAY_FRAMES, FreestyleDevice, INIT_SEQUENCE, ProtocolOptions, convert_ketone_unit};
pub use error::{FreestyleError, Result};
pub use frame::Frame;
pub use records::{MultiRecords, Record, parse_record};
pub use reply::AsciiDecoding;
pub use transport::{HidrawTransport, Transport};
