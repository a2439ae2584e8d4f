//! `wss-driver-finisar`
//!
//! Driver for Finisar-style wavelength selective switches speaking the
//! checksum-framed ASCII serial protocol.
//!
//! Layered bottom-up:
//!
//! - [`transport`]: line-oriented async I/O over one serial descriptor
//!   (read-until-delimiter with an explicit timeout, independent write
//!   path)
//! - [`frame`]: `^<payload>$<checksum>` framing
//! - [`comm`]: command/response exchanges and the vendor command set
//!   (`CHW`, `DCC`, `UCA`, status queries)
//! - [`adapter`]: [`wss_core::Adapter`] implementation — grid
//!   validation, slice mapping, taint detection, commit sequencing
//!
//! # Usage
//!
//! ```rust,ignore
//! use wss_core::{FixedGridSpec, Wss};
//! use wss_driver_finisar::{open_serial, FinisarAdapter};
//!
//! let transport = open_serial("/dev/ttyUSB0", 115_200).await?;
//! let adapter = FinisarAdapter::with_defaults(transport)?;
//! let mut wss = Wss::new(FixedGridSpec::default().build(), Some(Box::new(adapter))).await?;
//! wss.commit().await?;
//! ```

pub mod adapter;
pub mod comm;
pub mod error;
pub mod frame;
pub mod transport;

pub use adapter::{FinisarAdapter, FinisarConfig};
pub use comm::Communication;
pub use error::ProtocolError;
pub use transport::{open_serial, DynSerial, LineTransport, SerialPortIO};
