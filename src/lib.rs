// src/lib.rs
// NDT Reader Library - Public API

//! # NDT Reader
//!
//! Decoders for ultrasonic nondestructive-evaluation data files. Every reader
//! turns raw file content into coordinate-labeled numeric data with physical
//! units attached.
//!
//! ## Formats
//!
//! - CIVA simulation text exports: C-scan, true C-scan, B-scan, beam profile
//! - LeCroy oscilloscope binary waveforms (`.trc`), segmented captures included
//! - SAFT binary volumes
//! - Ultravision multi-channel text exports
//!
//! Readers take content, not paths, and keep no state between calls.
//!
//! ## Example
//!
//! ```no_run
//! use ndt_reader::{decode_lecroy, decode_ultravision};
//!
//! let bytes = std::fs::read("capture.trc").expect("Failed to read file");
//! let capture = decode_lecroy(&bytes).expect("Failed to decode waveform");
//! for wave in &capture.waveforms {
//!     println!("{} samples, dt = {:?} s", wave.len(), wave.horizontal.spacing());
//! }
//!
//! let text = std::fs::read_to_string("weld.txt").expect("Failed to read file");
//! let channels = decode_ultravision(&text, Some(100e6)).expect("Failed to decode scan");
//! for (name, scan) in channels.iter() {
//!     println!("{}: {:?} over {:?}", name, scan.shape(), scan.dims());
//! }
//! ```

mod axis;
mod civa;
mod decoder;
mod error;
mod header;
mod lecroy;
mod model;
mod saft;
mod ultravision;

pub use axis::AxisBuilder;
pub use civa::{decode_civa_scan, ScanKind};
pub use error::{DecodeError, Location, Result};
pub use lecroy::{decode_lecroy, LecroyCapture};
pub use model::{Axis, ChannelSet, InfoMap, LabeledArray, MetaValue, UnitTag, Waveform};
pub use saft::decode_saft;
pub use ultravision::decode_ultravision;
