#![deny(unsafe_code)]
//! Box serialization and the per-image JPEG encode pipeline for HEIF containers.
//!
//! This crate covers two tightly coupled pieces of a HEIF muxer:
//!
//! * the generic two-phase box write/parse protocol every structural element
//!   of the container obeys, with hard resource limits against hostile input
//!   (see [`bmff`]), and
//! * the pipeline that turns a decoded pixel buffer into a coded JPEG
//!   bitstream plus an ordered set of descriptive properties by driving a
//!   pluggable native encoder backend (see [`encode_image_as_jpeg`]).
//!
//! Colorspace conversion, encoder selection, and file I/O live in the
//! embedding application; they are consumed here through the
//! [`ColorConverter`] and [`EncoderPlugin`] traits.

// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use fallible_collections::TryReserveError;

pub mod bmff;
mod boxes;
mod encode;
mod image;
mod jpgc;
mod plugin;
mod properties;

pub use crate::bmff::{BoxHeader, BoxReader, BoxWriter, WriteBox};
pub use crate::boxes::{BoxType, FourCC};
pub use crate::encode::{encode_image_as_jpeg, CodedImageData, EncodingOptions};
pub use crate::image::{
    ChromaFormat, ColorConverter, Colorspace, ConvertedImage, ImageRole, PixelImage, Plane,
    JPEG_TARGET_NCLX,
};
pub use crate::jpgc::JpegConfigBox;
pub use crate::plugin::{EncoderPlugin, PluginStatus};
pub use crate::properties::{
    CleanApertureBox, ColorProfileBox, Fraction, ItemProperty, PixelExtentsBox,
};

pub use zencodec::Cicp;

/// Hard ceiling on the byte length of any single parsed box payload.
///
/// A box declaring a larger payload fails with [`Error::InvalidData`] before
/// any allocation happens, so a maliciously declared huge size cannot turn
/// into an unbounded allocation.
pub const MAX_BOX_PAYLOAD_SIZE: u64 = 512 * 1024 * 1024;

#[doc(hidden)]
pub type TryVec<T> = fallible_collections::TryVec<T>;

// To ensure we don't use stdlib allocating types by accident
#[allow(dead_code)]
struct Vec;
#[allow(dead_code)]
struct Box;
#[allow(dead_code)]
struct HashMap;
#[allow(dead_code)]
struct String;

/// Describes serialization and pipeline failures.
///
/// This enum wraps the standard `io::Error` type, unified with our own
/// framing error states and the status reported by a native encoder backend.
#[derive(Debug)]
pub enum Error {
    /// Malformed or over-limit box framing.
    InvalidData(&'static str),
    /// A box variant or encoding mode not implemented by this codec.
    Unsupported(&'static str),
    /// Reflect `std::io::ErrorKind::UnexpectedEof` for short data.
    UnexpectedEOF,
    /// Propagate underlying errors from `std::io`.
    Io(std::io::Error),
    /// Out of memory
    OutOfMemory,
    /// The native encoder backend reported a non-zero status.
    ///
    /// Code, subcode and message are carried verbatim; nothing is dropped
    /// in translation.
    Plugin(PluginStatus),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let msg = match self {
            Self::InvalidData(s) | Self::Unsupported(s) => s,
            Self::UnexpectedEOF => "EOF",
            Self::Io(err) => return err.fmt(f),
            Self::OutOfMemory => "OOM",
            Self::Plugin(status) => return status.fmt(f),
        };
        f.write_str(msg)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::UnexpectedEof => Self::UnexpectedEOF,
            std::io::ErrorKind::OutOfMemory => Self::OutOfMemory,
            _ => Self::Io(err),
        }
    }
}

impl From<std::num::TryFromIntError> for Error {
    fn from(_: std::num::TryFromIntError) -> Self {
        Self::Unsupported("integer conversion failed")
    }
}

impl From<TryReserveError> for Error {
    fn from(_: TryReserveError) -> Self {
        Self::OutOfMemory
    }
}

impl From<PluginStatus> for Error {
    #[cold]
    fn from(status: PluginStatus) -> Self {
        log::warn!("encoder plugin failed: {status}");
        Self::Plugin(status)
    }
}

/// Result shorthand using our Error enum.
pub type Result<T, E = Error> = std::result::Result<T, E>;
