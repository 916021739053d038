// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The 'jpgC' JPEG configuration box: an opaque, bounded payload.

use std::fmt;
use std::io::Read;

use crate::bmff::{write_box_summary, BoxReader, BoxWriter, WriteBox};
use crate::boxes::BoxType;
use crate::{Error, Result, TryVec, MAX_BOX_PAYLOAD_SIZE};

/// Opaque JPEG codec configuration ('jpgC').
///
/// The payload is an uninterpreted byte sequence bounded by
/// [`MAX_BOX_PAYLOAD_SIZE`]. Reserved for carrying the JPEG header
/// segments separately from the scan data; the encode pipeline does not
/// currently attach it to the container tree.
#[derive(Debug, Default)]
pub struct JpegConfigBox {
    data: TryVec<u8>,
}

impl JpegConfigBox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Replace the payload. The box becomes legal to serialize.
    pub fn set_data(&mut self, data: TryVec<u8>) {
        self.data = data;
    }

    /// Parse the payload from the remainder of a bounded box range.
    ///
    /// The byte count comes from the declared box size, which is untrusted
    /// input; anything above [`MAX_BOX_PAYLOAD_SIZE`] is rejected before an
    /// allocation is attempted. A zero-length payload is valid.
    pub fn parse<T: Read>(src: &mut BoxReader<'_, T>) -> Result<Self> {
        if !src.header().has_fixed_size() {
            return Err(Error::Unsupported("jpgC box with unspecified size is not supported"));
        }

        let n_bytes = src.bytes_left();
        if n_bytes > MAX_BOX_PAYLOAD_SIZE {
            return Err(Error::InvalidData("jpgC box exceeds maximum size"));
        }

        let data = src.read_into_try_vec()?;
        if data.len() as u64 != n_bytes {
            return Err(Error::UnexpectedEOF);
        }
        Ok(Self { data })
    }
}

impl WriteBox for JpegConfigBox {
    fn box_type(&self) -> BoxType {
        BoxType::JpegConfigBox
    }

    fn write_payload(&self, w: &mut BoxWriter) -> Result<()> {
        w.write_all(&self.data)
    }
}

impl fmt::Display for JpegConfigBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_box_summary(f, self.box_type())?;
        writeln!(f, "num bytes: {}", self.data.len())
    }
}
