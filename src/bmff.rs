// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Generic box framing: size-prefixed parse and two-phase write.
//!
//! Every structural element of the container is a box: a header carrying a
//! four-byte type tag and a declared size, followed by the payload. The
//! declared size always equals header length plus payload length. On the
//! write path the payload length is unknown until the payload has been
//! produced, so writing is two-phase: reserve header space, write the
//! payload, backpatch the size ([`BoxWriter::reserve_box_header`] /
//! [`BoxWriter::patch_box_header`]).

use byteorder::{BigEndian, ReadBytesExt};
use log::debug;
use std::fmt;
use std::io::{Read, Take};

use crate::boxes::{BoxType, FourCC};
use crate::{Error, Result, TryVec};

/// Box header: type tag plus declared size.
///
/// See ISO 14496-12:2015 § 4.2.
#[derive(Debug, Clone, Copy)]
pub struct BoxHeader {
    /// Box type.
    pub name: BoxType,
    /// Size of the box in bytes, including the header.
    pub size: u64,
    /// Offset to the start of the contained data (or header size).
    pub offset: u64,
    /// Uuid for extended type.
    pub uuid: Option<[u8; 16]>,
}

impl BoxHeader {
    /// 4-byte size + 4-byte type
    pub const MIN_SIZE: u64 = 8;
    /// 4-byte size + 4-byte type + 8-byte large size
    pub const MIN_LARGE_SIZE: u64 = 16;
    /// Sentinel for a box whose declared size is unspecified (extends to EOF).
    pub const UNSPECIFIED_SIZE: u64 = u64::MAX;

    /// Whether the box declared a concrete size.
    ///
    /// A size-zero box extends to end of file; a bounded read of its payload
    /// cannot be guaranteed, so size-sensitive parsers reject it.
    pub fn has_fixed_size(&self) -> bool {
        self.size != Self::UNSPECIFIED_SIZE
    }
}

/// Read and parse a box header.
///
/// Call this first to determine the type of a particular box and its
/// length. Used for dispatching to specific parsers for the internal
/// content, or to get the length to skip unknown or uninteresting boxes.
pub fn read_box_header<T: ReadBytesExt>(src: &mut T) -> Result<BoxHeader> {
    let size32 = src.read_u32::<BigEndian>()?;
    let name = BoxType::from(src.read_u32::<BigEndian>()?);
    let size = match size32 {
        // Valid only for a top-level box, indicating it's the last box in
        // the file and extends to EOF.
        0 => BoxHeader::UNSPECIFIED_SIZE,
        1 => {
            let size64 = src.read_u64::<BigEndian>()?;
            if size64 < BoxHeader::MIN_LARGE_SIZE {
                return Err(Error::InvalidData("malformed wide size"));
            }
            size64
        },
        _ => {
            if u64::from(size32) < BoxHeader::MIN_SIZE {
                return Err(Error::InvalidData("malformed size"));
            }
            u64::from(size32)
        },
    };
    let mut offset = match size32 {
        1 => BoxHeader::MIN_LARGE_SIZE,
        _ => BoxHeader::MIN_SIZE,
    };
    let uuid = if name == BoxType::UuidBox {
        if size >= offset + 16 {
            let mut buffer = [0u8; 16];
            let count = src.read(&mut buffer)?;
            offset += count as u64;
            if count == 16 {
                Some(buffer)
            } else {
                debug!("malformed uuid (short read), skipping");
                None
            }
        } else {
            debug!("malformed uuid, skipping");
            None
        }
    } else {
        None
    };
    assert!(offset <= size);
    Ok(BoxHeader { name, size, offset, uuid })
}

/// A parsed box header together with its payload bytes, bounded by the
/// declared size.
pub struct BoxReader<'a, T> {
    head: BoxHeader,
    content: Take<&'a mut T>,
}

impl<T: Read> BoxReader<'_, T> {
    /// Read the remaining payload into an exactly-sized buffer.
    ///
    /// The allocation is fallible; callers enforcing a byte ceiling must
    /// check [`bytes_left`](Self::bytes_left) before calling this.
    pub fn read_into_try_vec(&mut self) -> std::io::Result<TryVec<u8>> {
        let limit = self.content.limit();
        // For unspecified-size boxes the limit sits just below u64::MAX
        // (header offset already consumed). Don't pre-reserve those.
        let mut vec = if limit >= u64::MAX - BoxHeader::MIN_LARGE_SIZE {
            std::vec::Vec::new()
        } else {
            let mut v = std::vec::Vec::new();
            v.try_reserve_exact(limit as usize)
                .map_err(|_| std::io::ErrorKind::OutOfMemory)?;
            v
        };
        self.content.read_to_end(&mut vec)?;
        Ok(vec.into())
    }

    /// Unread payload bytes within the declared size.
    pub fn bytes_left(&self) -> u64 {
        self.content.limit()
    }

    pub const fn header(&self) -> &BoxHeader {
        &self.head
    }

    /// Iterate over child boxes contained in this box's payload.
    pub fn box_iter(&mut self) -> BoxIter<'_, Self> {
        BoxIter::new(self)
    }
}

impl<T: Read> Read for BoxReader<'_, T> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.content.read(buf)
    }
}

impl<T> Drop for BoxReader<'_, T> {
    fn drop(&mut self) {
        if self.content.limit() > 0 {
            let name: FourCC = From::from(self.head.name);
            debug!("Dropping {} bytes in '{}'", self.content.limit(), name);
        }
    }
}

/// Pulls boxes one at a time from an underlying reader.
pub struct BoxIter<'a, T> {
    src: &'a mut T,
}

impl<T: Read> BoxIter<'_, T> {
    pub fn new(src: &mut T) -> BoxIter<'_, T> {
        BoxIter { src }
    }

    /// Read the next box header, bounding the returned reader to the
    /// declared payload size. `Ok(None)` at a clean end of stream.
    pub fn next_box(&mut self) -> Result<Option<BoxReader<'_, T>>> {
        let r = read_box_header(self.src);
        match r {
            Ok(h) => Ok(Some(BoxReader {
                head: h,
                content: self.src.take(h.size - h.offset),
            })),
            Err(Error::UnexpectedEOF) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Marks reserved header space awaiting its size backpatch.
///
/// Returned by [`BoxWriter::reserve_box_header`]; must be redeemed with
/// [`BoxWriter::patch_box_header`] once the payload has been written.
#[must_use]
pub struct BoxStart {
    pos: usize,
}

/// Growable byte sink with big-endian primitives and two-phase box framing.
///
/// All growth is fallible; allocation failure surfaces as
/// [`Error::OutOfMemory`] instead of aborting the process.
#[derive(Default)]
pub struct BoxWriter {
    buf: TryVec<u8>,
}

impl BoxWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes written so far.
    pub fn data(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> TryVec<u8> {
        self.buf
    }

    /// Current write position (also the total length).
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    pub fn write_all(&mut self, bytes: &[u8]) -> Result<()> {
        self.buf.extend_from_slice(bytes)?;
        Ok(())
    }

    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        self.write_all(&[v])
    }

    pub fn write_u16(&mut self, v: u16) -> Result<()> {
        self.write_all(&v.to_be_bytes())
    }

    pub fn write_u32(&mut self, v: u32) -> Result<()> {
        self.write_all(&v.to_be_bytes())
    }

    pub fn write_i32(&mut self, v: i32) -> Result<()> {
        self.write_all(&v.to_be_bytes())
    }

    pub fn write_fourcc(&mut self, fourcc: FourCC) -> Result<()> {
        self.write_all(fourcc.as_bytes())
    }

    /// First phase of a box write: reserve space for a compact header at
    /// the current position and record where it went.
    pub fn reserve_box_header(&mut self, name: BoxType) -> Result<BoxStart> {
        let pos = self.position();
        self.write_u32(0)?; // size placeholder
        self.write_u32(u32::from(name))?;
        Ok(BoxStart { pos })
    }

    /// Second phase: backpatch the reserved header with the now-known
    /// total box size.
    ///
    /// Boxes over `u32::MAX` bytes would need the large-size form, which
    /// none of the boxes produced by this codec can reach.
    pub fn patch_box_header(&mut self, start: BoxStart) -> Result<()> {
        let total = self.position() - start.pos;
        debug_assert!(total >= BoxHeader::MIN_SIZE as usize);
        let size =
            u32::try_from(total).map_err(|_| Error::Unsupported("box too large for compact size field"))?;
        self.buf[start.pos..start.pos + 4].copy_from_slice(&size.to_be_bytes());
        Ok(())
    }

    /// Version and flags word of a full box, written at the start of the
    /// payload.
    pub fn write_fullbox_extra(&mut self, version: u8, flags: u32) -> Result<()> {
        debug_assert_eq!(flags >> 24, 0);
        self.write_u32(u32::from(version) << 24 | (flags & 0x00ff_ffff))
    }
}

/// Serialization contract for a box: framing is generic, the payload is not.
///
/// The provided [`write`](Self::write) performs the two-phase framing so
/// implementations only describe their payload. A box is only legal to
/// serialize once its full payload is known.
pub trait WriteBox {
    fn box_type(&self) -> BoxType;

    /// Append the payload bytes (everything after the header).
    fn write_payload(&self, w: &mut BoxWriter) -> Result<()>;

    /// Two-phase framed write: reserve header space, write the payload,
    /// backpatch the size.
    fn write(&self, w: &mut BoxWriter) -> Result<()> {
        let start = w.reserve_box_header(self.box_type())?;
        self.write_payload(w)?;
        w.patch_box_header(start)
    }
}

/// Shared first line of the human-readable box dumps.
pub(crate) fn write_box_summary(f: &mut fmt::Formatter<'_>, name: BoxType) -> fmt::Result {
    writeln!(f, "Box: ----- {name} -----")
}
