// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Box type tags, ISO 14496-12:2015 § 4.2.

use std::fmt;

/// A four-character box type code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCC([u8; 4]);

impl FourCC {
    pub const fn from_bytes(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    pub const fn value(self) -> u32 {
        u32::from_be_bytes(self.0)
    }

    pub const fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }
}

impl From<u32> for FourCC {
    fn from(number: u32) -> Self {
        Self(number.to_be_bytes())
    }
}

impl From<[u8; 4]> for FourCC {
    fn from(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }
}

impl From<BoxType> for FourCC {
    fn from(name: BoxType) -> Self {
        Self::from(u32::from(name))
    }
}

impl fmt::Display for FourCC {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(s) if self.0.iter().all(|c| c.is_ascii_graphic() || *c == b' ') => f.write_str(s),
            _ => write!(f, "{:#010x}", self.value()),
        }
    }
}

macro_rules! box_database {
    ($($(#[$attr:meta])* $boxenum:ident $boxtype:expr),+ $(,)?) => {
        /// The box types this crate knows how to produce or interpret.
        ///
        /// Unrecognized types are preserved, not rejected; generic framing
        /// still applies to them.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum BoxType {
            $($(#[$attr])* $boxenum,)*
            UnknownBox(u32),
        }

        impl From<u32> for BoxType {
            fn from(t: u32) -> Self {
                match t {
                    $($boxtype => Self::$boxenum,)*
                    _ => Self::UnknownBox(t),
                }
            }
        }

        impl From<BoxType> for u32 {
            fn from(t: BoxType) -> Self {
                match t {
                    $(BoxType::$boxenum => $boxtype,)*
                    BoxType::UnknownBox(t) => t,
                }
            }
        }
    }
}

box_database!(
    /// "jpgC": opaque JPEG codec configuration payload.
    JpegConfigBox 0x6a70_6743,
    /// "ispe": image spatial extents (width/height) property.
    ImageSpatialExtentsProperty 0x6973_7065,
    /// "clap": clean aperture property.
    CleanApertureBox 0x636c_6170,
    /// "colr": colour information property.
    ColorInformationBox 0x636f_6c72,
    /// "uuid": box with an extended 16-byte type.
    UuidBox 0x7575_6964,
);

impl fmt::Display for BoxType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        FourCC::from(*self).fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fourcc_round_trips_through_u32() {
        assert_eq!(BoxType::from(0x6a70_6743), BoxType::JpegConfigBox);
        assert_eq!(u32::from(BoxType::JpegConfigBox), 0x6a70_6743);
        assert_eq!(FourCC::from(BoxType::JpegConfigBox).as_bytes(), b"jpgC");
    }

    #[test]
    fn unknown_types_are_preserved() {
        let t = BoxType::from(0x7465_7374); // "test"
        assert_eq!(t, BoxType::UnknownBox(0x7465_7374));
        assert_eq!(FourCC::from(t).as_bytes(), b"test");
    }
}
