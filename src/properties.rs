// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Descriptive item properties emitted alongside a coded image.
//!
//! Property order is load-bearing for downstream geometry reconstruction:
//! 'ispe' must precede any property that further transforms displayed
//! geometry, 'clap' included. See [`ItemProperty::transforms_geometry`].

use std::fmt;
use zencodec::Cicp;

use crate::bmff::{write_box_summary, BoxWriter, WriteBox};
use crate::boxes::{BoxType, FourCC};
use crate::{Result, TryVec};

/// Exact rational, as used by the clean-aperture box.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fraction {
    pub numerator: i32,
    pub denominator: u32,
}

impl Fraction {
    pub const fn new(numerator: i32, denominator: u32) -> Self {
        Self { numerator, denominator }
    }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Image spatial extents property 'ispe' (full box, version 0).
///
/// Records the pre-encode pixel width and height of an image item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelExtentsBox {
    pub width: u32,
    pub height: u32,
}

impl PixelExtentsBox {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl WriteBox for PixelExtentsBox {
    fn box_type(&self) -> BoxType {
        BoxType::ImageSpatialExtentsProperty
    }

    fn write_payload(&self, w: &mut BoxWriter) -> Result<()> {
        w.write_fullbox_extra(0, 0)?;
        w.write_u32(self.width)?;
        w.write_u32(self.height)
    }
}

impl fmt::Display for PixelExtentsBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_box_summary(f, self.box_type())?;
        writeln!(f, "image width: {}", self.width)?;
        writeln!(f, "image height: {}", self.height)
    }
}

/// Clean aperture property 'clap'.
///
/// Maps a padded encoded raster back to the geometry that was requested,
/// so a decoder can recover the original extent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanApertureBox {
    pub clean_aperture_width: Fraction,
    pub clean_aperture_height: Fraction,
    pub horizontal_offset: Fraction,
    pub vertical_offset: Fraction,
}

impl CleanApertureBox {
    /// Aperture recovering `input_width` × `input_height` from a raster the
    /// encoder padded to `encoded_width` × `encoded_height`.
    ///
    /// Offsets center the aperture: −(encoded − input)/2 on each axis.
    pub fn for_encoded_size(
        input_width: u32,
        input_height: u32,
        encoded_width: u32,
        encoded_height: u32,
    ) -> Self {
        Self {
            clean_aperture_width: Fraction::new(input_width as i32, 1),
            clean_aperture_height: Fraction::new(input_height as i32, 1),
            horizontal_offset: Fraction::new(-(encoded_width.wrapping_sub(input_width) as i32), 2),
            vertical_offset: Fraction::new(-(encoded_height.wrapping_sub(input_height) as i32), 2),
        }
    }
}

impl WriteBox for CleanApertureBox {
    fn box_type(&self) -> BoxType {
        BoxType::CleanApertureBox
    }

    fn write_payload(&self, w: &mut BoxWriter) -> Result<()> {
        for fraction in [
            self.clean_aperture_width,
            self.clean_aperture_height,
            self.horizontal_offset,
            self.vertical_offset,
        ] {
            w.write_i32(fraction.numerator)?;
            w.write_u32(fraction.denominator)?;
        }
        Ok(())
    }
}

impl fmt::Display for CleanApertureBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_box_summary(f, self.box_type())?;
        writeln!(
            f,
            "clean aperture: {} x {} at ({}, {})",
            self.clean_aperture_width,
            self.clean_aperture_height,
            self.horizontal_offset,
            self.vertical_offset
        )
    }
}

/// Colour information property 'colr'.
#[derive(Debug)]
pub enum ColorProfileBox {
    /// NCLX colour description ('nclx' colour type).
    Nclx(Cicp),
    /// Raw ICC profile bytes ('prof' colour type).
    Icc(TryVec<u8>),
}

impl ColorProfileBox {
    const NCLX: FourCC = FourCC::from_bytes(*b"nclx");
    const PROF: FourCC = FourCC::from_bytes(*b"prof");
}

impl WriteBox for ColorProfileBox {
    fn box_type(&self) -> BoxType {
        BoxType::ColorInformationBox
    }

    fn write_payload(&self, w: &mut BoxWriter) -> Result<()> {
        match self {
            Self::Nclx(cicp) => {
                w.write_fourcc(Self::NCLX)?;
                w.write_u16(u16::from(cicp.color_primaries))?;
                w.write_u16(u16::from(cicp.transfer_characteristics))?;
                w.write_u16(u16::from(cicp.matrix_coefficients))?;
                w.write_u8(u8::from(cicp.full_range) << 7)
            },
            Self::Icc(profile) => {
                w.write_fourcc(Self::PROF)?;
                w.write_all(profile)
            },
        }
    }
}

impl fmt::Display for ColorProfileBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_box_summary(f, self.box_type())?;
        match self {
            Self::Nclx(cicp) => writeln!(
                f,
                "nclx: primaries {}, transfer {}, matrix {}, full range {}",
                cicp.color_primaries,
                cicp.transfer_characteristics,
                cicp.matrix_coefficients,
                cicp.full_range
            ),
            Self::Icc(profile) => writeln!(f, "icc profile: {} bytes", profile.len()),
        }
    }
}

/// A descriptive property attached to a coded image item.
#[derive(Debug)]
pub enum ItemProperty {
    PixelExtents(PixelExtentsBox),
    CleanAperture(CleanApertureBox),
    ColorProfile(ColorProfileBox),
}

impl ItemProperty {
    /// Whether this property transforms the displayed geometry.
    ///
    /// Transforming properties must come after the 'ispe' extents in an
    /// item's property sequence; any future geometry-affecting property
    /// must return true here to keep that ordering enforced.
    pub fn transforms_geometry(&self) -> bool {
        match self {
            Self::CleanAperture(_) => true,
            Self::PixelExtents(_) | Self::ColorProfile(_) => false,
        }
    }
}

impl WriteBox for ItemProperty {
    fn box_type(&self) -> BoxType {
        match self {
            Self::PixelExtents(b) => b.box_type(),
            Self::CleanAperture(b) => b.box_type(),
            Self::ColorProfile(b) => b.box_type(),
        }
    }

    fn write_payload(&self, w: &mut BoxWriter) -> Result<()> {
        match self {
            Self::PixelExtents(b) => b.write_payload(w),
            Self::CleanAperture(b) => b.write_payload(w),
            Self::ColorProfile(b) => b.write_payload(w),
        }
    }
}

impl fmt::Display for ItemProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PixelExtents(b) => b.fmt(f),
            Self::CleanAperture(b) => b.fmt(f),
            Self::ColorProfile(b) => b.fmt(f),
        }
    }
}
