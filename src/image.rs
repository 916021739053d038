// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Immutable pixel image snapshots and the color-conversion seam.

use arrayvec::ArrayVec;
use zencodec::Cicp;

use crate::{Error, Result, TryVec};

/// The colorimetry every JPEG bitstream produced by this codec uses.
///
/// The wrapped bitstream format cannot represent arbitrary colorimetry, so
/// this is not user-configurable: BT.601 matrix, primaries and transfer,
/// full range.
pub const JPEG_TARGET_NCLX: Cicp = Cicp::new(6, 6, 6, true);

/// How an image participates in the container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRole {
    /// The primary image item.
    Primary,
    /// A reduced-resolution derivative of another item.
    Thumbnail,
    /// An auxiliary alpha plane.
    Alpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colorspace {
    Rgb,
    YCbCr,
    Monochrome,
}

/// Chroma subsampling layout of a [`Colorspace::YCbCr`] image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChromaFormat {
    C420,
    C422,
    C444,
    Monochrome,
}

/// One channel of pixel data.
#[derive(Debug)]
pub struct Plane {
    pub width: u32,
    pub height: u32,
    /// Bytes per row; at least `width` for 8-bit data.
    pub stride: usize,
    pub data: TryVec<u8>,
}

/// An immutable snapshot of a decoded image, as handed to the encode
/// pipeline.
///
/// The image is read-only for the duration of an encode call. The same
/// snapshot may be shared (via `Arc`) between sibling pipelines, e.g. when
/// a thumbnail is derived from the primary image.
#[derive(Debug)]
pub struct PixelImage {
    width: u32,
    height: u32,
    colorspace: Colorspace,
    chroma: ChromaFormat,
    nclx: Option<Cicp>,
    icc_profile: Option<TryVec<u8>>,
    planes: ArrayVec<Plane, 4>,
}

impl PixelImage {
    pub fn new(width: u32, height: u32, colorspace: Colorspace, chroma: ChromaFormat) -> Self {
        Self {
            width,
            height,
            colorspace,
            chroma,
            nclx: None,
            icc_profile: None,
            planes: ArrayVec::new(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn colorspace(&self) -> Colorspace {
        self.colorspace
    }

    pub fn chroma_format(&self) -> ChromaFormat {
        self.chroma
    }

    /// The NCLX description of the pixel data, if one is known.
    pub fn nclx(&self) -> Option<&Cicp> {
        self.nclx.as_ref()
    }

    pub fn set_nclx(&mut self, nclx: Cicp) {
        self.nclx = Some(nclx);
    }

    /// The embedded ICC profile of the source, if any.
    pub fn icc_profile(&self) -> Option<&[u8]> {
        self.icc_profile.as_deref()
    }

    pub fn set_icc_profile(&mut self, profile: TryVec<u8>) {
        self.icc_profile = Some(profile);
    }

    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    /// Attach a channel plane. At most four planes fit an image.
    pub fn add_plane(&mut self, plane: Plane) -> Result<()> {
        self.planes
            .try_push(plane)
            .map_err(|_| Error::InvalidData("too many image planes"))
    }

    /// Whether the pixel data already conforms to the given target
    /// colorimetry and chroma layout, making conversion a no-op.
    pub fn matches_target(&self, target: &Cicp, chroma: ChromaFormat) -> bool {
        self.chroma == chroma && self.nclx.as_ref() == Some(target)
    }
}

/// Outcome of a conversion request: either the input already conformed, or
/// a newly allocated image in the target space.
///
/// The marker makes shared-pointer aliasing explicit: the caller always
/// knows whether a copy occurred.
#[derive(Debug)]
pub enum ConvertedImage {
    /// The input image already conforms; no copy was made.
    Unchanged,
    /// A new, exclusively owned image in the target space.
    Converted(PixelImage),
}

/// Colorspace/chroma conversion collaborator.
///
/// The conversion algorithm itself lives outside this crate. The pipeline
/// calls this exactly once per encode, before the encoder backend is
/// invoked; a conversion failure aborts the encode and is returned
/// verbatim.
pub trait ColorConverter {
    /// Produce `image` in the target colorimetry and a chroma layout the
    /// encoder accepts, or report [`ConvertedImage::Unchanged`] if it
    /// already conforms.
    fn convert_for_encoding(&self, image: &PixelImage, target: &Cicp) -> Result<ConvertedImage>;
}
