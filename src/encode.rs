// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The per-image encode pipeline: pixels in, coded bitstream and ordered
//! properties out.

use log::debug;
use std::sync::Arc;
use zencodec::Cicp;

use crate::image::{ColorConverter, ConvertedImage, ImageRole, PixelImage, JPEG_TARGET_NCLX};
use crate::plugin::EncoderPlugin;
use crate::properties::{CleanApertureBox, ColorProfileBox, ItemProperty, PixelExtentsBox};
use crate::{Error, Result, TryVec};

/// User-chosen knobs of the shared cross-codec property policy.
///
/// Which color-profile description ends up attached to the output depends
/// on these together with the image's [`ImageRole`]; the colorimetry of
/// the bitstream itself is fixed (see [`JPEG_TARGET_NCLX`]).
#[derive(Debug, Clone, Copy)]
pub struct EncodingOptions {
    /// Attach the source image's ICC profile when it has one.
    pub save_original_profile: bool,
    /// Attach an 'nclx' description of the coded colorimetry.
    pub write_nclx_profile: bool,
}

impl Default for EncodingOptions {
    fn default() -> Self {
        Self { save_original_profile: true, write_nclx_profile: true }
    }
}

/// Result aggregate of one encode invocation.
///
/// The caller attaches the bitstream and properties into the surrounding
/// container tree; nothing here references that tree. The image handle is
/// shared because sibling pipelines (e.g. thumbnail derivation) may reuse
/// the same converted image.
#[derive(Debug)]
pub struct CodedImageData {
    /// The image that was actually handed to the encoder, after any
    /// colorspace conversion.
    pub image: Arc<PixelImage>,
    /// The accumulated compressed bitstream.
    pub bitstream: TryVec<u8>,
    properties: TryVec<ItemProperty>,
}

impl CodedImageData {
    fn new(image: Arc<PixelImage>) -> Self {
        Self { image, bitstream: TryVec::new(), properties: TryVec::new() }
    }

    /// The descriptive properties, in their semantically ordered sequence.
    pub fn properties(&self) -> &[ItemProperty] {
        &self.properties
    }

    pub fn into_parts(self) -> (Arc<PixelImage>, TryVec<u8>, TryVec<ItemProperty>) {
        (self.image, self.bitstream, self.properties)
    }

    /// Append a property, holding the ordering invariant: a property that
    /// transforms displayed geometry is only legal once pixel extents are
    /// already present.
    pub fn append_property(&mut self, property: ItemProperty) -> Result<()> {
        if property.transforms_geometry()
            && !self.properties.iter().any(|p| matches!(p, ItemProperty::PixelExtents(_)))
        {
            return Err(Error::InvalidData("geometry-transforming property precedes pixel extents"));
        }
        self.properties.push(property)?;
        Ok(())
    }
}

/// Encode one image as a JPEG item: convert colorimetry, run the backend,
/// drain its output, and assemble the descriptive properties.
///
/// Synchronous and single-threaded: the call fully drains one plugin
/// session before returning. The first failure short-circuits the whole
/// call; no partial bitstream or property list is ever returned.
pub fn encode_image_as_jpeg(
    image: &Arc<PixelImage>,
    converter: &dyn ColorConverter,
    plugin: &mut dyn EncoderPlugin,
    options: &EncodingOptions,
    role: ImageRole,
) -> Result<CodedImageData> {
    // JPEG always uses CCIR-601; the bitstream cannot carry anything else.
    let target_nclx = JPEG_TARGET_NCLX;

    // Conversion failures abort before the backend is ever invoked.
    let src_image = match converter.convert_for_encoding(image, &target_nclx)? {
        ConvertedImage::Unchanged => Arc::clone(image),
        ConvertedImage::Converted(converted) => Arc::new(converted),
    };

    let mut coded = CodedImageData::new(Arc::clone(&src_image));

    add_color_profile(image, options, role, &target_nclx, &mut coded)?;

    plugin.encode_image(&src_image, role).map_err(Error::from)?;

    // The backend is a finite lazy producer; the bitstream may arrive in
    // arbitrarily many chunks and must not be pulled past end-of-stream.
    let mut chunks = 0usize;
    while let Some(chunk) = plugin.next_compressed_chunk() {
        coded.bitstream.extend_from_slice(chunk)?;
        chunks += 1;
    }
    debug!("drained {chunks} chunks, {} bitstream bytes", coded.bitstream.len());

    let input_width = src_image.width();
    let input_height = src_image.height();

    // 'ispe' must be before the transformation properties.
    coded.append_property(ItemProperty::PixelExtents(PixelExtentsBox::new(
        input_width,
        input_height,
    )))?;

    let (encoded_width, encoded_height) = if plugin.plugin_api_version() >= 3 {
        plugin.query_encoded_size(input_width, input_height)
    } else {
        (input_width, input_height)
    };

    if input_width != encoded_width || input_height != encoded_height {
        coded.append_property(ItemProperty::CleanAperture(CleanApertureBox::for_encoded_size(
            input_width,
            input_height,
            encoded_width,
            encoded_height,
        )))?;
    }

    Ok(coded)
}

/// Choose which color-profile description(s) the output carries.
///
/// Shared cross-codec policy: an alpha plane has no colorimetry of its
/// own and gets nothing; otherwise the original ICC profile (if present
/// and requested) and the coded 'nclx' description are attached.
fn add_color_profile(
    original: &PixelImage,
    options: &EncodingOptions,
    role: ImageRole,
    target_nclx: &Cicp,
    coded: &mut CodedImageData,
) -> Result<()> {
    if role == ImageRole::Alpha {
        return Ok(());
    }

    if options.save_original_profile {
        if let Some(icc) = original.icc_profile() {
            let mut profile = TryVec::new();
            profile.extend_from_slice(icc)?;
            coded.append_property(ItemProperty::ColorProfile(ColorProfileBox::Icc(profile)))?;
        }
    }

    if options.write_nclx_profile {
        coded.append_property(ItemProperty::ColorProfile(ColorProfileBox::Nclx(*target_nclx)))?;
    }

    Ok(())
}
