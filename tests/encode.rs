// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::borrow::Cow;
use std::sync::Arc;

use zenheif_encode::{
    encode_image_as_jpeg, ChromaFormat, Cicp, ColorConverter, ColorProfileBox, Colorspace,
    ConvertedImage, EncoderPlugin, EncodingOptions, Error, ImageRole, ItemProperty, PixelImage,
    PluginStatus, Result, TryVec, JPEG_TARGET_NCLX,
};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).filter_level(log::LevelFilter::max()).try_init();
}

/// Deterministic encoder backend: emits a fixed chunk sequence and
/// enforces the no-pull-after-end contract.
struct StubPlugin {
    api_version: u32,
    encoded_size: Option<(u32, u32)>,
    chunks: Vec<Vec<u8>>,
    next_chunk: usize,
    finished: bool,
    encode_calls: u32,
    fail_with: Option<PluginStatus>,
}

impl StubPlugin {
    fn new(chunks: &[&[u8]]) -> Self {
        Self {
            api_version: 3,
            encoded_size: None,
            chunks: chunks.iter().map(|c| c.to_vec()).collect(),
            next_chunk: 0,
            finished: false,
            encode_calls: 0,
            fail_with: None,
        }
    }
}

impl EncoderPlugin for StubPlugin {
    fn plugin_api_version(&self) -> u32 {
        self.api_version
    }

    fn encode_image(&mut self, _image: &PixelImage, _role: ImageRole) -> Result<(), PluginStatus> {
        self.encode_calls += 1;
        match &self.fail_with {
            Some(status) => Err(status.clone()),
            None => Ok(()),
        }
    }

    fn next_compressed_chunk(&mut self) -> Option<&[u8]> {
        assert!(!self.finished, "pulled past end-of-stream");
        if self.next_chunk < self.chunks.len() {
            let i = self.next_chunk;
            self.next_chunk += 1;
            Some(self.chunks[i].as_slice())
        } else {
            self.finished = true;
            None
        }
    }

    fn query_encoded_size(&self, input_width: u32, input_height: u32) -> (u32, u32) {
        self.encoded_size.unwrap_or((input_width, input_height))
    }
}

/// Conversion collaborator that reports the input as already conforming.
struct PassThroughConverter;

impl ColorConverter for PassThroughConverter {
    fn convert_for_encoding(&self, _image: &PixelImage, _target: &Cicp) -> Result<ConvertedImage> {
        Ok(ConvertedImage::Unchanged)
    }
}

/// Conversion collaborator that always produces a fresh 4:2:0 image tagged
/// with the target colorimetry.
struct ConvertingConverter;

impl ColorConverter for ConvertingConverter {
    fn convert_for_encoding(&self, image: &PixelImage, target: &Cicp) -> Result<ConvertedImage> {
        let mut out =
            PixelImage::new(image.width(), image.height(), Colorspace::YCbCr, ChromaFormat::C420);
        out.set_nclx(*target);
        Ok(ConvertedImage::Converted(out))
    }
}

struct FailingConverter;

impl ColorConverter for FailingConverter {
    fn convert_for_encoding(&self, _image: &PixelImage, _target: &Cicp) -> Result<ConvertedImage> {
        Err(Error::Unsupported("no conversion path to target"))
    }
}

fn test_image(width: u32, height: u32) -> Arc<PixelImage> {
    Arc::new(PixelImage::new(width, height, Colorspace::YCbCr, ChromaFormat::C420))
}

/// Options that attach no color profiles, leaving only geometry properties.
fn geometry_only() -> EncodingOptions {
    EncodingOptions { save_original_profile: false, write_nclx_profile: false }
}

#[test]
fn padded_encode_emits_size_then_crop() {
    init_logging();
    // 4x3 input, backend pads to 4x4 and emits two chunks.
    let image = test_image(4, 3);
    let mut plugin = StubPlugin::new(&[&[0xFF, 0xD8], &[0xFF, 0xD9]]);
    plugin.encoded_size = Some((4, 4));

    let coded = encode_image_as_jpeg(
        &image,
        &PassThroughConverter,
        &mut plugin,
        &geometry_only(),
        ImageRole::Primary,
    )
    .unwrap();

    assert_eq!(coded.bitstream, [0xFF, 0xD8, 0xFF, 0xD9].as_ref());

    let props = coded.properties();
    assert_eq!(props.len(), 2);
    match &props[0] {
        ItemProperty::PixelExtents(ispe) => {
            assert_eq!((ispe.width, ispe.height), (4, 3));
        },
        other => panic!("expected pixel extents first, got {other:?}"),
    }
    match &props[1] {
        ItemProperty::CleanAperture(clap) => {
            assert_eq!(clap.clean_aperture_width.numerator, 4);
            assert_eq!(clap.clean_aperture_height.numerator, 3);
            assert_eq!(clap.vertical_offset.numerator, -1);
            assert_eq!(clap.vertical_offset.denominator, 2);
        },
        other => panic!("expected clean aperture second, got {other:?}"),
    }
}

#[test]
fn equal_encoded_size_emits_no_crop() {
    init_logging();
    let image = test_image(16, 16);
    let mut plugin = StubPlugin::new(&[&[0x01, 0x02, 0x03]]);
    plugin.encoded_size = Some((16, 16));

    let coded = encode_image_as_jpeg(
        &image,
        &PassThroughConverter,
        &mut plugin,
        &geometry_only(),
        ImageRole::Primary,
    )
    .unwrap();

    assert!(coded.properties().iter().all(|p| !matches!(p, ItemProperty::CleanAperture(_))));
    assert!(coded
        .properties()
        .iter()
        .any(|p| matches!(p, ItemProperty::PixelExtents(_))));
}

#[test]
fn old_plugin_api_skips_encoded_size_query() {
    init_logging();
    let image = test_image(5, 5);
    // Declares padding, but at interface version 2 the capability must be
    // ignored and encoded dimensions assumed equal to the input.
    let mut plugin = StubPlugin::new(&[&[0xAA]]);
    plugin.api_version = 2;
    plugin.encoded_size = Some((6, 6));

    let coded = encode_image_as_jpeg(
        &image,
        &PassThroughConverter,
        &mut plugin,
        &geometry_only(),
        ImageRole::Primary,
    )
    .unwrap();

    assert!(coded.properties().iter().all(|p| !matches!(p, ItemProperty::CleanAperture(_))));
}

#[test]
fn bitstream_is_chunk_concatenation() {
    init_logging();
    let image = test_image(8, 8);
    let mut plugin = StubPlugin::new(&[&[1], &[], &[2, 3], &[4, 5, 6]]);

    let coded = encode_image_as_jpeg(
        &image,
        &PassThroughConverter,
        &mut plugin,
        &geometry_only(),
        ImageRole::Primary,
    )
    .unwrap();

    assert_eq!(coded.bitstream, [1, 2, 3, 4, 5, 6].as_ref());
    assert!(plugin.finished);
}

#[test]
fn plugin_failure_is_carried_verbatim() {
    init_logging();
    let image = test_image(8, 8);
    let status = PluginStatus { code: 5, subcode: 17, message: Cow::Borrowed("simulated failure") };
    let mut plugin = StubPlugin::new(&[&[0xFF]]);
    plugin.fail_with = Some(status.clone());

    let err = encode_image_as_jpeg(
        &image,
        &PassThroughConverter,
        &mut plugin,
        &geometry_only(),
        ImageRole::Primary,
    )
    .unwrap_err();

    match err {
        Error::Plugin(reported) => assert_eq!(reported, status),
        other => panic!("expected plugin error, got {other:?}"),
    }
    // Fatal status means no bitstream was ever pulled.
    assert_eq!(plugin.next_chunk, 0);
    assert!(!plugin.finished);
}

#[test]
fn conversion_failure_short_circuits_before_encode() {
    init_logging();
    let image = test_image(8, 8);
    let mut plugin = StubPlugin::new(&[&[0xFF]]);

    let err = encode_image_as_jpeg(
        &image,
        &FailingConverter,
        &mut plugin,
        &geometry_only(),
        ImageRole::Primary,
    )
    .unwrap_err();

    assert!(matches!(err, Error::Unsupported("no conversion path to target")));
    assert_eq!(plugin.encode_calls, 0);
}

#[test]
fn unchanged_conversion_shares_the_input_image() {
    init_logging();
    let image = test_image(8, 8);
    let mut plugin = StubPlugin::new(&[&[0xFF]]);

    let coded = encode_image_as_jpeg(
        &image,
        &PassThroughConverter,
        &mut plugin,
        &geometry_only(),
        ImageRole::Primary,
    )
    .unwrap();

    assert!(Arc::ptr_eq(&coded.image, &image));
}

#[test]
fn converted_image_is_a_fresh_allocation() {
    init_logging();
    let image = test_image(8, 8);
    let mut plugin = StubPlugin::new(&[&[0xFF]]);

    let coded = encode_image_as_jpeg(
        &image,
        &ConvertingConverter,
        &mut plugin,
        &geometry_only(),
        ImageRole::Primary,
    )
    .unwrap();

    assert!(!Arc::ptr_eq(&coded.image, &image));
    assert_eq!(coded.image.nclx(), Some(&JPEG_TARGET_NCLX));
}

#[test]
fn default_options_attach_target_nclx() {
    init_logging();
    let image = test_image(8, 8);
    let mut plugin = StubPlugin::new(&[&[0xFF]]);

    let coded = encode_image_as_jpeg(
        &image,
        &PassThroughConverter,
        &mut plugin,
        &EncodingOptions::default(),
        ImageRole::Primary,
    )
    .unwrap();

    let nclx = coded.properties().iter().find_map(|p| match p {
        ItemProperty::ColorProfile(ColorProfileBox::Nclx(cicp)) => Some(*cicp),
        _ => None,
    });
    assert_eq!(nclx, Some(JPEG_TARGET_NCLX));
}

#[test]
fn original_icc_profile_is_preserved() {
    init_logging();
    let mut image = PixelImage::new(8, 8, Colorspace::YCbCr, ChromaFormat::C420);
    let mut icc = TryVec::new();
    icc.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
    image.set_icc_profile(icc);
    let image = Arc::new(image);
    let mut plugin = StubPlugin::new(&[&[0xFF]]);

    let coded = encode_image_as_jpeg(
        &image,
        &PassThroughConverter,
        &mut plugin,
        &EncodingOptions::default(),
        ImageRole::Primary,
    )
    .unwrap();

    let icc = coded.properties().iter().find_map(|p| match p {
        ItemProperty::ColorProfile(ColorProfileBox::Icc(bytes)) => Some(&bytes[..]),
        _ => None,
    });
    assert_eq!(icc, Some(&[0xDE, 0xAD, 0xBE, 0xEF][..]));
}

#[test]
fn alpha_role_gets_no_color_profile() {
    init_logging();
    let mut image = PixelImage::new(8, 8, Colorspace::Monochrome, ChromaFormat::Monochrome);
    let mut icc = TryVec::new();
    icc.extend_from_slice(&[1, 2, 3]).unwrap();
    image.set_icc_profile(icc);
    let image = Arc::new(image);
    let mut plugin = StubPlugin::new(&[&[0xFF]]);

    let coded = encode_image_as_jpeg(
        &image,
        &PassThroughConverter,
        &mut plugin,
        &EncodingOptions::default(),
        ImageRole::Alpha,
    )
    .unwrap();

    assert!(coded
        .properties()
        .iter()
        .all(|p| !matches!(p, ItemProperty::ColorProfile(_))));
}
