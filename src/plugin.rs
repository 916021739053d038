// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! The consumed interface of a native encoder backend.

use std::borrow::Cow;
use std::fmt;

use crate::image::{ImageRole, PixelImage};

/// Status reported by a native encoder backend.
///
/// Mirrors the backend's own status struct field for field; code, subcode
/// and message are carried verbatim so nothing is lost between the backend
/// and the caller's error report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginStatus {
    pub code: u32,
    pub subcode: u32,
    pub message: Cow<'static, str>,
}

impl fmt::Display for PluginStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "encoder error {}.{}: {}", self.code, self.subcode, self.message)
    }
}

/// A pluggable native encoder backend.
///
/// One implementation exists per supported backend; the embedding
/// application selects one at configuration time, not per call. A single
/// instance must be driven by exactly one caller at a time — instances are
/// not assumed reentrant or thread-safe, which `&mut self` on the stateful
/// operations makes a compile-time fact.
///
/// An encode session is: one [`encode_image`](Self::encode_image) call,
/// then [`next_compressed_chunk`](Self::next_compressed_chunk) pulls until
/// the first `None`. The chunk producer is finite and non-restartable;
/// pulling again after `None` is a contract violation, not a supported
/// way to restart the session.
pub trait EncoderPlugin {
    /// Version of the backend interface this plugin implements.
    ///
    /// Version 3 added [`query_encoded_size`](Self::query_encoded_size);
    /// the pipeline only consults it on plugins declaring at least that.
    fn plugin_api_version(&self) -> u32;

    /// Compress `image` in a single synchronous call.
    ///
    /// A returned [`PluginStatus`] is fatal for the session; no compressed
    /// data may be pulled afterwards.
    fn encode_image(&mut self, image: &PixelImage, role: ImageRole) -> Result<(), PluginStatus>;

    /// Pull the next chunk of compressed bytes, or `None` at end of
    /// stream.
    ///
    /// The returned slice is only valid until the next call on the plugin.
    /// Callers must not call this again after it returns `None`.
    fn next_compressed_chunk(&mut self) -> Option<&[u8]>;

    /// The raster dimensions the backend will actually encode for a
    /// requested input size, e.g. after padding to even dimensions.
    ///
    /// Only meaningful when [`plugin_api_version`](Self::plugin_api_version)
    /// is at least 3; older backends encode at the requested size and keep
    /// this default.
    fn query_encoded_size(&self, input_width: u32, input_height: u32) -> (u32, u32) {
        (input_width, input_height)
    }
}
