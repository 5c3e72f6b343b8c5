//! Collaborator traits at the edge of the core: audio codecs, renderers,
//! and loudness calculators.
//!
//! Factories return `Option`; the core treats absence as an opaque
//! (`Unknown`) failure when the collaborator was required.

use iamf_core::Result;
use iamf_obu::{CodecConfig, Layout, LoudnessInfo, MixPresentationLayout};

use crate::data::InternalSampleType;

/// A per-substream audio codec.
///
/// Frames are time-major: `samples[t]` holds one sample per channel of the
/// substream.
pub trait AudioCodec: Send {
    /// Encode one frame of samples into an opaque payload.
    fn encode_frame(&mut self, samples: &[Vec<InternalSampleType>]) -> Result<Vec<u8>>;

    /// Decode an opaque payload back into time-major samples.
    fn decode_frame(&mut self, payload: &[u8]) -> Result<Vec<Vec<InternalSampleType>>>;

    /// Samples per frame this codec was configured for.
    fn num_samples_per_frame(&self) -> u32;
}

/// Creates one codec per substream.
pub trait AudioCodecFactory {
    /// Create a codec for a substream with `num_channels` channels coded
    /// under `codec_config`. Returns `None` when the codec is unsupported.
    fn create(&self, codec_config: &CodecConfig, num_channels: usize)
        -> Option<Box<dyn AudioCodec>>;
}

/// Renders an audio element's labeled channels to a playback layout.
pub trait Renderer: Send {
    /// Render time-major labeled samples to the layout's channel order.
    fn render(
        &mut self,
        samples: &[Vec<InternalSampleType>],
    ) -> Result<Vec<Vec<InternalSampleType>>>;
}

/// Creates renderers per mix-presentation layout.
pub trait RendererFactory {
    /// Create a renderer targeting `layout`. Returns `None` when the
    /// layout cannot be rendered.
    fn create(&self, layout: &Layout) -> Option<Box<dyn Renderer>>;
}

/// Accumulates rendered samples and measures loudness.
pub trait LoudnessCalculator: Send {
    /// Feed one temporal unit of rendered samples.
    fn accumulate(&mut self, rendered_samples: &[Vec<InternalSampleType>]) -> Result<()>;

    /// Produce the measured loudness for the accumulated stream.
    fn finalize(&self) -> Result<LoudnessInfo>;
}

/// Creates loudness calculators per mix-presentation layout.
pub trait LoudnessCalculatorFactory {
    /// Create a calculator for `layout` at `rendered_sample_rate`.
    /// Returns `None` when measurement is unsupported for the layout.
    fn create(
        &self,
        layout: &MixPresentationLayout,
        rendered_sample_rate: u32,
    ) -> Option<Box<dyn LoudnessCalculator>>;
}
