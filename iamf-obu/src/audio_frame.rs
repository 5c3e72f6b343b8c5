//! Audio Frame OBU.

use iamf_core::{DecodedUleb128, Error, ReadBitBuffer, Result, WriteBitBuffer};

use crate::header::{Obu, ObuHeader};
use crate::types::ObuType;

/// The largest substream id that can be encoded implicitly in the OBU type.
const MAX_IMPLICIT_SUBSTREAM_ID: DecodedUleb128 = 17;

/// Audio Frame OBU: an opaque coded frame for one substream.
///
/// Substream ids 0..=17 are folded into the OBU type; larger ids use the
/// generic type with an explicit ULEB128 id field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioFrameObu {
    /// The OBU header, carrying the trim counters when signalled.
    pub header: ObuHeader,
    audio_substream_id: DecodedUleb128,
    /// The coded frame bytes, opaque to the OBU layer.
    pub audio_frame: Vec<u8>,
}

impl AudioFrameObu {
    /// Create an audio frame OBU. The header's type is forced to the
    /// implicit-id variant when the substream id permits.
    pub fn new(
        header: ObuHeader,
        audio_substream_id: DecodedUleb128,
        audio_frame: Vec<u8>,
    ) -> Self {
        let obu_type = if audio_substream_id <= MAX_IMPLICIT_SUBSTREAM_ID {
            ObuType::AudioFrameId(audio_substream_id as u8)
        } else {
            ObuType::AudioFrame
        };
        Self {
            header: ObuHeader { obu_type, ..header },
            audio_substream_id,
            audio_frame,
        }
    }

    /// The substream this frame belongs to.
    pub fn substream_id(&self) -> DecodedUleb128 {
        self.audio_substream_id
    }

    /// Samples of this frame that survive trimming, given the frame size
    /// declared by the codec config.
    pub fn num_untrimmed_samples(&self, num_samples_per_frame: DecodedUleb128) -> u32 {
        num_samples_per_frame
            .saturating_sub(self.header.num_samples_to_trim_at_start)
            .saturating_sub(self.header.num_samples_to_trim_at_end)
    }

    /// Read the payload of an audio frame OBU whose header was already
    /// consumed. `payload_size` is the byte count reported by the header.
    pub fn read_and_validate(
        header: ObuHeader,
        payload_size: usize,
        rb: &mut ReadBitBuffer,
    ) -> Result<Self> {
        let (audio_substream_id, id_size) = match header.obu_type {
            ObuType::AudioFrameId(id) => (DecodedUleb128::from(id), 0),
            ObuType::AudioFrame => {
                let (id, size) = rb.read_uleb128_with_size()?;
                (id, size)
            }
            other => {
                return Err(Error::invalid_argument(format!(
                    "{other:?} is not an audio frame type"
                )))
            }
        };
        let frame_size = payload_size.checked_sub(id_size).ok_or_else(|| {
            Error::invalid_argument(
                "Audio frame payload is smaller than its substream id field".to_string(),
            )
        })?;
        let mut audio_frame = vec![0u8; frame_size];
        rb.read_uint8_span(&mut audio_frame)?;
        Ok(Self {
            header,
            audio_substream_id,
            audio_frame,
        })
    }
}

impl Obu for AudioFrameObu {
    fn header(&self) -> &ObuHeader {
        &self.header
    }

    fn validate(&self) -> Result<()> {
        match self.header.obu_type {
            ObuType::AudioFrame => {
                if self.audio_substream_id <= MAX_IMPLICIT_SUBSTREAM_ID {
                    return Err(Error::invalid_argument(format!(
                        "Substream id {} must use the implicit audio frame type",
                        self.audio_substream_id
                    )));
                }
                Ok(())
            }
            ObuType::AudioFrameId(id) => {
                if DecodedUleb128::from(id) != self.audio_substream_id {
                    return Err(Error::invalid_argument(format!(
                        "Implicit type id {id} disagrees with substream id {}",
                        self.audio_substream_id
                    )));
                }
                Ok(())
            }
            other => Err(Error::invalid_argument(format!(
                "{other:?} is not an audio frame type"
            ))),
        }
    }

    fn write_payload(&self, wb: &mut WriteBitBuffer) -> Result<()> {
        if self.header.obu_type == ObuType::AudioFrame {
            wb.write_uleb128(self.audio_substream_id)?;
        }
        wb.write_bytes(&self.audio_frame)
    }
}
