//! Shared OBU type taxonomy and profile versions.

use iamf_core::{Error, Result};

/// The 5-bit `obu_type` codes of the IAMF wire format.
///
/// Audio frames for substream ids 0..=17 have dedicated codes that encode
/// the substream id implicitly; the generic [`ObuType::AudioFrame`] carries
/// an explicit ULEB128 substream id in its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObuType {
    /// Codec Config OBU.
    CodecConfig,
    /// Audio Element OBU.
    AudioElement,
    /// Mix Presentation OBU.
    MixPresentation,
    /// Parameter Block OBU.
    ParameterBlock,
    /// Temporal Delimiter OBU.
    TemporalDelimiter,
    /// Audio Frame OBU with an explicit substream id.
    AudioFrame,
    /// Audio Frame OBU with substream id implied by the type code (0..=17).
    AudioFrameId(u8),
    /// Reserved type codes 24..=30.
    Reserved(u8),
    /// IA Sequence Header OBU.
    IaSequenceHeader,
}

impl ObuType {
    /// The raw 5-bit code for this type.
    pub fn to_code(self) -> u8 {
        match self {
            ObuType::CodecConfig => 0,
            ObuType::AudioElement => 1,
            ObuType::MixPresentation => 2,
            ObuType::ParameterBlock => 3,
            ObuType::TemporalDelimiter => 4,
            ObuType::AudioFrame => 5,
            ObuType::AudioFrameId(id) => 6 + id,
            ObuType::Reserved(code) => code,
            ObuType::IaSequenceHeader => 31,
        }
    }

    /// Interpret a raw 5-bit code.
    pub fn from_code(code: u8) -> Result<Self> {
        match code {
            0 => Ok(ObuType::CodecConfig),
            1 => Ok(ObuType::AudioElement),
            2 => Ok(ObuType::MixPresentation),
            3 => Ok(ObuType::ParameterBlock),
            4 => Ok(ObuType::TemporalDelimiter),
            5 => Ok(ObuType::AudioFrame),
            6..=23 => Ok(ObuType::AudioFrameId(code - 6)),
            24..=30 => Ok(ObuType::Reserved(code)),
            31 => Ok(ObuType::IaSequenceHeader),
            _ => Err(Error::invalid_argument(format!(
                "obu_type code {code} does not fit in 5 bits"
            ))),
        }
    }

    /// True for the explicit and implicit audio frame types.
    pub fn is_audio_frame(self) -> bool {
        matches!(self, ObuType::AudioFrame | ObuType::AudioFrameId(_))
    }
}

/// A profile version carried in the IA Sequence Header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileVersion {
    /// Simple profile: one audio element per mix presentation.
    Simple,
    /// Base profile: up to two audio elements per mix presentation.
    Base,
    /// Base-Enhanced profile: up to 28 audio elements per mix presentation.
    BaseEnhanced,
    /// A profile this implementation does not know. Legal as an additional
    /// profile for forward compatibility; never legal as primary.
    Unknown(u8),
}

impl ProfileVersion {
    /// The raw wire value.
    pub fn to_u8(self) -> u8 {
        match self {
            ProfileVersion::Simple => 0,
            ProfileVersion::Base => 1,
            ProfileVersion::BaseEnhanced => 2,
            ProfileVersion::Unknown(value) => value,
        }
    }

    /// Interpret a raw wire value.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => ProfileVersion::Simple,
            1 => ProfileVersion::Base,
            2 => ProfileVersion::BaseEnhanced,
            other => ProfileVersion::Unknown(other),
        }
    }

    /// Maximum number of audio elements a single sub-mix may bind under
    /// this profile. Unknown profiles admit nothing.
    pub fn max_audio_elements_per_mix(self) -> usize {
        match self {
            ProfileVersion::Simple => 1,
            ProfileVersion::Base => 2,
            ProfileVersion::BaseEnhanced => 28,
            ProfileVersion::Unknown(_) => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_obu_type_codes_round_trip() {
        for code in 0..=31u8 {
            let obu_type = ObuType::from_code(code).unwrap();
            assert_eq!(obu_type.to_code(), code);
        }
        assert!(ObuType::from_code(32).is_err());
    }

    #[test]
    fn test_implicit_audio_frame_codes() {
        assert_eq!(ObuType::AudioFrameId(0).to_code(), 6);
        assert_eq!(ObuType::AudioFrameId(17).to_code(), 23);
        assert!(ObuType::AudioFrameId(17).is_audio_frame());
        assert!(ObuType::AudioFrame.is_audio_frame());
        assert!(!ObuType::CodecConfig.is_audio_frame());
    }

    #[test]
    fn test_sequence_header_code() {
        assert_eq!(ObuType::IaSequenceHeader.to_code(), 31);
    }

    #[test]
    fn test_profile_capacity() {
        assert_eq!(ProfileVersion::Simple.max_audio_elements_per_mix(), 1);
        assert_eq!(ProfileVersion::Base.max_audio_elements_per_mix(), 2);
        assert_eq!(ProfileVersion::BaseEnhanced.max_audio_elements_per_mix(), 28);
        assert_eq!(ProfileVersion::Unknown(9).max_audio_elements_per_mix(), 0);
    }
}
