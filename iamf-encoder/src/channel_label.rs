//! Channel labels for per-channel sample submission.

use std::fmt;
use std::str::FromStr;

use iamf_core::{Error, Result};

/// A label naming one input channel of an audio element.
///
/// Loudspeaker labels follow the IAMF channel naming (the digit suffix
/// names the layout family); ambisonics channels use ACN numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChannelLabel {
    /// Mono.
    Mono,
    /// Left, stereo pair.
    L2,
    /// Right, stereo pair.
    R2,
    /// Left, 3.1.2.
    L3,
    /// Right, 3.1.2.
    R3,
    /// Centre.
    Centre,
    /// Low-frequency effects.
    Lfe,
    /// Left, 5.1 family.
    L5,
    /// Right, 5.1 family.
    R5,
    /// Left surround, 5.1 family.
    Ls5,
    /// Right surround, 5.1 family.
    Rs5,
    /// Left, 7.1 family.
    L7,
    /// Right, 7.1 family.
    R7,
    /// Left side surround, 7.1 family.
    Lss7,
    /// Right side surround, 7.1 family.
    Rss7,
    /// Left rear surround, 7.1 family.
    Lrs7,
    /// Right rear surround, 7.1 family.
    Rrs7,
    /// Left top front, two-height layouts.
    Ltf2,
    /// Right top front, two-height layouts.
    Rtf2,
    /// Left top front, 3.1.2.
    Ltf3,
    /// Right top front, 3.1.2.
    Rtf3,
    /// Left top front, four-height layouts.
    Ltf4,
    /// Right top front, four-height layouts.
    Rtf4,
    /// Left top back, four-height layouts.
    Ltb4,
    /// Right top back, four-height layouts.
    Rtb4,
    /// Ambisonics channel by ACN index, 0..=24 (up to 4th order).
    Ambisonics(u8),
}

impl ChannelLabel {
    /// The ambisonics label for ACN channel `acn`.
    pub fn ambisonics(acn: u8) -> Result<Self> {
        if acn > 24 {
            return Err(Error::invalid_argument(format!(
                "Ambisonics ACN {acn} exceeds 4th order (24)"
            )));
        }
        Ok(ChannelLabel::Ambisonics(acn))
    }
}

impl fmt::Display for ChannelLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelLabel::Mono => write!(f, "M"),
            ChannelLabel::L2 => write!(f, "L2"),
            ChannelLabel::R2 => write!(f, "R2"),
            ChannelLabel::L3 => write!(f, "L3"),
            ChannelLabel::R3 => write!(f, "R3"),
            ChannelLabel::Centre => write!(f, "C"),
            ChannelLabel::Lfe => write!(f, "LFE"),
            ChannelLabel::L5 => write!(f, "L5"),
            ChannelLabel::R5 => write!(f, "R5"),
            ChannelLabel::Ls5 => write!(f, "Ls5"),
            ChannelLabel::Rs5 => write!(f, "Rs5"),
            ChannelLabel::L7 => write!(f, "L7"),
            ChannelLabel::R7 => write!(f, "R7"),
            ChannelLabel::Lss7 => write!(f, "Lss7"),
            ChannelLabel::Rss7 => write!(f, "Rss7"),
            ChannelLabel::Lrs7 => write!(f, "Lrs7"),
            ChannelLabel::Rrs7 => write!(f, "Rrs7"),
            ChannelLabel::Ltf2 => write!(f, "Ltf2"),
            ChannelLabel::Rtf2 => write!(f, "Rtf2"),
            ChannelLabel::Ltf3 => write!(f, "Ltf3"),
            ChannelLabel::Rtf3 => write!(f, "Rtf3"),
            ChannelLabel::Ltf4 => write!(f, "Ltf4"),
            ChannelLabel::Rtf4 => write!(f, "Rtf4"),
            ChannelLabel::Ltb4 => write!(f, "Ltb4"),
            ChannelLabel::Rtb4 => write!(f, "Rtb4"),
            ChannelLabel::Ambisonics(acn) => write!(f, "A{acn}"),
        }
    }
}

impl FromStr for ChannelLabel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let label = match s {
            "M" | "Mono" => ChannelLabel::Mono,
            "L2" => ChannelLabel::L2,
            "R2" => ChannelLabel::R2,
            "L3" => ChannelLabel::L3,
            "R3" => ChannelLabel::R3,
            "C" => ChannelLabel::Centre,
            "LFE" => ChannelLabel::Lfe,
            "L5" => ChannelLabel::L5,
            "R5" => ChannelLabel::R5,
            "Ls5" => ChannelLabel::Ls5,
            "Rs5" => ChannelLabel::Rs5,
            "L7" => ChannelLabel::L7,
            "R7" => ChannelLabel::R7,
            "Lss7" => ChannelLabel::Lss7,
            "Rss7" => ChannelLabel::Rss7,
            "Lrs7" => ChannelLabel::Lrs7,
            "Rrs7" => ChannelLabel::Rrs7,
            "Ltf2" => ChannelLabel::Ltf2,
            "Rtf2" => ChannelLabel::Rtf2,
            "Ltf3" => ChannelLabel::Ltf3,
            "Rtf3" => ChannelLabel::Rtf3,
            "Ltf4" => ChannelLabel::Ltf4,
            "Rtf4" => ChannelLabel::Rtf4,
            "Ltb4" => ChannelLabel::Ltb4,
            "Rtb4" => ChannelLabel::Rtb4,
            other => {
                if let Some(acn) = other.strip_prefix('A') {
                    let acn: u8 = acn.parse().map_err(|_| {
                        Error::invalid_argument(format!("Unknown channel label {other:?}"))
                    })?;
                    return ChannelLabel::ambisonics(acn);
                }
                return Err(Error::invalid_argument(format!(
                    "Unknown channel label {other:?}"
                )));
            }
        };
        Ok(label)
    }
}
