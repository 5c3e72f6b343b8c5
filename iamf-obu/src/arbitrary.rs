//! Arbitrary OBU: a user-supplied OBU injected at a named point in the
//! stream.

use iamf_core::{Error, ReadBitBuffer, Result, WriteBitBuffer};

use crate::header::{Obu, ObuHeader};
use crate::types::ObuType;

/// Where in the output stream an arbitrary OBU is spliced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InsertionHook {
    /// Directly after the IA Sequence Header.
    AfterIaSequenceHeader,
    /// After the last Codec Config OBU.
    AfterCodecConfigs,
    /// After the last Audio Element OBU.
    AfterAudioElements,
    /// After the last Mix Presentation OBU.
    AfterMixPresentations,
    /// After the whole descriptor prologue. Not emitted inline; reserved
    /// for container-box tails.
    AfterDescriptors,
    /// Before the parameter blocks of the temporal unit at the insertion
    /// tick.
    BeforeParameterBlocksAtTick,
    /// After the parameter blocks of the temporal unit at the insertion
    /// tick.
    AfterParameterBlocksAtTick,
    /// After the audio frames of the temporal unit at the insertion tick.
    AfterAudioFramesAtTick,
}

impl InsertionHook {
    /// True for hooks that bind to a temporal unit via an insertion tick.
    pub fn is_tick_bound(self) -> bool {
        matches!(
            self,
            InsertionHook::BeforeParameterBlocksAtTick
                | InsertionHook::AfterParameterBlocksAtTick
                | InsertionHook::AfterAudioFramesAtTick
        )
    }
}

/// A user-supplied OBU of any type, carried opaquely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArbitraryObu {
    /// The OBU header; the type is user-chosen.
    pub header: ObuHeader,
    /// The opaque payload.
    pub payload: Vec<u8>,
    /// Where to splice this OBU.
    pub insertion_hook: InsertionHook,
    /// The temporal unit to splice into, for tick-bound hooks.
    pub insertion_tick: Option<i64>,
    /// When set, serialization fails. Exists to construct invalid temporal
    /// units in negative tests.
    pub invalidates_bitstream: bool,
}

impl ArbitraryObu {
    /// Create an arbitrary OBU.
    pub fn new(
        obu_type: ObuType,
        header: ObuHeader,
        payload: Vec<u8>,
        insertion_hook: InsertionHook,
        insertion_tick: Option<i64>,
    ) -> Self {
        Self {
            header: ObuHeader { obu_type, ..header },
            payload,
            insertion_hook,
            insertion_tick,
            invalidates_bitstream: false,
        }
    }

    /// Write every OBU in `obus` whose hook equals `hook`, in order.
    pub fn write_obus_with_hook(
        hook: InsertionHook,
        obus: &[ArbitraryObu],
        wb: &mut WriteBitBuffer,
    ) -> Result<()> {
        for obu in obus.iter().filter(|obu| obu.insertion_hook == hook) {
            obu.validate_and_write(wb)?;
        }
        Ok(())
    }

    /// Read the payload of an arbitrary OBU whose header was already
    /// consumed. The hook is supplied by the caller; it is not on the wire.
    pub fn read_and_validate(
        header: ObuHeader,
        payload_size: usize,
        insertion_hook: InsertionHook,
        insertion_tick: Option<i64>,
        rb: &mut ReadBitBuffer,
    ) -> Result<Self> {
        let mut payload = vec![0u8; payload_size];
        rb.read_uint8_span(&mut payload)?;
        Ok(Self {
            header,
            payload,
            insertion_hook,
            insertion_tick,
            invalidates_bitstream: false,
        })
    }
}

impl Obu for ArbitraryObu {
    fn header(&self) -> &ObuHeader {
        &self.header
    }

    fn validate(&self) -> Result<()> {
        if self.invalidates_bitstream {
            return Err(Error::invalid_argument(
                "Arbitrary OBU is marked as invalidating the bitstream".to_string(),
            ));
        }
        Ok(())
    }

    fn write_payload(&self, wb: &mut WriteBitBuffer) -> Result<()> {
        wb.write_bytes(&self.payload)
    }
}
