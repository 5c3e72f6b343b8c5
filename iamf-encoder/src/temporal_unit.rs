//! The temporal-unit assembler.
//!
//! Groups audio frames, parameter blocks, and tick-bound arbitrary OBUs
//! onto the shared time axis. Ordering inside each unit is normative:
//! audio frames by (audio element id, substream id), parameter blocks by
//! parameter id.

use std::collections::BTreeMap;

use crate::data::{AudioFrameWithData, ParameterBlockWithData};
use iamf_core::Result;
use iamf_obu::ArbitraryObu;

/// The OBUs sharing one start timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemporalUnit {
    /// Audio frames, ordered by (audio element id, substream id).
    pub audio_frames: Vec<AudioFrameWithData>,
    /// Parameter blocks, ordered by parameter id.
    pub parameter_blocks: Vec<ParameterBlockWithData>,
    /// Tick-bound arbitrary OBUs, in submission order.
    pub arbitrary_obus: Vec<ArbitraryObu>,
}

/// Temporal units keyed by start timestamp, in emission order.
pub type TemporalUnitMap = BTreeMap<i64, TemporalUnit>;

/// Bucket the data OBUs by timestamp and apply the intra-unit orderings.
///
/// Arbitrary OBUs with a descriptor hook belong to the prologue and are
/// not placed; tick-bound OBUs without an insertion tick are omitted.
pub fn generate_temporal_unit_map(
    audio_frames: Vec<AudioFrameWithData>,
    parameter_blocks: Vec<ParameterBlockWithData>,
    arbitrary_obus: Vec<ArbitraryObu>,
) -> Result<TemporalUnitMap> {
    let mut temporal_unit_map = TemporalUnitMap::new();

    for audio_frame in audio_frames {
        temporal_unit_map
            .entry(audio_frame.start_timestamp)
            .or_default()
            .audio_frames
            .push(audio_frame);
    }
    for parameter_block in parameter_blocks {
        temporal_unit_map
            .entry(parameter_block.start_timestamp)
            .or_default()
            .parameter_blocks
            .push(parameter_block);
    }
    for arbitrary_obu in arbitrary_obus {
        if !arbitrary_obu.insertion_hook.is_tick_bound() {
            continue;
        }
        let Some(insertion_tick) = arbitrary_obu.insertion_tick else {
            continue;
        };
        temporal_unit_map
            .entry(insertion_tick)
            .or_default()
            .arbitrary_obus
            .push(arbitrary_obu);
    }

    for temporal_unit in temporal_unit_map.values_mut() {
        temporal_unit
            .audio_frames
            .sort_by_key(|frame| (frame.audio_element_id, frame.obu.substream_id()));
        temporal_unit
            .parameter_blocks
            .sort_by_key(|block| block.obu.parameter_id);
    }

    Ok(temporal_unit_map)
}
