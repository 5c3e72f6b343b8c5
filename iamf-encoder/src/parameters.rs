//! The parameter engine: collection, equivalence checking, and per-id
//! metadata resolution.

use std::collections::BTreeMap;

use tracing::warn;

use iamf_core::{DecodedUleb128, Error, Result};
use iamf_obu::param_definitions::ParamDefinitionType;
use iamf_obu::{
    AudioElementParam, MixPresentationObu, ParamDefinitionVariant, PerIdParameterMetadata,
};

use crate::data::AudioElementWithData;

/// Collect every parameter definition referenced from the descriptor set,
/// enforcing that all references under one `parameter_id` are equivalent.
///
/// Reserved definition types inside audio elements are skipped with a
/// warning; mix gain definitions inside audio elements are unrepresentable
/// by construction and already rejected at generation time.
pub fn collect_param_definitions(
    audio_elements: &BTreeMap<DecodedUleb128, AudioElementWithData>,
    mix_presentations: &[MixPresentationObu],
) -> Result<BTreeMap<DecodedUleb128, ParamDefinitionVariant>> {
    let mut param_definitions: BTreeMap<DecodedUleb128, ParamDefinitionVariant> = BTreeMap::new();
    let mut insert_and_check_equivalence = |definition: ParamDefinitionVariant| -> Result<()> {
        let parameter_id = definition.base().parameter_id;
        match param_definitions.get(&parameter_id) {
            None => {
                param_definitions.insert(parameter_id, definition);
                Ok(())
            }
            Some(existing) if *existing == definition => Ok(()),
            Some(_) => Err(Error::invalid_argument(format!(
                "Inequivalent param definitions for parameter_id = {parameter_id}"
            ))),
        }
    };

    for (audio_element_id, audio_element) in audio_elements {
        for param in &audio_element.obu.audio_element_params {
            match param {
                AudioElementParam::Demixing(definition) => {
                    insert_and_check_equivalence(ParamDefinitionVariant::Demixing(
                        definition.clone(),
                    ))?;
                }
                AudioElementParam::ReconGain(definition) => {
                    insert_and_check_equivalence(ParamDefinitionVariant::ReconGain(
                        definition.clone(),
                    ))?;
                }
                AudioElementParam::Extension {
                    param_definition_type,
                    ..
                } => {
                    warn!(
                        audio_element_id = *audio_element_id,
                        param_definition_type = *param_definition_type,
                        "Ignoring parameter definition of reserved type"
                    );
                }
            }
        }
    }

    for mix_presentation in mix_presentations {
        for sub_mix in &mix_presentation.sub_mixes {
            for audio_element in &sub_mix.audio_elements {
                insert_and_check_equivalence(ParamDefinitionVariant::MixGain(
                    audio_element.element_mix_gain.clone(),
                ))?;
            }
            insert_and_check_equivalence(ParamDefinitionVariant::MixGain(
                sub_mix.output_mix_gain.clone(),
            ))?;
        }
    }

    Ok(param_definitions)
}

/// Resolve each collected definition into the per-id view used for
/// parameter-block serialization.
///
/// Recon gain definitions resolve their referenced audio element's
/// scalable layout into layer counts, presence flags, and channel tuples;
/// a dangling reference fails with `InvalidArgument`.
pub fn per_id_metadata_map(
    param_definitions: &BTreeMap<DecodedUleb128, ParamDefinitionVariant>,
    audio_elements: &BTreeMap<DecodedUleb128, AudioElementWithData>,
) -> Result<BTreeMap<DecodedUleb128, PerIdParameterMetadata>> {
    let mut parameter_id_to_metadata = BTreeMap::new();
    for (&parameter_id, definition) in param_definitions {
        let mut metadata = PerIdParameterMetadata::new(
            definition.param_definition_type(),
            definition.base().clone(),
        );

        if let ParamDefinitionVariant::ReconGain(recon_gain) = definition {
            let audio_element = audio_elements
                .get(&recon_gain.audio_element_id)
                .ok_or_else(|| {
                    Error::invalid_argument(format!(
                        "Audio element {} associated with the recon gain parameter of id {} \
                         not found",
                        recon_gain.audio_element_id, parameter_id
                    ))
                })?;
            let layout = audio_element.obu.scalable_layout().ok_or_else(|| {
                Error::invalid_argument(format!(
                    "Recon gain parameter {} references audio element {} without a \
                     scalable channel layout",
                    parameter_id, recon_gain.audio_element_id
                ))
            })?;
            metadata.num_layers = layout.num_layers() as u8;
            metadata.recon_gain_is_present_flags = layout
                .channel_audio_layer_configs
                .iter()
                .map(|layer| layer.recon_gain_is_present_flag)
                .collect();
            metadata.channel_numbers_for_layers =
                audio_element.channel_numbers_for_layers.clone();
        }

        parameter_id_to_metadata.insert(parameter_id, metadata);
    }
    Ok(parameter_id_to_metadata)
}
