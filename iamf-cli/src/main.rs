//! IAMF CLI - encodes user metadata plus WAV input into an `.iamf` stream.

mod wav;

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use iamf_core::{DecodedUleb128, Error, LebGenerator, Result};
use iamf_encoder::config::UserMetadata;
use iamf_encoder::{ChannelLabel, IamfEncoder, LpcmCodecFactory, ObuSequencer};

use wav::WavReader;

/// Command-line arguments for the IAMF encoder.
#[derive(Parser, Debug)]
#[command(name = "iamf-encoder")]
#[command(version)]
#[command(about = "Encode user metadata and WAV audio into an IAMF bitstream")]
struct Args {
    /// Input metadata file (JSON user metadata)
    #[arg(short = 'i', long)]
    input_metadata: PathBuf,

    /// Directory holding the input WAV files
    #[arg(short = 'w', long, default_value = ".")]
    wav_dir: PathBuf,

    /// Output .iamf path
    #[arg(short = 'o', long)]
    output: PathBuf,

    /// Insert a temporal delimiter OBU before each temporal unit
    #[arg(long)]
    temporal_delimiters: bool,

    /// Emit every ULEB128 field with this fixed byte width instead of the
    /// minimal form
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=8))]
    fixed_leb_size: Option<u8>,
}

/// One element's WAV source with its channel-to-label mapping.
struct ElementInput {
    audio_element_id: DecodedUleb128,
    reader: WavReader,
    /// (WAV channel index, label) pairs.
    channels: Vec<(usize, ChannelLabel)>,
    num_samples_per_frame: usize,
}

fn open_element_inputs(args: &Args, user_metadata: &UserMetadata) -> Result<Vec<ElementInput>> {
    let mut inputs = Vec::new();
    for frame_metadata in &user_metadata.audio_frame_metadata {
        let audio_element_id = frame_metadata.audio_element_id;
        let filename = frame_metadata
            .wav_filename
            .clone()
            .unwrap_or_else(|| format!("audio_element_{audio_element_id}.wav"));
        let path = args.wav_dir.join(filename);
        let reader = WavReader::open(&path)?;

        if frame_metadata.channel_ids.len() != frame_metadata.channel_labels.len() {
            return Err(Error::invalid_argument(format!(
                "Audio element {audio_element_id}: channel_ids and channel_labels disagree"
            )));
        }
        let mut channels = Vec::with_capacity(frame_metadata.channel_ids.len());
        for (&channel_id, label) in frame_metadata
            .channel_ids
            .iter()
            .zip(&frame_metadata.channel_labels)
        {
            if channel_id as usize >= reader.num_channels() {
                return Err(Error::invalid_argument(format!(
                    "Audio element {audio_element_id}: channel_id {channel_id} exceeds the \
                     {}-channel WAV {}",
                    reader.num_channels(),
                    path.display()
                )));
            }
            channels.push((channel_id as usize, label.parse()?));
        }

        let codec_config_id = user_metadata
            .audio_element_metadata
            .iter()
            .find(|element| element.audio_element_id == audio_element_id)
            .map(|element| element.codec_config_id)
            .ok_or_else(|| {
                Error::invalid_argument(format!(
                    "audio_frame_metadata references unknown audio element {audio_element_id}"
                ))
            })?;
        let num_samples_per_frame = user_metadata
            .codec_config_metadata
            .iter()
            .find(|config| config.codec_config_id == codec_config_id)
            .map(|config| config.codec_config.num_samples_per_frame as usize)
            .ok_or_else(|| {
                Error::invalid_argument(format!(
                    "Audio element {audio_element_id} references unknown codec config \
                     {codec_config_id}"
                ))
            })?;

        info!(
            audio_element_id,
            path = %path.display(),
            remaining_ticks = reader.remaining_ticks(),
            "Opened WAV input"
        );
        inputs.push(ElementInput {
            audio_element_id,
            reader,
            channels,
            num_samples_per_frame,
        });
    }
    Ok(inputs)
}

fn run(args: &Args) -> Result<()> {
    let metadata_file = File::open(&args.input_metadata)?;
    let user_metadata: UserMetadata = serde_json::from_reader(BufReader::new(metadata_file))
        .map_err(|source| {
            Error::invalid_argument(format!(
                "Failed to parse {}: {source}",
                args.input_metadata.display()
            ))
        })?;

    let mut encoder = IamfEncoder::create(&user_metadata, &LpcmCodecFactory)?;
    let mut element_inputs = open_element_inputs(args, &user_metadata)?;

    // Parameter blocks are handed to the encoder as their start timestamps
    // come due.
    let mut parameter_block_metadata: Vec<_> =
        user_metadata.parameter_block_metadata.iter().collect();
    parameter_block_metadata.sort_by_key(|metadata| metadata.start_timestamp);
    let mut next_parameter_block = 0;

    let mut audio_frames = Vec::new();
    let mut parameter_blocks = Vec::new();
    while encoder.generating_data_obus() {
        encoder.begin_temporal_unit();
        let timestamp = encoder.input_timestamp();

        let mut exhausted = true;
        for input in element_inputs.iter_mut() {
            let ticks = input.reader.read_ticks(input.num_samples_per_frame)?;
            if ticks.iter().all(Vec::is_empty) {
                continue;
            }
            for &(channel_id, label) in &input.channels {
                encoder.add_samples(input.audio_element_id, label, ticks[channel_id].clone());
            }
            if input.reader.remaining_ticks() > 0 {
                exhausted = false;
            }
        }
        if exhausted {
            encoder.finalize_add_samples();
        }

        while next_parameter_block < parameter_block_metadata.len()
            && parameter_block_metadata[next_parameter_block].start_timestamp <= timestamp
        {
            encoder
                .add_parameter_block_metadata(parameter_block_metadata[next_parameter_block])?;
            next_parameter_block += 1;
        }

        let mut unit = encoder.output_temporal_unit()?;
        debug!(
            timestamp,
            audio_frames = unit.audio_frames.len(),
            parameter_blocks = unit.parameter_blocks.len(),
            "Produced temporal unit"
        );
        audio_frames.append(&mut unit.audio_frames);
        parameter_blocks.append(&mut unit.parameter_blocks);
    }

    let mix_presentations = encoder.finalize_mix_presentations()?;

    let leb_generator = match args.fixed_leb_size {
        Some(size) => LebGenerator::fixed_size(size)?,
        None => LebGenerator::Minimal,
    };
    let descriptors = encoder.descriptors();
    let mut sequencer = ObuSequencer::new_file(
        Some(args.output.clone()),
        args.temporal_delimiters,
        leb_generator,
    );
    sequencer.pick_and_place(
        &descriptors.ia_sequence_header,
        &descriptors.codec_configs,
        &descriptors.audio_elements,
        &mix_presentations,
        audio_frames,
        parameter_blocks,
        descriptors.arbitrary_obus.clone(),
        encoder.parameter_id_to_metadata(),
    )?;

    info!(output = %args.output.display(), "Wrote IAMF stream");
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            ExitCode::FAILURE
        }
    }
}
