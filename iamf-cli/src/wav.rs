//! Minimal canonical WAV reader for encoder input.
//!
//! Walks the RIFF chunk list for `fmt ` and `data`, supporting
//! uncompressed PCM at 16, 24, or 32 bits. Samples normalize to
//! [-1.0, 1.0] as `f64`.

use std::fs::File;
use std::io::{BufReader, Read, Seek, SeekFrom};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};

use iamf_core::{Error, Result};

const FORMAT_PCM: u16 = 1;
const FORMAT_EXTENSIBLE: u16 = 0xfffe;

/// A streaming reader over the data chunk of a PCM WAV file.
pub struct WavReader {
    reader: BufReader<File>,
    num_channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
    remaining_ticks: u64,
}

impl WavReader {
    /// Open `path` and position the reader at the first sample.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);

        let mut four_cc = [0u8; 4];
        reader.read_exact(&mut four_cc)?;
        if &four_cc != b"RIFF" {
            return Err(Error::invalid_argument(format!(
                "{} is not a RIFF file",
                path.display()
            )));
        }
        let _riff_size = reader.read_u32::<LittleEndian>()?;
        reader.read_exact(&mut four_cc)?;
        if &four_cc != b"WAVE" {
            return Err(Error::invalid_argument(format!(
                "{} is not a WAVE file",
                path.display()
            )));
        }

        let mut format: Option<(u16, u16, u32, u16)> = None;
        loop {
            if reader.read_exact(&mut four_cc).is_err() {
                return Err(Error::invalid_argument(format!(
                    "{} has no data chunk",
                    path.display()
                )));
            }
            let chunk_size = reader.read_u32::<LittleEndian>()?;
            match &four_cc {
                b"fmt " => {
                    let audio_format = reader.read_u16::<LittleEndian>()?;
                    let num_channels = reader.read_u16::<LittleEndian>()?;
                    let sample_rate = reader.read_u32::<LittleEndian>()?;
                    let _byte_rate = reader.read_u32::<LittleEndian>()?;
                    let _block_align = reader.read_u16::<LittleEndian>()?;
                    let bits_per_sample = reader.read_u16::<LittleEndian>()?;
                    if audio_format != FORMAT_PCM && audio_format != FORMAT_EXTENSIBLE {
                        return Err(Error::invalid_argument(format!(
                            "{}: only PCM WAV is supported, format = {audio_format}",
                            path.display()
                        )));
                    }
                    // Skip any extension bytes.
                    let consumed = 16u32;
                    if chunk_size > consumed {
                        reader.seek(SeekFrom::Current(i64::from(chunk_size - consumed)))?;
                    }
                    format = Some((audio_format, num_channels, sample_rate, bits_per_sample));
                }
                b"data" => {
                    let (_, num_channels, sample_rate, bits_per_sample) =
                        format.ok_or_else(|| {
                            Error::invalid_argument(format!(
                                "{}: data chunk precedes fmt chunk",
                                path.display()
                            ))
                        })?;
                    if !matches!(bits_per_sample, 16 | 24 | 32) {
                        return Err(Error::invalid_argument(format!(
                            "{}: unsupported bit depth {bits_per_sample}",
                            path.display()
                        )));
                    }
                    if num_channels == 0 {
                        return Err(Error::invalid_argument(format!(
                            "{}: WAV has no channels",
                            path.display()
                        )));
                    }
                    let bytes_per_tick = u64::from(num_channels) * u64::from(bits_per_sample / 8);
                    return Ok(Self {
                        reader,
                        num_channels,
                        sample_rate,
                        bits_per_sample,
                        remaining_ticks: u64::from(chunk_size) / bytes_per_tick,
                    });
                }
                _ => {
                    // Skip unknown chunks, padded to an even size.
                    let skip = u64::from(chunk_size) + u64::from(chunk_size % 2);
                    reader.seek(SeekFrom::Current(skip as i64))?;
                }
            }
        }
    }

    /// Channels per tick.
    pub fn num_channels(&self) -> usize {
        usize::from(self.num_channels)
    }

    /// Samples per second.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Ticks not yet read.
    pub fn remaining_ticks(&self) -> u64 {
        self.remaining_ticks
    }

    fn read_sample(&mut self) -> Result<f64> {
        Ok(match self.bits_per_sample {
            16 => f64::from(self.reader.read_i16::<LittleEndian>()?) / 32768.0,
            24 => f64::from(self.reader.read_i24::<LittleEndian>()?) / 8_388_608.0,
            32 => f64::from(self.reader.read_i32::<LittleEndian>()?) / 2_147_483_648.0,
            _ => unreachable!("bit depth validated at open"),
        })
    }

    /// Read up to `max_ticks` ticks, returning channel-major samples:
    /// `samples[channel][tick]`.
    pub fn read_ticks(&mut self, max_ticks: usize) -> Result<Vec<Vec<f64>>> {
        let ticks = (self.remaining_ticks.min(max_ticks as u64)) as usize;
        let mut samples = vec![Vec::with_capacity(ticks); self.num_channels()];
        for _ in 0..ticks {
            for channel in samples.iter_mut() {
                channel.push(self.read_sample()?);
            }
        }
        self.remaining_ticks -= ticks as u64;
        Ok(samples)
    }
}
