//! The audio-fingerprint wrapper (§4.5 step 3). Thin by design: this
//! crate stores an acoustic fingerprint of the source audio for forensic
//! reference, but does not compare audio fingerprints at verify time
//! (Non-goal, §1).

use std::path::Path;
use std::time::Duration;

use chromaprint_rust as chromaprint;

use crate::media::MediaAdapter;
use crate::{Error, Result};

pub const AUDIO_ALGORITHM: &str = "chromaprint";
pub const AUDIO_FINGERPRINT_VERSION: u32 = 1;

/// `audio_fingerprint.json`'s schema: `{algorithm, version, duration,
/// fingerprint}`.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct AudioFingerprint {
    pub algorithm: String,
    pub version: u32,
    pub duration_seconds: f64,
    pub fingerprint: Vec<u32>,
}

/// Extracts the source's audio track to a scratch PCM file, then computes
/// a single whole-file Chromaprint fingerprint over it.
pub fn compute(adapter: &MediaAdapter, source: &Path, scratch_dir: &Path) -> Result<AudioFingerprint> {
    let pcm_path = scratch_dir.join("audio.wav");
    adapter.extract_audio(source, &pcm_path)?;

    let input = ffmpeg_next::format::input(&pcm_path)?;
    let stream = input
        .streams()
        .best(ffmpeg_next::media::Type::Audio)
        .ok_or_else(|| Error::MediaFailure("no audio stream in extracted PCM".to_string()))?;
    let stream_index = stream.index();
    let duration_seconds = input.duration() as f64 / f64::from(ffmpeg_next::ffi::AV_TIME_BASE);

    let hashes = extract_hashes(input, stream_index, duration_seconds)?;

    Ok(AudioFingerprint {
        algorithm: AUDIO_ALGORITHM.to_string(),
        version: AUDIO_FINGERPRINT_VERSION,
        duration_seconds,
        fingerprint: hashes,
    })
}

fn extract_hashes(
    mut input: ffmpeg_next::format::context::Input,
    stream_index: usize,
    duration_seconds: f64,
) -> Result<Vec<u32>> {
    let ctx = ffmpeg_next::codec::context::Context::from_parameters(
        input.stream(stream_index).unwrap().parameters(),
    )?;
    let mut decoder = ctx.decoder().audio()?;

    // A single whole-file hash: one fingerprint window spanning the
    // entire duration.
    let hash_duration = Duration::from_secs_f64(duration_seconds.max(1.0));
    let mut fingerprinter =
        chromaprint::DelayedFingerprinter::new(1, hash_duration, hash_duration, None, 2, None);
    let target_sample_rate = fingerprinter.sample_rate();

    let mut resampler = decoder.resampler(
        ffmpeg_next::format::Sample::I16(ffmpeg_next::format::sample::Type::Packed),
        ffmpeg_next::ChannelLayout::STEREO,
        target_sample_rate,
    )?;

    let mut frame = ffmpeg_next::frame::Audio::empty();
    let mut resampled = ffmpeg_next::frame::Audio::empty();
    let mut hashes = Vec::new();

    let mut feed_resampled_frame = |resampled: &ffmpeg_next::frame::Audio,
                                     hashes: &mut Vec<u32>|
     -> Result<()> {
        let raw_samples =
            &resampled.data(0)[..resampled.samples() * resampled.channels() as usize * 2];
        let (_, samples, _) = unsafe { raw_samples.align_to::<i16>() };
        for (raw_fingerprint, _ts) in fingerprinter.feed(samples).map_err(|e| {
            Error::MediaFailure(format!("chromaprint fingerprinting failed: {e:?}"))
        })? {
            hashes.push(chromaprint::simhash::simhash32(raw_fingerprint.get()));
        }
        Ok(())
    };

    for (stream, packet) in input.packets() {
        if stream.index() != stream_index {
            continue;
        }
        decoder.send_packet(&packet)?;
        while decoder.receive_frame(&mut frame).is_ok() {
            resampler.run(&frame, &mut resampled)?;
            feed_resampled_frame(&resampled, &mut hashes)?;
        }
    }
    decoder.send_eof()?;
    while decoder.receive_frame(&mut frame).is_ok() {
        resampler.run(&frame, &mut resampled)?;
        feed_resampled_frame(&resampled, &mut hashes)?;
    }

    Ok(hashes)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fingerprint_schema_round_trips() {
        let blob = AudioFingerprint {
            algorithm: AUDIO_ALGORITHM.to_string(),
            version: AUDIO_FINGERPRINT_VERSION,
            duration_seconds: 12.5,
            fingerprint: vec![1, 2, 3],
        };
        let json = serde_json::to_string(&blob).unwrap();
        let parsed: AudioFingerprint = serde_json::from_str(&json).unwrap();
        assert_eq!(blob, parsed);
    }
}
