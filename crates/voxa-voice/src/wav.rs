//! Minimal RIFF/WAVE framing for 16-bit PCM.

/// Size of the canonical PCM WAV header.
pub const WAV_HEADER_LEN: usize = 44;

/// Wraps raw s16le mono PCM in a WAV container.
pub fn pcm16_to_wav(pcm: &[u8], sample_rate: u32) -> Vec<u8> {
    // An odd trailing byte is not a whole sample.
    let data = &pcm[..pcm.len() - pcm.len() % 2];
    let data_len = data.len() as u32;

    let mut buf = Vec::with_capacity(WAV_HEADER_LEN + data.len());
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&(36 + data_len).to_le_bytes());
    buf.extend_from_slice(b"WAVE");
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&1u16.to_le_bytes()); // mono
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&sample_rate.saturating_mul(2).to_le_bytes()); // byte rate
    buf.extend_from_slice(&2u16.to_le_bytes());
    buf.extend_from_slice(&16u16.to_le_bytes());
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_len.to_le_bytes());
    buf.extend_from_slice(data);
    buf
}

/// Returns the PCM payload of a canonical 44-byte-header WAV file.
///
/// Streaming encoders such as `espeak-ng --stdout` write placeholder sizes,
/// so the header is skipped rather than parsed. Input that is not a WAV file
/// is returned unchanged.
pub fn strip_wav_header(wav: &[u8]) -> &[u8] {
    if wav.len() >= WAV_HEADER_LEN && &wav[..4] == b"RIFF" && &wav[8..12] == b"WAVE" {
        &wav[WAV_HEADER_LEN..]
    } else {
        wav
    }
}
