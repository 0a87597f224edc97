use base64::Engine;

/// Encodes raw clip bytes for JSON transport (e.g., an `<audio>` data URI on the client).
pub fn encode_base64(audio: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(audio)
}

/// Checks for a RIFF/WAVE header, the container recognition and synthesis both use.
pub fn is_riff_wave(audio: &[u8]) -> bool {
    audio.len() >= 12 && &audio[0..4] == b"RIFF" && &audio[8..12] == b"WAVE"
}
