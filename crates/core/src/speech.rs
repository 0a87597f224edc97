//! Speech capabilities: recognition of captured clips and synthesis of replies.
//!
//! Both directions use the same waveform container (mono WAV), so a user clip
//! and a synthesized reply can be stored on a turn the same way.

use anyhow::{Result, bail};
use async_openai::{
    Client,
    config::OpenAIConfig,
    types::{
        AudioInput, AudioResponseFormat, CreateSpeechRequestArgs,
        CreateTranscriptionRequestArgs, SpeechModel, SpeechResponseFormat, Voice,
    },
};
use async_trait::async_trait;
use bytes::Bytes;
#[cfg(test)]
use mockall::automock;
use tracing::debug;

/// Turns a captured clip into text.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SpeechRecognizer: Send + Sync {
    /// Returns the best-effort transcript, or an empty string when nothing was recognized.
    async fn transcribe(&self, audio: Bytes, language: &str) -> Result<String>;
}

/// Turns reply text into a clip.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> Result<Bytes>;
}

/// Maps a configured voice name onto the provider's voices, defaulting to `alloy`.
pub fn parse_voice(name: &str) -> Voice {
    match name.to_lowercase().as_str() {
        "echo" => Voice::Echo,
        "fable" => Voice::Fable,
        "onyx" => Voice::Onyx,
        "nova" => Voice::Nova,
        "shimmer" => Voice::Shimmer,
        _ => Voice::Alloy,
    }
}

/// Transcription through an OpenAI-compatible `audio/transcriptions` endpoint.
pub struct OpenAIRecognizer {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAIRecognizer {
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self {
            client,
            model,
        }
    }
}

#[async_trait]
impl SpeechRecognizer for OpenAIRecognizer {
    async fn transcribe(&self, audio: Bytes, language: &str) -> Result<String> {
        let request = CreateTranscriptionRequestArgs::default()
            .file(AudioInput::from_bytes("clip.wav".to_string(), audio))
            .model(&self.model)
            .language(language)
            .response_format(AudioResponseFormat::Json)
            .build()?;

        let response = self.client.audio().transcribe(request).await?;
        debug!(
            model = %self.model,
            chars = response.text.chars().count(),
            "Transcription received"
        );
        Ok(response.text)
    }
}

/// Synthesis through an OpenAI-compatible `audio/speech` endpoint, producing WAV.
pub struct OpenAISynthesizer {
    client: Client<OpenAIConfig>,
    model: String,
    voice: Voice,
}

impl OpenAISynthesizer {
    pub fn new(client: Client<OpenAIConfig>, model: String, voice: Voice) -> Self {
        Self {
            client,
            model,
            voice,
        }
    }
}

#[async_trait]
impl SpeechSynthesizer for OpenAISynthesizer {
    async fn synthesize(&self, text: &str) -> Result<Bytes> {
        let request = CreateSpeechRequestArgs::default()
            .input(text)
            .model(SpeechModel::Other(self.model.clone()))
            .voice(self.voice.clone())
            .response_format(SpeechResponseFormat::Wav)
            .build()?;

        let response = self.client.audio().speech(request).await?;
        if response.bytes.is_empty() {
            bail!("provider returned no audio bytes");
        }
        debug!(model = %self.model, bytes = response.bytes.len(), "Speech synthesized");
        Ok(response.bytes)
    }
}
