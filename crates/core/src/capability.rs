//! The bundle of external capabilities a turn can draw on.
//!
//! Availability is decided once, when the bundle is built, so the orchestrator
//! can branch on a missing capability before any network call is attempted.

use crate::{
    error::{Capability, TurnError},
    llm_client::{GenerationClient, OpenAICompatibleClient, provider_client},
    speech::{OpenAIRecognizer, OpenAISynthesizer, SpeechRecognizer, SpeechSynthesizer, parse_voice},
};
use async_openai::config::OpenAIConfig;
use std::{sync::Arc, time::Duration};
use tracing::{error, info, warn};

/// Provider settings needed to build the OpenAI-compatible capabilities.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub api_key: Option<String>,
    pub api_base: String,
    pub chat_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub tts_model: String,
    pub tts_voice: String,
    pub stt_model: String,
    /// Upper bound on any single provider call.
    pub request_timeout: Duration,
}

#[derive(Clone, Default)]
pub struct Capabilities {
    recognizer: Option<Arc<dyn SpeechRecognizer>>,
    generator: Option<Arc<dyn GenerationClient>>,
    synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
}

impl Capabilities {
    pub fn new(
        recognizer: Option<Arc<dyn SpeechRecognizer>>,
        generator: Option<Arc<dyn GenerationClient>>,
        synthesizer: Option<Arc<dyn SpeechSynthesizer>>,
    ) -> Self {
        Self {
            recognizer,
            generator,
            synthesizer,
        }
    }

    /// A bundle in which every capability reports "not configured".
    pub fn unconfigured() -> Self {
        Self::default()
    }

    /// Builds all three capabilities against one OpenAI-compatible provider.
    ///
    /// Without a credential the result is [`Capabilities::unconfigured`].
    pub fn openai(settings: &ProviderSettings) -> Self {
        let Some(api_key) = settings.api_key.as_deref().filter(|k| !k.is_empty()) else {
            warn!("OPENAI_API_KEY is not set; recognition, generation and synthesis are disabled");
            return Self::unconfigured();
        };

        let config = OpenAIConfig::new()
            .with_api_key(api_key)
            .with_api_base(&settings.api_base);
        let client = match provider_client(config, settings.request_timeout) {
            Ok(client) => client,
            Err(e) => {
                error!(
                    error = %e,
                    "Could not build the provider HTTP client; capabilities are disabled"
                );
                return Self::unconfigured();
            }
        };

        info!(
            api_base = %settings.api_base,
            chat_model = %settings.chat_model,
            tts_model = %settings.tts_model,
            stt_model = %settings.stt_model,
            timeout_secs = settings.request_timeout.as_secs(),
            "Capabilities configured"
        );

        Self {
            recognizer: Some(Arc::new(OpenAIRecognizer::new(
                client.clone(),
                settings.stt_model.clone(),
            ))),
            generator: Some(Arc::new(OpenAICompatibleClient::new(
                client.clone(),
                settings.chat_model.clone(),
                settings.temperature,
                settings.max_tokens,
            ))),
            synthesizer: Some(Arc::new(OpenAISynthesizer::new(
                client,
                settings.tts_model.clone(),
                parse_voice(&settings.tts_voice),
            ))),
        }
    }

    pub fn recognizer(&self) -> Result<&dyn SpeechRecognizer, TurnError> {
        self.recognizer
            .as_deref()
            .ok_or(TurnError::NotConfigured(Capability::Recognition))
    }

    pub fn generator(&self) -> Result<&dyn GenerationClient, TurnError> {
        self.generator
            .as_deref()
            .ok_or(TurnError::NotConfigured(Capability::Generation))
    }

    pub fn synthesizer(&self) -> Result<&dyn SpeechSynthesizer, TurnError> {
        self.synthesizer
            .as_deref()
            .ok_or(TurnError::NotConfigured(Capability::Synthesis))
    }

    pub fn is_configured(&self, capability: Capability) -> bool {
        match capability {
            Capability::Recognition => self.recognizer.is_some(),
            Capability::Generation => self.generator.is_some(),
            Capability::Synthesis => self.synthesizer.is_some(),
        }
    }
}
