//! Turn Orchestrator
//!
//! Drives one full turn for one interaction: a captured clip or a typed line.
//!
//! 1.  Audio only: drop a clip identical to the previous one, otherwise transcribe it.
//! 2.  Screen the text with the normalizer; a rejection becomes a notice.
//! 3.  Bind the topic on the first accepted turn and append the user turn.
//! 4.  A stop-phrase is answered with a spoken farewell and ends the call.
//! 5.  Otherwise generate a reply under the havruta prompt, synthesize it, and
//!     append the assistant turn.
//!
//! No failure escapes a turn. Whatever was appended before a failure stays,
//! and the failure itself is appended as a single system notice.

use crate::{
    TurnOutcome,
    capability::Capabilities,
    error::TurnError,
    normalizer::{InputNormalizer, Verdict},
    prompt::{FAREWELL, HAVRUTA_SYSTEM, build_system_prompt},
    session::{Session, audio_fingerprint},
    transcript::Turn,
};
use bytes::Bytes;
use tracing::{debug, info, instrument, warn};

pub struct TurnOrchestrator {
    normalizer: InputNormalizer,
    capabilities: Capabilities,
    system_template: String,
    language: String,
}

impl TurnOrchestrator {
    /// Creates an orchestrator with the Korean normalizer and the built-in havruta prompt.
    pub fn new(capabilities: Capabilities) -> Self {
        Self {
            normalizer: InputNormalizer::korean(),
            capabilities,
            system_template: HAVRUTA_SYSTEM.to_string(),
            language: "ko".to_string(),
        }
    }

    pub fn with_normalizer(mut self, normalizer: InputNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Replaces the instruction block the topic line is appended to.
    pub fn with_system_template(mut self, template: impl Into<String>) -> Self {
        self.system_template = template.into();
        self
    }

    /// Sets the language tag handed to speech recognition.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Processes one captured clip.
    #[instrument(skip_all, fields(session_id = %session.session_id(), bytes = audio.len()))]
    pub async fn handle_audio(&self, session: &mut Session, audio: Bytes) -> TurnOutcome {
        let fingerprint = audio_fingerprint(&audio);
        if !session.should_process_audio(&fingerprint) {
            debug!(%fingerprint, "Duplicate clip ignored");
            return TurnOutcome::Duplicate;
        }

        let text = match self.recognize(audio.clone()).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Speech recognition failed");
                session
                    .transcript
                    .append(Turn::notice(format!("(STT/LLM/TTS error) {e}")));
                return TurnOutcome::Failed;
            }
        };

        self.process_text(session, &text, Some(audio)).await
    }

    /// Processes one typed line.
    #[instrument(skip_all, fields(session_id = %session.session_id()))]
    pub async fn handle_text(&self, session: &mut Session, text: &str) -> TurnOutcome {
        self.process_text(session, text, None).await
    }

    async fn process_text(
        &self,
        session: &mut Session,
        raw: &str,
        audio: Option<Bytes>,
    ) -> TurnOutcome {
        let error_label = if audio.is_some() { "STT/LLM/TTS" } else { "LLM/TTS" };

        let text = match self.normalizer.normalize(raw) {
            Verdict::Accepted(text) => text,
            Verdict::Rejected(text) => {
                info!(%text, "Input rejected by normalizer");
                session
                    .transcript
                    .append(Turn::notice(format!("(ignored recognition) '{text}'")));
                return TurnOutcome::Rejected;
            }
        };

        if session.set_topic_if_absent(&text) {
            info!(topic = %text, "Topic bound");
            session
                .transcript
                .append(Turn::notice(format!("(today's topic) {text}")));
        }

        session.transcript.append(Turn::user(text.as_str(), audio));

        if self.normalizer.is_stop_phrase(&text) {
            let audio = self.farewell_audio().await;
            session.transcript.append(Turn::assistant(FAREWELL, audio));
            info!("Conversation ended by stop-phrase");
            return TurnOutcome::Ended;
        }

        match self.reply(session.topic(), &text).await {
            Ok((reply, audio)) => {
                session.transcript.append(Turn::assistant(reply, Some(audio)));
                TurnOutcome::Replied
            }
            Err(e) => {
                warn!(error = %e, "Turn failed");
                session
                    .transcript
                    .append(Turn::notice(format!("({error_label} error) {e}")));
                TurnOutcome::Failed
            }
        }
    }

    async fn recognize(&self, audio: Bytes) -> Result<String, TurnError> {
        let recognizer = self.capabilities.recognizer()?;
        let text = recognizer
            .transcribe(audio, &self.language)
            .await
            .map_err(TurnError::Recognition)?;
        Ok(text.trim().to_string())
    }

    async fn reply(&self, topic: Option<&str>, text: &str) -> Result<(String, Bytes), TurnError> {
        let generator = self.capabilities.generator()?;
        self.capabilities.synthesizer()?;

        let system_prompt = build_system_prompt(&self.system_template, topic);
        let reply = generator
            .generate(&system_prompt, text)
            .await
            .map_err(TurnError::Generation)?;
        let audio = self.synthesize(&reply).await?;
        Ok((reply, audio))
    }

    async fn synthesize(&self, text: &str) -> Result<Bytes, TurnError> {
        let audio = self
            .capabilities
            .synthesizer()?
            .synthesize(text)
            .await
            .map_err(TurnError::Synthesis)?;
        if audio.is_empty() {
            return Err(TurnError::EmptySynthesis);
        }
        Ok(audio)
    }

    /// The farewell is always appended; its audio is best-effort.
    async fn farewell_audio(&self) -> Option<Bytes> {
        match self.synthesize(FAREWELL).await {
            Ok(audio) => Some(audio),
            Err(TurnError::NotConfigured(_)) => None,
            Err(e) => {
                warn!(error = %e, "Farewell synthesis failed; appending text only");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        llm_client::MockGenerationClient,
        speech::{MockSpeechRecognizer, MockSpeechSynthesizer},
        transcript::{Role, Transcript},
    };
    use anyhow::anyhow;
    use std::sync::Arc;

    const TOPIC: &str = "고양이는 포유류야";
    const REPLY: &str = "그렇군요, 맞아요! 고양이는 포유류 맞죠?";

    fn session() -> Session {
        Session::new("test", Transcript::in_memory())
    }

    fn orchestrator(
        recognizer: MockSpeechRecognizer,
        generator: MockGenerationClient,
        synthesizer: MockSpeechSynthesizer,
    ) -> TurnOrchestrator {
        TurnOrchestrator::new(Capabilities::new(
            Some(Arc::new(recognizer)),
            Some(Arc::new(generator)),
            Some(Arc::new(synthesizer)),
        ))
    }

    fn silent_recognizer() -> MockSpeechRecognizer {
        let mut recognizer = MockSpeechRecognizer::new();
        recognizer.expect_transcribe().never();
        recognizer
    }

    fn idle_generator() -> MockGenerationClient {
        let mut generator = MockGenerationClient::new();
        generator.expect_generate().never();
        generator
    }

    fn idle_synthesizer() -> MockSpeechSynthesizer {
        let mut synthesizer = MockSpeechSynthesizer::new();
        synthesizer.expect_synthesize().never();
        synthesizer
    }

    fn wav_synthesizer() -> MockSpeechSynthesizer {
        let mut synthesizer = MockSpeechSynthesizer::new();
        synthesizer
            .expect_synthesize()
            .returning(|_| Ok(Bytes::from_static(b"RIFF-reply")));
        synthesizer
    }

    fn texts(session: &Session) -> Vec<(Role, String)> {
        session
            .transcript()
            .turns()
            .iter()
            .map(|t| (t.role, t.text.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_first_typed_turn_binds_topic_and_replies() {
        let mut generator = MockGenerationClient::new();
        generator
            .expect_generate()
            .withf(|system, user| {
                system.starts_with(HAVRUTA_SYSTEM)
                    && system.ends_with("\n\n[현재 주제]: 고양이는 포유류야\n")
                    && user == TOPIC
            })
            .times(1)
            .returning(|_, _| Ok(REPLY.to_string()));
        let orch = orchestrator(silent_recognizer(), generator, wav_synthesizer());
        let mut s = session();

        let outcome = orch.handle_text(&mut s, TOPIC).await;

        assert_eq!(outcome, TurnOutcome::Replied);
        assert_eq!(s.topic(), Some(TOPIC));
        assert_eq!(
            texts(&s),
            vec![
                (Role::System, format!("(today's topic) {TOPIC}")),
                (Role::User, TOPIC.to_string()),
                (Role::Assistant, REPLY.to_string()),
            ]
        );
        let turns = s.transcript().turns();
        assert!(turns[1].audio.is_none());
        assert_eq!(
            turns[2].audio.as_deref(),
            Some(b"RIFF-reply".as_slice())
        );
    }

    #[tokio::test]
    async fn test_later_turns_keep_the_first_topic() {
        let mut generator = MockGenerationClient::new();
        generator
            .expect_generate()
            .withf(|system, _| system.contains("[현재 주제]: 고양이는 포유류야"))
            .times(2)
            .returning(|_, _| Ok(REPLY.to_string()));
        let orch = orchestrator(silent_recognizer(), generator, wav_synthesizer());
        let mut s = session();

        orch.handle_text(&mut s, TOPIC).await;
        orch.handle_text(&mut s, "고양이는 알을 낳아").await;

        assert_eq!(s.topic(), Some(TOPIC));
        let notices = s
            .transcript()
            .turns()
            .iter()
            .filter(|t| t.role == Role::System)
            .count();
        assert_eq!(notices, 1);
        assert_eq!(s.transcript().len(), 5);
    }

    #[tokio::test]
    async fn test_stop_phrase_appends_farewell_without_generation() {
        let orch = orchestrator(silent_recognizer(), idle_generator(), wav_synthesizer());
        let mut s = session();
        s.set_topic_if_absent(TOPIC);

        let outcome = orch.handle_text(&mut s, "그만").await;

        assert_eq!(outcome, TurnOutcome::Ended);
        assert_eq!(
            texts(&s),
            vec![
                (Role::User, "그만".to_string()),
                (Role::Assistant, FAREWELL.to_string()),
            ]
        );
        assert!(s.transcript().turns()[1].audio.is_some());
    }

    #[tokio::test]
    async fn test_farewell_without_synthesis_has_no_audio() {
        let orch = TurnOrchestrator::new(Capabilities::unconfigured());
        let mut s = session();
        s.set_topic_if_absent(TOPIC);

        let outcome = orch.handle_text(&mut s, "끝내자").await;

        assert_eq!(outcome, TurnOutcome::Ended);
        let last = s.transcript().turns().last().unwrap();
        assert_eq!(last.role, Role::Assistant);
        assert_eq!(last.text, FAREWELL);
        assert!(last.audio.is_none());
    }

    #[tokio::test]
    async fn test_farewell_survives_synthesis_failure() {
        let mut synthesizer = MockSpeechSynthesizer::new();
        synthesizer
            .expect_synthesize()
            .times(1)
            .returning(|_| Err(anyhow!("503")));
        let orch = orchestrator(silent_recognizer(), idle_generator(), synthesizer);
        let mut s = session();
        s.set_topic_if_absent(TOPIC);

        assert_eq!(orch.handle_text(&mut s, "종료").await, TurnOutcome::Ended);
        let last = s.transcript().turns().last().unwrap();
        assert_eq!((last.role, last.text.as_str()), (Role::Assistant, FAREWELL));
        assert!(last.audio.is_none());
    }

    #[tokio::test]
    async fn test_rejected_text_appends_one_notice_and_calls_nothing() {
        let orch = orchestrator(silent_recognizer(), idle_generator(), idle_synthesizer());
        let mut s = session();

        for raw in ["", "  ", "네", "hello"] {
            let before = s.transcript().len();
            assert_eq!(orch.handle_text(&mut s, raw).await, TurnOutcome::Rejected);
            assert_eq!(s.transcript().len(), before + 1);
            assert_eq!(s.transcript().turns()[before].role, Role::System);
        }
        assert!(s.topic().is_none());
        assert_eq!(s.transcript().turns()[3].text, "(ignored recognition) 'hello'");
    }

    #[tokio::test]
    async fn test_empty_recognition_is_ignored() {
        let mut recognizer = MockSpeechRecognizer::new();
        recognizer
            .expect_transcribe()
            .withf(|_, language| language == "ko")
            .times(1)
            .returning(|_, _| Ok(String::new()));
        let orch = orchestrator(recognizer, idle_generator(), idle_synthesizer());
        let mut s = session();

        let outcome = orch
            .handle_audio(&mut s, Bytes::from_static(b"RIFF-noise"))
            .await;

        assert_eq!(outcome, TurnOutcome::Rejected);
        assert_eq!(
            texts(&s),
            vec![(Role::System, "(ignored recognition) ''".to_string())]
        );
    }

    #[tokio::test]
    async fn test_audio_turn_attaches_clip_to_user_turn() {
        let mut recognizer = MockSpeechRecognizer::new();
        recognizer
            .expect_transcribe()
            .times(1)
            .returning(|_, _| Ok(format!(" {TOPIC} ")));
        let mut generator = MockGenerationClient::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|_, _| Ok(REPLY.to_string()));
        let orch = orchestrator(recognizer, generator, wav_synthesizer());
        let mut s = session();
        let clip = Bytes::from_static(b"RIFF-user-clip");

        assert_eq!(orch.handle_audio(&mut s, clip.clone()).await, TurnOutcome::Replied);

        let turns = s.transcript().turns();
        assert_eq!(turns[1].role, Role::User);
        assert_eq!(turns[1].text, TOPIC);
        assert_eq!(turns[1].audio.as_ref(), Some(&clip));
    }

    #[tokio::test]
    async fn test_duplicate_clip_appends_nothing() {
        let mut recognizer = MockSpeechRecognizer::new();
        recognizer
            .expect_transcribe()
            .times(1)
            .returning(|_, _| Ok(TOPIC.to_string()));
        let mut generator = MockGenerationClient::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|_, _| Ok(REPLY.to_string()));
        let orch = orchestrator(recognizer, generator, wav_synthesizer());
        let mut s = session();
        let clip = Bytes::from_static(b"RIFF-same");

        orch.handle_audio(&mut s, clip.clone()).await;
        let after_first = s.transcript().len();

        assert_eq!(orch.handle_audio(&mut s, clip).await, TurnOutcome::Duplicate);
        assert_eq!(s.transcript().len(), after_first);
    }

    #[tokio::test]
    async fn test_recognition_failure_becomes_notice() {
        let mut recognizer = MockSpeechRecognizer::new();
        recognizer
            .expect_transcribe()
            .returning(|_, _| Err(anyhow!("connection reset")));
        let orch = orchestrator(recognizer, idle_generator(), idle_synthesizer());
        let mut s = session();

        let outcome = orch.handle_audio(&mut s, Bytes::from_static(b"RIFF")).await;

        assert_eq!(outcome, TurnOutcome::Failed);
        assert_eq!(
            texts(&s),
            vec![(
                Role::System,
                "(STT/LLM/TTS error) speech recognition failed: connection reset".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_generation_failure_keeps_user_turn() {
        let mut generator = MockGenerationClient::new();
        generator
            .expect_generate()
            .returning(|_, _| Err(anyhow!("rate limited")));
        let orch = orchestrator(silent_recognizer(), generator, idle_synthesizer());
        let mut s = session();

        assert_eq!(orch.handle_text(&mut s, TOPIC).await, TurnOutcome::Failed);
        assert_eq!(
            texts(&s),
            vec![
                (Role::System, format!("(today's topic) {TOPIC}")),
                (Role::User, TOPIC.to_string()),
                (
                    Role::System,
                    "(LLM/TTS error) generation failed: rate limited".to_string()
                ),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_synthesis_is_a_failure() {
        let mut generator = MockGenerationClient::new();
        generator
            .expect_generate()
            .returning(|_, _| Ok(REPLY.to_string()));
        let mut synthesizer = MockSpeechSynthesizer::new();
        synthesizer
            .expect_synthesize()
            .returning(|_| Ok(Bytes::new()));
        let orch = orchestrator(silent_recognizer(), generator, synthesizer);
        let mut s = session();

        assert_eq!(orch.handle_text(&mut s, TOPIC).await, TurnOutcome::Failed);
        let last = s.transcript().turns().last().unwrap();
        assert_eq!(last.role, Role::System);
        assert_eq!(last.text, "(LLM/TTS error) synthesis failed: no audio bytes");
    }

    #[tokio::test]
    async fn test_unconfigured_generation_is_reported_and_session_stays_usable() {
        let orch = TurnOrchestrator::new(Capabilities::unconfigured());
        let mut s = session();

        assert_eq!(orch.handle_text(&mut s, TOPIC).await, TurnOutcome::Failed);
        let last = s.transcript().turns().last().unwrap();
        assert!(last.text.starts_with("(LLM/TTS error) generation is not configured"));

        assert_eq!(orch.handle_text(&mut s, "그만").await, TurnOutcome::Ended);
        assert_eq!(s.transcript().turns().last().unwrap().text, FAREWELL);
    }

    #[tokio::test]
    async fn test_unconfigured_recognition_is_reported() {
        let orch = TurnOrchestrator::new(Capabilities::unconfigured());
        let mut s = session();

        assert_eq!(
            orch.handle_audio(&mut s, Bytes::from_static(b"RIFF")).await,
            TurnOutcome::Failed
        );
        assert_eq!(s.transcript().len(), 1);
        assert!(
            s.transcript().turns()[0]
                .text
                .contains("speech recognition is not configured")
        );
    }

    #[tokio::test]
    async fn test_replay_produces_same_order() {
        async fn replay() -> Vec<(Role, String)> {
            let mut generator = MockGenerationClient::new();
            generator
                .expect_generate()
                .returning(|_, user| Ok(format!("{user}, 맞나요?")));
            let orch = orchestrator(silent_recognizer(), generator, wav_synthesizer());
            let mut s = session();
            for input in [TOPIC, "x", "고양이는 털이 있어", "그만"] {
                orch.handle_text(&mut s, input).await;
            }
            texts(&s)
        }

        let first = replay().await;
        let second = replay().await;
        assert_eq!(first, second);
        let roles: Vec<Role> = first.iter().map(|(role, _)| *role).collect();
        assert_eq!(
            roles,
            vec![
                Role::System,
                Role::User,
                Role::Assistant,
                Role::System,
                Role::User,
                Role::Assistant,
                Role::User,
                Role::Assistant,
            ]
        );
    }

    #[tokio::test]
    async fn test_custom_template_and_language() {
        let mut recognizer = MockSpeechRecognizer::new();
        recognizer
            .expect_transcribe()
            .withf(|_, language| language == "ko-KR")
            .returning(|_, _| Ok(TOPIC.to_string()));
        let mut generator = MockGenerationClient::new();
        generator
            .expect_generate()
            .withf(|system, _| system.starts_with("CUSTOM RULES"))
            .returning(|_, _| Ok(REPLY.to_string()));
        let orch = orchestrator(recognizer, generator, wav_synthesizer())
            .with_system_template("CUSTOM RULES")
            .with_language("ko-KR");
        let mut s = session();

        assert_eq!(
            orch.handle_audio(&mut s, Bytes::from_static(b"RIFF")).await,
            TurnOutcome::Replied
        );
    }
}
