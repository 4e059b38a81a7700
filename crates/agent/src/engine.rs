//! Conversation Engine
//!
//! One call per user turn. The reply branch (remote completion) and the
//! analysis branch run concurrently and are joined; neither cancels the
//! other. Failures never surface to the caller: each branch degrades along
//! a fixed chain and the outcome records which stage produced the result.
//!
//! Analysis chain: `Remote -> Local -> Heuristic -> Apology`. `Remote` is
//! only entered with `AnalysisStrategy::Remote`.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use lead_agent_config::{
    AnalysisStrategy, EngineConfig, EngineMode, LlmSettings, PromptsConfig, Settings,
};
use lead_agent_core::{
    last_user_message, user_turn_count, ClientProfile, LeadRecord, LeadUpdate, Message,
};
use lead_agent_llm::prompt::render_transcript;
use lead_agent_llm::{GenerationOptions, LlmBackend, LlmError, PromptBuilder};

use crate::analysis::{local_analysis, AnalysisError, LeadIntelligence};
use crate::fallback::{apology_update, canned_reply, heuristic_update, ScriptedResponder};

/// Stage of the analysis chain that produced a turn's lead update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStage {
    /// Strict-JSON analysis from the completion service
    Remote,
    /// Extractor + score model + policy
    Local,
    /// Additive keyword heuristic on the raw utterance
    Heuristic,
    /// Nothing usable; current score + 5
    Apology,
}

impl AnalysisStage {
    /// Stages tried in order for a strategy; `Apology` follows them all
    pub fn chain(strategy: AnalysisStrategy) -> &'static [AnalysisStage] {
        match strategy {
            AnalysisStrategy::Remote => &[
                AnalysisStage::Remote,
                AnalysisStage::Local,
                AnalysisStage::Heuristic,
            ],
            AnalysisStrategy::Local => &[AnalysisStage::Local, AnalysisStage::Heuristic],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisStage::Remote => "remote",
            AnalysisStage::Local => "local",
            AnalysisStage::Heuristic => "heuristic",
            AnalysisStage::Apology => "apology",
        }
    }
}

/// Where the bot message came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplySource {
    Llm,
    Canned,
    Scripted,
    Apology,
}

impl ReplySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplySource::Llm => "llm",
            ReplySource::Canned => "canned",
            ReplySource::Scripted => "scripted",
            ReplySource::Apology => "apology",
        }
    }
}

/// How a turn was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnOutcome {
    pub reply: ReplySource,
    pub analysis: AnalysisStage,
    pub latency_ms: u64,
}

/// Result of one engine turn: a bot message and a lead delta
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnResponse {
    pub bot_message: Message,
    pub lead_update: LeadUpdate,
    pub outcome: TurnOutcome,
}

/// Per-turn inputs shared by the analysis stages
struct TurnContext<'a> {
    transcript: &'a [Message],
    utterance: &'a str,
    current: &'a LeadRecord,
    user_turns: usize,
    client: ClientProfile,
}

/// Stateless conversation engine
pub struct ConversationEngine {
    backend: Arc<dyn LlmBackend>,
    engine: EngineConfig,
    llm: LlmSettings,
    prompts: PromptsConfig,
    scripted: ScriptedResponder,
}

impl ConversationEngine {
    pub fn new(backend: Arc<dyn LlmBackend>, settings: &Settings) -> Self {
        Self {
            backend,
            engine: settings.engine.clone(),
            llm: settings.llm.clone(),
            prompts: settings.prompts.clone(),
            scripted: ScriptedResponder::new(),
        }
    }

    pub fn prompts(&self) -> &PromptsConfig {
        &self.prompts
    }

    pub fn mode(&self) -> EngineMode {
        self.engine.mode
    }

    /// Produce the bot reply and lead update for the latest user turn
    ///
    /// Never fails. Without a user utterance the apology is returned with the
    /// current score + 5.
    pub async fn respond(
        &self,
        transcript: &[Message],
        current: &LeadRecord,
        client: ClientProfile,
    ) -> TurnResponse {
        let start = Instant::now();
        let user_turns = user_turn_count(transcript);

        let Some(last) = last_user_message(transcript) else {
            tracing::warn!("Turn without a user utterance, returning apology");
            return self.finish(
                self.prompts.apology(),
                ReplySource::Apology,
                apology_update(current.score(), user_turns),
                AnalysisStage::Apology,
                start,
            );
        };

        let ctx = TurnContext {
            transcript,
            utterance: last.content.as_str(),
            current,
            user_turns,
            client,
        };

        match self.engine.mode {
            EngineMode::Llm => {
                let (reply, (update, stage)) =
                    tokio::join!(self.remote_reply(&ctx), self.analyze(&ctx));

                let (text, source) = match reply {
                    Ok(text) => (text, ReplySource::Llm),
                    Err(e) => {
                        tracing::warn!(error = %e, "Reply generation failed, using canned reply");
                        metrics::counter!(
                            "lead_agent_reply_fallbacks_total",
                            "reason" => e.kind()
                        )
                        .increment(1);
                        (canned_reply(ctx.utterance).to_string(), ReplySource::Canned)
                    }
                };

                self.finish(text, source, update, stage, start)
            }
            EngineMode::Scripted => {
                let (update, stage) = self.analyze(&ctx).await;
                let mut projected = current.clone();
                projected.merge(&update);
                let text = self.scripted.reply(user_turns, &update, &projected);

                self.finish(text, ReplySource::Scripted, update, stage, start)
            }
        }
    }

    fn finish(
        &self,
        text: String,
        reply: ReplySource,
        lead_update: LeadUpdate,
        analysis: AnalysisStage,
        start: Instant,
    ) -> TurnResponse {
        let latency_ms = start.elapsed().as_millis() as u64;

        metrics::counter!(
            "lead_agent_turns_total",
            "reply" => reply.as_str(),
            "analysis" => analysis.as_str()
        )
        .increment(1);
        metrics::histogram!("lead_agent_turn_latency_seconds")
            .record(latency_ms as f64 / 1000.0);

        tracing::debug!(
            reply = reply.as_str(),
            analysis = analysis.as_str(),
            score = lead_update.score(),
            latency_ms,
            "Turn complete"
        );

        TurnResponse {
            bot_message: Message::bot(text),
            lead_update,
            outcome: TurnOutcome {
                reply,
                analysis,
                latency_ms,
            },
        }
    }

    fn timeout_for(&self, client: ClientProfile) -> Duration {
        if client.is_mobile() {
            self.llm.mobile_timeout()
        } else {
            self.llm.timeout()
        }
    }

    /// Call the backend, bounding retries included by the client timeout
    async fn call_backend(
        &self,
        messages: &[lead_agent_llm::Message],
        options: GenerationOptions,
    ) -> Result<String, LlmError> {
        let start = Instant::now();
        let result = tokio::time::timeout(options.timeout, self.backend.generate(messages, &options))
            .await
            .unwrap_or(Err(LlmError::Timeout));

        metrics::histogram!("lead_agent_llm_latency_seconds")
            .record(start.elapsed().as_secs_f64());

        result.map(|r| r.text)
    }

    async fn remote_reply(&self, ctx: &TurnContext<'_>) -> Result<String, LlmError> {
        let phase = ctx.current.phase;
        let messages = PromptBuilder::new()
            .system(self.prompts.system_prompt())
            .system(format!("Current phase: {}. {}", phase, phase.prompt_guidance()))
            .transcript(ctx.transcript)
            .build();

        let options = GenerationOptions {
            max_tokens: if ctx.client.is_mobile() {
                self.llm.mobile_max_tokens
            } else {
                self.llm.max_tokens
            },
            temperature: self.llm.temperature,
            timeout: self.timeout_for(ctx.client),
        };

        self.call_backend(&messages, options).await
    }

    /// Run the analysis chain until a stage succeeds
    async fn analyze(&self, ctx: &TurnContext<'_>) -> (LeadUpdate, AnalysisStage) {
        for &stage in AnalysisStage::chain(self.engine.analysis_strategy) {
            match self.run_stage(stage, ctx).await {
                Ok(update) => {
                    tracing::debug!(stage = stage.as_str(), "Analysis stage succeeded");
                    return (update, stage);
                }
                Err(e) => {
                    tracing::warn!(stage = stage.as_str(), error = %e, "Analysis stage failed, falling back");
                    metrics::counter!(
                        "lead_agent_analysis_fallbacks_total",
                        "stage" => stage.as_str()
                    )
                    .increment(1);
                }
            }
        }

        (
            apology_update(ctx.current.score(), ctx.user_turns),
            AnalysisStage::Apology,
        )
    }

    async fn run_stage(
        &self,
        stage: AnalysisStage,
        ctx: &TurnContext<'_>,
    ) -> Result<LeadUpdate, AnalysisError> {
        match stage {
            AnalysisStage::Remote => self.remote_analysis(ctx).await,
            AnalysisStage::Local => local_analysis(
                ctx.utterance,
                ctx.current,
                ctx.user_turns,
                self.engine.max_analysis_chars,
            ),
            AnalysisStage::Heuristic => {
                let truncated: String = ctx
                    .utterance
                    .chars()
                    .take(self.engine.max_analysis_chars)
                    .collect();
                Ok(heuristic_update(&truncated, ctx.current.score(), ctx.user_turns))
            }
            AnalysisStage::Apology => Ok(apology_update(ctx.current.score(), ctx.user_turns)),
        }
    }

    async fn remote_analysis(&self, ctx: &TurnContext<'_>) -> Result<LeadUpdate, AnalysisError> {
        let score = ctx.current.score();
        let messages = PromptBuilder::new()
            .system(self.prompts.analysis_prompt())
            .user(format!(
                "Conversation so far:\n{}\n\nCurrent lead score: {}",
                render_transcript(ctx.transcript),
                score
            ))
            .build();

        let options = GenerationOptions {
            max_tokens: self.engine.analysis_max_tokens,
            temperature: self.engine.analysis_temperature,
            timeout: self.timeout_for(ctx.client),
        };

        let raw = self.call_backend(&messages, options).await?;
        let intelligence = LeadIntelligence::parse(&raw, score, ctx.user_turns)?;
        Ok(intelligence.into_update(score, ctx.user_turns))
    }
}
