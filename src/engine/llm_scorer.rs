// ── External-Model Scorer ──────────────────────────────────────────────────
//
// Optional delegation of importance scoring to a chat-completion endpoint.
// The prompt describes the three tiers with the LIVE thresholds (never
// hardcoded) and asks for a bare JSON verdict. Any failure (timeout,
// non-2xx, malformed JSON, missing fields) surfaces as an `EngineError`
// that the scoring pipeline converts into a transparent fallback to the
// heuristic path. The model's tier label is advisory only: the engine
// re-derives the tier from the returned score.

use log::info;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::{ConversationSegment, LlmScorerConfig, ScoringConfig};

/// Parsed model verdict. `tier_label` is what the model claimed; callers
/// must derive the authoritative tier from `score`.
#[derive(Debug, Clone)]
pub struct LlmVerdict {
    pub score: u8,
    pub tier_label: String,
    pub reasoning: String,
}

/// Raw response contract: `{score, tier, reasoning}`, all fields required.
#[derive(Deserialize)]
struct RawVerdict {
    score: f64,
    tier: String,
    reasoning: String,
}

/// Ask the configured endpoint to rate the conversation.
pub async fn score_with_model(
    client: &Client,
    llm: &LlmScorerConfig,
    config: &ScoringConfig,
    segments: &[ConversationSegment],
) -> EngineResult<LlmVerdict> {
    let url = format!("{}/chat/completions", llm.base_url.trim_end_matches('/'));
    let body = json!({
        "model": llm.model,
        "messages": [
            { "role": "system", "content": system_prompt(config) },
            { "role": "user", "content": format_transcript(segments) },
        ],
        "temperature": llm.temperature,
        "max_tokens": llm.max_tokens,
    });

    let mut request = client
        .post(&url)
        .json(&body)
        .timeout(Duration::from_secs(llm.timeout_secs));
    if let Some(key) = &llm.api_key {
        request = request.bearer_auth(key);
    }

    let resp = request.send().await?;
    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        return Err(EngineError::Llm(format!("scoring endpoint {} — {}", status, text)));
    }

    let v: Value = resp.json().await?;
    let content = v["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| EngineError::Llm("no choices[0].message.content in response".into()))?;

    let verdict = parse_verdict(content)?;
    info!(
        "[llm] model {} scored {} (tier label \"{}\")",
        llm.model, verdict.score, verdict.tier_label
    );
    Ok(verdict)
}

/// System instruction, filled from the live config so threshold changes
/// flow into the prompt without a redeploy.
fn system_prompt(config: &ScoringConfig) -> String {
    format!(
        "You rate how important a conversation is to remember, on an integer \
         scale from 0 to 10. Retention tiers: scores of {explicit} or higher are \
         \"explicit\" (kept permanently); scores from {ephemeral} to {below_explicit} \
         are \"silent\" (kept for weeks, extended if referenced again); scores below \
         {ephemeral} are \"ephemeral\" (discarded within days). Consider stated \
         preferences, credentials, goals, deadlines, and emotional weight. Respond \
         with ONLY a JSON object: {{\"score\": <0-10>, \"tier\": \"<tier>\", \
         \"reasoning\": \"<one sentence>\"}}",
        explicit = config.explicit_threshold,
        ephemeral = config.ephemeral_threshold,
        below_explicit = config.explicit_threshold - 1,
    )
}

/// Role-tagged transcript, one line per segment.
fn format_transcript(segments: &[ConversationSegment]) -> String {
    segments
        .iter()
        .map(|s| format!("{}: {}", s.role.as_str(), s.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Strict parse of the model's verdict. Markdown code fences are
/// tolerated; anything else malformed is an error, routed to the same
/// fallback as a network failure.
fn parse_verdict(content: &str) -> EngineResult<LlmVerdict> {
    let stripped = strip_code_fences(content);
    let raw: RawVerdict = serde_json::from_str(stripped)
        .map_err(|e| EngineError::Llm(format!("unparseable verdict: {}", e)))?;

    Ok(LlmVerdict {
        score: raw.score.round().clamp(0.0, 10.0) as u8,
        tier_label: raw.tier,
        reasoning: raw.reasoning,
    })
}

/// Remove a surrounding ```…``` fence (with optional language tag).
fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return trimmed;
    };
    // Drop a language tag like `json` on the opening fence line
    match body.split_once('\n') {
        Some((first_line, remainder)) if !first_line.trim().starts_with('{') => remainder.trim(),
        _ => body.trim(),
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_json() {
        let v = parse_verdict(r#"{"score": 8, "tier": "explicit", "reasoning": "credentials"}"#)
            .unwrap();
        assert_eq!(v.score, 8);
        assert_eq!(v.tier_label, "explicit");
        assert_eq!(v.reasoning, "credentials");
    }

    #[test]
    fn test_parse_fenced_json() {
        let content = "```json\n{\"score\": 5, \"tier\": \"silent\", \"reasoning\": \"meh\"}\n```";
        let v = parse_verdict(content).unwrap();
        assert_eq!(v.score, 5);
    }

    #[test]
    fn test_parse_fence_without_language_tag() {
        let content = "```\n{\"score\": 3, \"tier\": \"ephemeral\", \"reasoning\": \"chit-chat\"}\n```";
        assert_eq!(parse_verdict(content).unwrap().score, 3);
    }

    #[test]
    fn test_parse_rejects_missing_fields() {
        assert!(parse_verdict(r#"{"score": 8}"#).is_err());
        assert!(parse_verdict(r#"{"tier": "silent", "reasoning": "x"}"#).is_err());
    }

    #[test]
    fn test_parse_rejects_prose() {
        assert!(parse_verdict("I'd rate this an 8 out of 10.").is_err());
    }

    #[test]
    fn test_out_of_range_score_clamped() {
        let v = parse_verdict(r#"{"score": 14, "tier": "explicit", "reasoning": "x"}"#).unwrap();
        assert_eq!(v.score, 10);
        let v = parse_verdict(r#"{"score": -2, "tier": "ephemeral", "reasoning": "x"}"#).unwrap();
        assert_eq!(v.score, 0);
    }

    #[test]
    fn test_fractional_score_rounded() {
        let v = parse_verdict(r#"{"score": 6.6, "tier": "silent", "reasoning": "x"}"#).unwrap();
        assert_eq!(v.score, 7);
    }

    #[test]
    fn test_system_prompt_uses_live_thresholds() {
        let config = ScoringConfig { explicit_threshold: 9, ephemeral_threshold: 2, ..Default::default() };
        let prompt = system_prompt(&config);
        assert!(prompt.contains("scores of 9 or higher"));
        assert!(prompt.contains("scores from 2 to 8"));
    }

    #[test]
    fn test_transcript_is_role_tagged() {
        let segments = vec![
            ConversationSegment::user("I prefer dark mode"),
            ConversationSegment::assistant("Noted."),
        ];
        assert_eq!(
            format_transcript(&segments),
            "user: I prefer dark mode\nassistant: Noted."
        );
    }
}
