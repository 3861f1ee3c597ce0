// ── Scoring: Heuristic Feature Extractors ──────────────────────────────────
//
// Pure, synchronous, deterministic signals over the concatenated
// conversation text. No I/O here; the recall-backed signals live in
// similarity.rs.
//
// All lexicons are fixed English keyword lists, matched case-insensitively
// as substrings. Bucket weights are additive per hit and clamped to 10.

// ═══════════════════════════════════════════════════════════════════════════
// Lexicons
// ═══════════════════════════════════════════════════════════════════════════

/// Emphasis phrases that force the top tier regardless of computed score.
const EMPHASIS_MARKERS: &[&str] = &[
    "remember",
    "don't forget",
    "important",
    "critical",
    "essential",
    "always",
    "never",
    "make sure",
    "keep in mind",
    "note that",
];

// ── Emotional weight buckets ───────────────────────────────────────────────

const PREFERENCE_WORDS: &[&str] = &[
    "love", "hate", "prefer", "favorite", "like", "dislike", "enjoy", "can't stand",
];

const NEGATIVE_WORDS: &[&str] = &[
    "angry", "frustrated", "annoyed", "upset", "worried", "disappointed",
];

const CONCERN_WORDS: &[&str] = &[
    "problem", "issue", "broken", "failed", "error", "urgent", "blocker",
];

const POSITIVE_WORDS: &[&str] = &["great", "excellent", "perfect", "awesome", "happy", "glad"];

// ── Time sensitivity buckets ───────────────────────────────────────────────

const URGENT_WORDS: &[&str] = &["urgent", "asap", "immediately", "right away", "right now"];

const DEADLINE_WORDS: &[&str] = &[
    "deadline", "due", "by tomorrow", "by monday", "by friday", "end of day", "eod",
];

const FUTURE_WORDS: &[&str] = &["next week", "next month", "upcoming", "later this", "soon"];

const RECURRING_WORDS: &[&str] = &[
    "every day", "every week", "daily", "weekly", "monthly", "each time",
];

// ── Future utility buckets ─────────────────────────────────────────────────

/// Durable personal/operational facts: preferences, credentials, goals,
/// scheduling, configuration.
const HIGH_UTILITY_WORDS: &[&str] = &[
    "prefer", "password", "credential", "api key", "token", "goal", "schedule", "meeting",
    "config", "setting", "address", "email", "phone",
];

const MEDIUM_UTILITY_WORDS: &[&str] = &[
    "project", "deadline", "tool", "workflow", "name is", "working on", "decided",
];

/// Matched against the *entire* trimmed content, not as substrings:
/// "thanks for fixing the config" is not a throwaway message.
const LOW_UTILITY_PHRASES: &[&str] = &[
    "hi", "hello", "hey", "thanks", "thank you", "ok", "okay", "bye", "goodbye",
    "good morning", "good night",
];

// ═══════════════════════════════════════════════════════════════════════════
// Extractors
// ═══════════════════════════════════════════════════════════════════════════

/// True when any emphasis phrase appears in the content.
/// This also arms the store_explicit override in the action resolver.
pub fn has_emphasis_marker(content: &str) -> bool {
    let t = content.to_lowercase();
    contains_any(&t, EMPHASIS_MARKERS)
}

/// Emphasis as a scoring factor: all-or-nothing 10.
pub fn explicit_emphasis(content: &str) -> u8 {
    if has_emphasis_marker(content) {
        10
    } else {
        0
    }
}

/// Additive emotional signal: concern ×3, preference/negative ×2,
/// positive ×1 per lexicon hit, clamped to 10.
pub fn emotional_weight(content: &str) -> u8 {
    let t = content.to_lowercase();
    let score = count_hits(&t, CONCERN_WORDS) * 3
        + count_hits(&t, PREFERENCE_WORDS) * 2
        + count_hits(&t, NEGATIVE_WORDS) * 2
        + count_hits(&t, POSITIVE_WORDS);
    score.min(10) as u8
}

/// Additive urgency signal: urgent/deadline ×3, future/recurring ×2
/// per hit, clamped to 10.
pub fn time_sensitivity(content: &str) -> u8 {
    let t = content.to_lowercase();
    let score = count_hits(&t, URGENT_WORDS) * 3
        + count_hits(&t, DEADLINE_WORDS) * 3
        + count_hits(&t, FUTURE_WORDS) * 2
        + count_hits(&t, RECURRING_WORDS) * 2;
    score.min(10) as u8
}

/// How useful this is likely to be in a future conversation.
///
/// Starts at the midpoint 5. Exactly one utility bucket applies, checked
/// high → medium → low: +2 for durable facts, +1 for work context, −2
/// when the whole message is a greeting/thanks. Longer conversations
/// (> 3 segments) get +1.
pub fn future_utility(content: &str, segment_count: usize) -> u8 {
    let t = content.to_lowercase();
    let mut score: i32 = 5;

    if contains_any(&t, HIGH_UTILITY_WORDS) {
        score += 2;
    } else if contains_any(&t, MEDIUM_UTILITY_WORDS) {
        score += 1;
    } else if LOW_UTILITY_PHRASES.iter().any(|p| t.trim() == *p) {
        score -= 2;
    }

    if segment_count > 3 {
        score += 1;
    }

    score.clamp(0, 10) as u8
}

// ═══════════════════════════════════════════════════════════════════════════
// Helpers
// ═══════════════════════════════════════════════════════════════════════════

fn contains_any(s: &str, terms: &[&str]) -> bool {
    terms.iter().any(|t| s.contains(t))
}

/// Number of lexicon entries present in `s` (each entry counts once).
fn count_hits(s: &str, terms: &[&str]) -> usize {
    terms.iter().filter(|t| s.contains(*t)).count()
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════
