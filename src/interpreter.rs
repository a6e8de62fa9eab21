//! Cascading interpretation of raw model output.
//!
//! Vision models routinely ignore the requested response schema: they wrap
//! JSON in prose, drop the fence markers, or answer with bare coordinates.
//! The cascade below tries a fixed, priority-ordered list of extraction
//! strategies and takes the first syntactically valid payload. It never
//! fails: when nothing matches, a fixed sentinel payload is returned so the
//! pipeline always terminates with a structurally valid mapping.
//!
//! The strategy order is load-bearing. A fenced block is the model following
//! instructions and always wins over a stray brace match elsewhere in the
//! text; synthesized coordinate payloads are last-resort guesses.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Map, Value};

/// Prompt carried by the sentinel payload when no strategy matched.
pub const SENTINEL_PROMPT: &str = "failed to parse";

/// Prompt carried by payloads synthesized from bare coordinates.
pub const EXTRACTED_PROMPT: &str = "extracted from response";

type Strategy = fn(&str) -> Option<Map<String, Value>>;

/// Priority-ordered extraction cascade, first success wins.
const STRATEGIES: &[(&str, Strategy)] = &[
    ("fenced_json_block", fenced_json_block),
    ("brace_scan", brace_scan),
    ("bracket_pairs", bracket_pairs),
    ("loose_pairs", loose_pairs),
];

/// Interpret raw assistant text into a generic structured mapping.
///
/// The result is not yet validated against any task schema; each reasoner
/// reshapes it, filling missing required fields with its documented defaults.
pub fn interpret(text: &str) -> Map<String, Value> {
    for (name, strategy) in STRATEGIES {
        if let Some(payload) = strategy(text) {
            tracing::debug!(strategy = name, "response interpreted");
            return payload;
        }
    }
    tracing::warn!("no extraction strategy matched, returning sentinel payload");
    sentinel_payload()
}

/// The fixed payload returned when nothing in the text is recognizable.
pub fn sentinel_payload() -> Map<String, Value> {
    as_object(json!({
        "challenge_prompt": SENTINEL_PROMPT,
        "coordinates": [{ "box_2d": [1, 1] }],
    }))
}

/// Strategy 1: the content of the first ```json fenced block, when it parses
/// to a JSON object.
fn fenced_json_block(text: &str) -> Option<Map<String, Value>> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| Regex::new(r"(?s)```json\s*(.*?)```").unwrap());

    let captures = pattern.captures(text)?;
    parse_object(captures.get(1)?.as_str())
}

/// Strategy 2: brace-delimited substrings anywhere in the text, supporting
/// one level of nested braces. The first substring that parses to an object
/// wins.
fn brace_scan(text: &str) -> Option<Map<String, Value>> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern =
        PATTERN.get_or_init(|| Regex::new(r"\{[^{}]*(?:\{[^{}]*\}[^{}]*)*\}").unwrap());

    pattern
        .find_iter(text)
        .find_map(|candidate| parse_object(candidate.as_str()))
}

/// Strategy 3: bracket-enclosed coordinate pairs `[a, b]`, one synthesized
/// coordinate entry per match.
fn bracket_pairs(text: &str) -> Option<Map<String, Value>> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| Regex::new(r"\[(\d+),\s*(\d+)\]").unwrap());

    let coordinates: Vec<Value> = pattern
        .captures_iter(text)
        .filter_map(|captures| {
            let x: i64 = captures[1].parse().ok()?;
            let y: i64 = captures[2].parse().ok()?;
            Some(json!({ "box_2d": [x, y] }))
        })
        .collect();

    if coordinates.is_empty() {
        return None;
    }
    Some(as_object(json!({
        "challenge_prompt": EXTRACTED_PROMPT,
        "coordinates": coordinates,
    })))
}

/// Strategy 4: loosely formatted `a, b` number pairs, capped at 3 entries.
fn loose_pairs(text: &str) -> Option<Map<String, Value>> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| Regex::new(r"(\d+)\s*,\s*(\d+)").unwrap());

    let coordinates: Vec<Value> = pattern
        .captures_iter(text)
        .take(3)
        .filter_map(|captures| {
            let x: i64 = captures[1].parse().ok()?;
            let y: i64 = captures[2].parse().ok()?;
            Some(json!({ "box_2d": [x, y] }))
        })
        .collect();

    if coordinates.is_empty() {
        return None;
    }
    Some(as_object(json!({
        "challenge_prompt": EXTRACTED_PROMPT,
        "coordinates": coordinates,
    })))
}

/// Parse a candidate substring, accepting only JSON objects. Valid JSON that
/// is not an object counts as a miss so the cascade can keep going.
fn parse_object(candidate: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

fn as_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => unreachable!("literal is an object"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fenced_block_round_trips() {
        let text = concat!(
            "Here is my answer:\n",
            "```json\n",
            "{\"challenge_prompt\": \"x\", \"points\": [{\"x\": 10, \"y\": 20}]}\n",
            "```\n",
            "Hope that helps!"
        );
        let payload = interpret(text);
        assert_eq!(payload["challenge_prompt"], "x");
        assert_eq!(payload["points"][0]["x"], 10);
        assert_eq!(payload["points"][0]["y"], 20);
    }

    #[test]
    fn fenced_block_beats_other_braces_in_the_text() {
        let text = "prelude {\"decoy\": true} then ```json\n{\"challenge_prompt\": \"real\"}\n```";
        let payload = interpret(text);
        assert_eq!(payload["challenge_prompt"], "real");
    }

    #[test]
    fn malformed_fenced_block_falls_through_to_brace_scan() {
        let text = "```json\nnot json at all\n``` but later {\"challenge_prompt\": \"rescued\"}";
        let payload = interpret(text);
        assert_eq!(payload["challenge_prompt"], "rescued");
    }

    #[test]
    fn brace_scan_handles_one_level_of_nesting() {
        let text = "The answer is {\"outer\": {\"inner\": 1}, \"n\": 2} as requested.";
        let payload = interpret(text);
        assert_eq!(payload["outer"]["inner"], 1);
        assert_eq!(payload["n"], 2);
    }

    #[test]
    fn brace_scan_skips_invalid_candidates() {
        let text = "{not valid} {\"challenge_prompt\": \"second\"}";
        let payload = interpret(text);
        assert_eq!(payload["challenge_prompt"], "second");
    }

    #[test]
    fn bracket_pair_synthesizes_coordinates() {
        let payload = interpret("I would click at [3, 4] on the image.");
        assert_eq!(payload["challenge_prompt"], EXTRACTED_PROMPT);
        assert_eq!(payload["coordinates"][0]["box_2d"][0], 3);
        assert_eq!(payload["coordinates"][0]["box_2d"][1], 4);
        assert_eq!(payload["coordinates"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn loose_pairs_are_capped_at_three() {
        let payload = interpret("click 10, 20 then 30, 40 then 50, 60 then 70, 80");
        assert_eq!(payload["challenge_prompt"], EXTRACTED_PROMPT);
        assert_eq!(payload["coordinates"].as_array().unwrap().len(), 3);
        assert_eq!(payload["coordinates"][2]["box_2d"][0], 50);
    }

    #[test]
    fn unparseable_text_returns_the_sentinel() {
        let payload = interpret("I am sorry but I cannot see the image.");
        assert_eq!(payload["challenge_prompt"], SENTINEL_PROMPT);
        assert_eq!(payload["coordinates"][0]["box_2d"][0], 1);
        assert_eq!(payload["coordinates"][0]["box_2d"][1], 1);
    }

    #[test]
    fn interpretation_is_deterministic() {
        let text = "nothing recognizable here";
        assert_eq!(interpret(text), interpret(text));
    }

    #[test]
    fn non_object_json_in_fence_is_a_miss() {
        // A bare array is valid JSON but not a payload; the bracket strategy
        // should pick the coordinates up instead.
        let payload = interpret("```json\n[5, 6]\n```");
        assert_eq!(payload["challenge_prompt"], EXTRACTED_PROMPT);
        assert_eq!(payload["coordinates"][0]["box_2d"][0], 5);
    }
}
