//! Individual recovery strategies for locating a JSON array in model output.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

/// One way of pulling a JSON array out of raw text.
///
/// A strategy either yields a parsed top-level array or nothing; it never
/// errors, so strategies can be chained freely.
pub trait ExtractionStrategy: Send + Sync {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Returns the parsed array, or `None` if this strategy does not apply.
    fn try_extract(&self, raw: &str) -> Option<Value>;
}

/// Parses `candidate` and keeps it only if the top-level value is an array.
fn parse_array(candidate: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(candidate) {
        Ok(value @ Value::Array(_)) => Some(value),
        _ => None,
    }
}

/// Parses the whole text as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectParse;

impl ExtractionStrategy for DirectParse {
    fn name(&self) -> &'static str {
        "direct"
    }

    fn try_extract(&self, raw: &str) -> Option<Value> {
        parse_array(raw.trim())
    }
}

/// Parses the inner text of the first triple-backtick block.
#[derive(Debug, Clone, Copy, Default)]
pub struct FencedBlock;

fn fence_pattern() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| {
        Regex::new(r"```(?:json)?\s*([\s\S]*?)```").expect("fence pattern is valid")
    })
}

impl ExtractionStrategy for FencedBlock {
    fn name(&self) -> &'static str {
        "fenced_block"
    }

    fn try_extract(&self, raw: &str) -> Option<Value> {
        let caps = fence_pattern().captures(raw)?;
        let inner = caps.get(1)?.as_str().trim();
        if inner.is_empty() {
            return None;
        }
        parse_array(inner)
    }
}

/// Parses the span between the first `[` and the last `]`, inclusive.
#[derive(Debug, Clone, Copy, Default)]
pub struct BracketSpan;

impl ExtractionStrategy for BracketSpan {
    fn name(&self) -> &'static str {
        "bracket_span"
    }

    fn try_extract(&self, raw: &str) -> Option<Value> {
        let start = raw.find('[')?;
        let end = raw.rfind(']')?;
        if end <= start {
            return None;
        }
        parse_array(&raw[start..=end])
    }
}

/// The cascade in the order it must run.
pub fn default_strategies() -> Vec<Box<dyn ExtractionStrategy>> {
    vec![
        Box::new(DirectParse),
        Box::new(FencedBlock),
        Box::new(BracketSpan),
    ]
}
