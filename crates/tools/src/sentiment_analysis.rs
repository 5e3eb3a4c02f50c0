//! Sentiment analysis worker.
//!
//! A small lexicon-based polarity scorer. Each sentiment word carries a score
//! in `[-1.0, 1.0]`; an intensifier directly before it scales the score and a
//! negator flips and damps it. The polarity of the text is the mean over all
//! scored words, clamped to `[-1.0, 1.0]`.

use async_trait::async_trait;
use patternrun_core::error::ToolError;
use patternrun_core::tool::{Tool, ToolArgs};
use serde_json::{Value, json};

const DOCUMENTATION: &str = "\
Analyzes the sentiment of the given text.

Args:
    text (str): The text to analyze.

Returns:
    An object containing the polarity score (-1.0 to 1.0) and a sentiment label
    (positive, negative or neutral).

Example Usage:
    [[WORKER: {\"name\": \"sentiment_analysis\", \"args\": {\"text\": \"This movie was fantastic!\"}}]]";

const LEXICON: &[(&str, f64)] = &[
    ("amazing", 0.6),
    ("awesome", 1.0),
    ("awful", -1.0),
    ("bad", -0.7),
    ("beautiful", 0.85),
    ("best", 1.0),
    ("boring", -1.0),
    ("broken", -0.4),
    ("brilliant", 0.9),
    ("dangerous", -0.6),
    ("delightful", 1.0),
    ("disappointing", -0.6),
    ("excellent", 1.0),
    ("fantastic", 0.4),
    ("fine", 0.4),
    ("good", 0.7),
    ("great", 0.8),
    ("happy", 0.8),
    ("hate", -0.8),
    ("horrible", -1.0),
    ("love", 0.5),
    ("nice", 0.6),
    ("poor", -0.4),
    ("sad", -0.5),
    ("terrible", -1.0),
    ("ugly", -0.7),
    ("vulnerable", -0.3),
    ("wonderful", 1.0),
    ("worse", -0.4),
    ("worst", -1.0),
];

const INTENSIFIERS: &[(&str, f64)] = &[
    ("extremely", 1.5),
    ("incredibly", 1.4),
    ("really", 1.3),
    ("so", 1.3),
    ("very", 1.3),
    ("quite", 1.1),
    ("slightly", 0.6),
    ("somewhat", 0.7),
];

const NEGATORS: &[&str] = &["not", "no", "never", "nothing", "nor"];

const NEGATION_FACTOR: f64 = -0.5;

/// Unit worker; holds no state.
pub struct SentimentAnalysisTool;

#[async_trait]
impl Tool for SentimentAnalysisTool {
    fn name(&self) -> &str {
        "sentiment_analysis"
    }

    fn documentation(&self) -> &str {
        DOCUMENTATION
    }

    async fn execute(&self, args: ToolArgs) -> Result<Value, ToolError> {
        let text = args
            .get("text")
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'text' argument".into()))?;

        let polarity = polarity(text);
        Ok(json!({
            "polarity": polarity,
            "sentiment": label(polarity),
        }))
    }
}

fn lookup(table: &[(&str, f64)], word: &str) -> Option<f64> {
    table.iter().find(|(w, _)| *w == word).map(|(_, score)| *score)
}

fn is_negator(word: &str) -> bool {
    NEGATORS.contains(&word) || word.ends_with("n't")
}

fn polarity(text: &str) -> f64 {
    let mut scores = Vec::new();
    let mut modifier = 1.0;

    let words = text
        .split(|c: char| !(c.is_alphanumeric() || c == '\''))
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase);

    for word in words {
        if let Some(score) = lookup(LEXICON, &word) {
            scores.push((score * modifier).clamp(-1.0, 1.0));
            modifier = 1.0;
        } else if let Some(factor) = lookup(INTENSIFIERS, &word) {
            modifier *= factor;
        } else if is_negator(&word) {
            modifier *= NEGATION_FACTOR;
        } else {
            modifier = 1.0;
        }
    }

    if scores.is_empty() {
        return 0.0;
    }
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    mean.clamp(-1.0, 1.0)
}

fn label(polarity: f64) -> &'static str {
    if polarity > 0.0 {
        "positive"
    } else if polarity < 0.0 {
        "negative"
    } else {
        "neutral"
    }
}
