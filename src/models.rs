use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sampling temperature sent with every generation request.
pub const GENERATION_TEMPERATURE: f64 = 0.3;
/// Upper bound on generated output length, in tokens.
pub const GENERATION_MAX_TOKENS: u32 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LanguageHint {
  #[default]
  Auto,
  Python,
  JavaScript,
  TypeScript,
  Java,
  Cpp,
  Rust,
  Go,
  CSharp,
}

impl LanguageHint {
  pub const ALL: [LanguageHint; 9] = [
    LanguageHint::Auto,
    LanguageHint::Python,
    LanguageHint::JavaScript,
    LanguageHint::TypeScript,
    LanguageHint::Java,
    LanguageHint::Cpp,
    LanguageHint::Rust,
    LanguageHint::Go,
    LanguageHint::CSharp,
  ];

  pub fn tag(self) -> &'static str {
    match self {
      LanguageHint::Auto => "auto",
      LanguageHint::Python => "python",
      LanguageHint::JavaScript => "javascript",
      LanguageHint::TypeScript => "typescript",
      LanguageHint::Java => "java",
      LanguageHint::Cpp => "cpp",
      LanguageHint::Rust => "rust",
      LanguageHint::Go => "go",
      LanguageHint::CSharp => "csharp",
    }
  }

  /// Value for the `language` field of a generate request; `None` lets the
  /// service detect the language itself.
  pub fn wire_value(self) -> Option<&'static str> {
    match self {
      LanguageHint::Auto => None,
      other => Some(other.tag()),
    }
  }
}

impl fmt::Display for LanguageHint {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.tag())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown language '{0}'")]
pub struct UnknownLanguage(pub String);

impl FromStr for LanguageHint {
  type Err = UnknownLanguage;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let normalized = s.trim().to_ascii_lowercase();
    match normalized.as_str() {
      "" | "auto" | "unspecified" => return Ok(LanguageHint::Auto),
      "c++" => return Ok(LanguageHint::Cpp),
      "c#" => return Ok(LanguageHint::CSharp),
      "js" => return Ok(LanguageHint::JavaScript),
      "ts" => return Ok(LanguageHint::TypeScript),
      _ => {}
    }
    LanguageHint::ALL
      .into_iter()
      .find(|hint| hint.tag() == normalized)
      .ok_or_else(|| UnknownLanguage(s.trim().to_string()))
  }
}

/// Service-issued identifier of a generated artifact. Sent back in the same
/// JSON representation it arrived in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ArtifactId {
  Numeric(u64),
  Text(String),
}

impl fmt::Display for ArtifactId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ArtifactId::Numeric(n) => write!(f, "{}", n),
      ArtifactId::Text(s) => f.write_str(s),
    }
  }
}

impl From<u64> for ArtifactId {
  fn from(n: u64) -> Self {
    ArtifactId::Numeric(n)
  }
}

impl From<&str> for ArtifactId {
  fn from(s: &str) -> Self {
    ArtifactId::Text(s.to_string())
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
  pub prompt: String,
  pub language: LanguageHint,
  pub temperature: f64,
  pub max_tokens: u32,
}

impl GenerationRequest {
  /// Returns `None` when the prompt is blank after trimming.
  pub fn new(prompt: &str, language: LanguageHint) -> Option<Self> {
    if prompt.trim().is_empty() {
      return None;
    }
    Some(Self {
      prompt: prompt.to_string(),
      language,
      temperature: GENERATION_TEMPERATURE,
      max_tokens: GENERATION_MAX_TOKENS,
    })
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationResult {
  pub code: String,
  pub language: String, // resolved, never "auto"
  pub model_name: String,
  pub generation_time_ms: u64,
  pub artifact_id: ArtifactId,
  pub received_at: String,
}

impl GenerationResult {
  pub fn summary(&self) -> String {
    format!(
      "Generated {} code with {} in {}ms",
      self.language, self.model_name, self.generation_time_ms
    )
  }
}

/// A rating in `1..=5`. Zero means "not yet rated" and is not a `Rating`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Rating(u8);

impl Rating {
  pub const MIN: i64 = 1;
  pub const MAX: i64 = 5;

  pub fn new(value: i64) -> Option<Self> {
    if (Self::MIN..=Self::MAX).contains(&value) {
      Some(Rating(value as u8))
    } else {
      None
    }
  }

  pub fn get(self) -> u8 {
    self.0
  }
}

/// Pending rating and comment text entered against the current artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedbackDraft {
  pub rating: i64, // 0 = unset
  pub comments: String,
}

impl FeedbackDraft {
  pub fn is_empty(&self) -> bool {
    self.rating == 0 && self.comments.is_empty()
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackRequest {
  pub artifact_id: ArtifactId,
  pub rating: Rating,
  pub comments: Option<String>,
}

impl FeedbackRequest {
  pub fn new(artifact_id: ArtifactId, rating: Rating, comments: &str) -> Self {
    let comments = if comments.trim().is_empty() {
      None
    } else {
      Some(comments.to_string())
    };
    Self { artifact_id, rating, comments }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedbackAck {
  pub message: String,
  pub feedback_id: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPerformance {
  pub model: String,
  #[serde(default)]
  pub avg_rating: f64,
  #[serde(default)]
  pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
  pub total_prompts: u64,
  pub total_feedback: u64,
  pub avg_rating: f64,
  pub learning_patterns: u64,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub total_outputs: Option<u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub total_users: Option<u64>,
  #[serde(default)]
  pub model_performance: Vec<ModelPerformance>,
}

/// The single status line shown to the user. Every coordinator action
/// overwrites it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "type", content = "message", rename_all = "lowercase")]
pub enum WorkflowStatus {
  #[default]
  Idle,
  Info(String),
  Success(String),
  Error(String),
}

impl WorkflowStatus {
  pub fn message(&self) -> Option<&str> {
    match self {
      WorkflowStatus::Idle => None,
      WorkflowStatus::Info(m) | WorkflowStatus::Success(m) | WorkflowStatus::Error(m) => Some(m),
    }
  }

  pub fn is_error(&self) -> bool {
    matches!(self, WorkflowStatus::Error(_))
  }
}

pub fn now_iso() -> String {
  let t = time::OffsetDateTime::now_utc();
  t.format(&time::format_description::well_known::Rfc3339)
    .unwrap_or_else(|_| "1970-01-01T00:00:00Z".to_string())
}

pub fn new_action_id() -> String {
  uuid::Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_language_hint_parse() {
    assert_eq!("auto".parse::<LanguageHint>().unwrap(), LanguageHint::Auto);
    assert_eq!("".parse::<LanguageHint>().unwrap(), LanguageHint::Auto);
    assert_eq!("Python".parse::<LanguageHint>().unwrap(), LanguageHint::Python);
    assert_eq!("c++".parse::<LanguageHint>().unwrap(), LanguageHint::Cpp);
    assert_eq!("csharp".parse::<LanguageHint>().unwrap(), LanguageHint::CSharp);
    assert!("cobol".parse::<LanguageHint>().is_err());
  }

  #[test]
  fn test_language_hint_wire_value() {
    assert_eq!(LanguageHint::Auto.wire_value(), None);
    assert_eq!(LanguageHint::Rust.wire_value(), Some("rust"));
  }

  #[test]
  fn test_generation_request_rejects_blank_prompt() {
    for prompt in ["", " ", "\n\t  ", "\r\n"] {
      assert!(GenerationRequest::new(prompt, LanguageHint::Auto).is_none());
    }
    let req = GenerationRequest::new("  sort a list ", LanguageHint::Go).unwrap();
    assert_eq!(req.prompt, "  sort a list ");
    assert_eq!(req.temperature, GENERATION_TEMPERATURE);
    assert_eq!(req.max_tokens, GENERATION_MAX_TOKENS);
  }

  #[test]
  fn test_rating_bounds() {
    assert!(Rating::new(0).is_none());
    assert!(Rating::new(-1).is_none());
    assert!(Rating::new(6).is_none());
    for v in 1..=5 {
      assert_eq!(Rating::new(v).unwrap().get() as i64, v);
    }
  }

  #[test]
  fn test_feedback_request_normalizes_comments() {
    let id = ArtifactId::from("abc123");
    let rating = Rating::new(4).unwrap();
    assert_eq!(FeedbackRequest::new(id.clone(), rating, "").comments, None);
    assert_eq!(FeedbackRequest::new(id.clone(), rating, "   ").comments, None);
    assert_eq!(
      FeedbackRequest::new(id, rating, "great").comments.as_deref(),
      Some("great")
    );
  }

  #[test]
  fn test_artifact_id_keeps_json_representation() {
    let numeric: ArtifactId = serde_json::from_str("42").unwrap();
    assert_eq!(numeric, ArtifactId::Numeric(42));
    assert_eq!(serde_json::to_string(&numeric).unwrap(), "42");

    let text: ArtifactId = serde_json::from_str("\"abc123\"").unwrap();
    assert_eq!(text.to_string(), "abc123");
    assert_eq!(serde_json::to_string(&text).unwrap(), "\"abc123\"");
  }

  #[test]
  fn test_statistics_snapshot_optional_fields() {
    let snap: StatisticsSnapshot = serde_json::from_str(
      r#"{"total_prompts": 3, "total_feedback": 2, "avg_rating": 4.5, "learning_patterns": 1}"#,
    ).unwrap();
    assert_eq!(snap.total_prompts, 3);
    assert_eq!(snap.total_outputs, None);
    assert!(snap.model_performance.is_empty());
  }

  #[test]
  fn test_status_serializes_like_status_bar() {
    let v = serde_json::to_value(WorkflowStatus::Error("No code to rate".into())).unwrap();
    assert_eq!(v, serde_json::json!({ "type": "error", "message": "No code to rate" }));
  }
}
