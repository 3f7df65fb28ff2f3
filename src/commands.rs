use std::path::PathBuf;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::JoinHandle;

use crate::api::CodegenService;
use crate::models::*;
use crate::workflows::{ErrorKind, Workflow, WorkflowError};

pub const HELP: &str = "\
commands:
  gen <prompt>          generate code (a bare line is also a prompt)
  lang <tag>            set the target language (auto, python, rust, ...)
  langs                 list language tags
  rate <1-5> [comment]  rate the current artifact and submit
  comment <text>        set the comment for the next rating
  submit                submit the pending rating
  show                  print the current artifact
  save <path>           write the current artifact's code to a file
  clear                 discard the artifact and pending rating
  stats                 refresh and print usage statistics
  health                check the service
  status                print the status line
  quit                  exit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
  Generate(String),
  Language(LanguageHint),
  Languages,
  Rate { rating: i64, comments: Option<String> },
  Comment(String),
  Submit,
  Show,
  Save(PathBuf),
  Clear,
  Stats,
  Health,
  Status,
  Help,
  Quit,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
  #[error("empty command")]
  Empty,
  #[error("'{0}' needs an argument")]
  MissingArgument(&'static str),
  #[error("rating must be a number, got '{0}'")]
  BadRating(String),
  #[error(transparent)]
  Language(#[from] UnknownLanguage),
}

pub fn parse_command(line: &str) -> Result<Command, ParseError> {
  let line = line.trim();
  if line.is_empty() {
    return Err(ParseError::Empty);
  }
  let (head, rest) = match line.split_once(char::is_whitespace) {
    Some((h, r)) => (h, r.trim()),
    None => (line, ""),
  };

  let cmd = match head.to_ascii_lowercase().as_str() {
    "gen" | "generate" => {
      if rest.is_empty() {
        return Err(ParseError::MissingArgument("gen"));
      }
      Command::Generate(rest.to_string())
    }
    "lang" | "language" => {
      if rest.is_empty() {
        return Err(ParseError::MissingArgument("lang"));
      }
      Command::Language(rest.parse()?)
    }
    "langs" | "languages" => Command::Languages,
    "rate" => {
      let (value, comments) = match rest.split_once(char::is_whitespace) {
        Some((v, c)) => (v, Some(c.trim().to_string())),
        None => (rest, None),
      };
      if value.is_empty() {
        return Err(ParseError::MissingArgument("rate"));
      }
      let rating = value.parse::<i64>().map_err(|_| ParseError::BadRating(value.to_string()))?;
      Command::Rate { rating, comments }
    }
    "comment" => Command::Comment(rest.to_string()),
    "submit" => Command::Submit,
    "show" => Command::Show,
    "save" => {
      if rest.is_empty() {
        return Err(ParseError::MissingArgument("save"));
      }
      Command::Save(PathBuf::from(rest))
    }
    "clear" => Command::Clear,
    "stats" | "statistics" => Command::Stats,
    "health" => Command::Health,
    "status" => Command::Status,
    "help" | "?" => Command::Help,
    "quit" | "exit" => Command::Quit,
    _ => Command::Generate(line.to_string()),
  };
  Ok(cmd)
}

#[derive(Debug, PartialEq)]
pub enum Outcome {
  Continue(Vec<String>),
  Quit,
}

/// Interactive front end over one [`Workflow`]. Status changes are reported
/// through the workflow's status channel, not through `Outcome`.
pub struct Console {
  workflow: Workflow,
  language: LanguageHint,
  render_task: Option<JoinHandle<()>>,
}

impl Console {
  pub fn new(workflow: Workflow) -> Self {
    Self { workflow, language: LanguageHint::Auto, render_task: None }
  }

  pub fn language(&self) -> LanguageHint {
    self.language
  }

  /// Waits for the spawned generation, if any, to finish rendering.
  pub async fn settle(&mut self) {
    if let Some(task) = self.render_task.take() {
      let _ = task.await;
    }
  }

  pub async fn execute(&mut self, cmd: Command) -> Outcome {
    let lines = match cmd {
      Command::Generate(prompt) => self.generate(&prompt),
      Command::Language(hint) => {
        self.language = hint;
        vec![format!("language set to {}", hint)]
      }
      Command::Languages => vec![LanguageHint::ALL.iter().map(|l| l.tag()).collect::<Vec<_>>().join(", ")],
      Command::Rate { rating, comments } => {
        self.workflow.set_rating(rating);
        if let Some(c) = comments {
          self.workflow.set_comments(c);
        }
        busy_line(self.workflow.submit_feedback().await.err())
      }
      Command::Comment(text) => {
        self.workflow.set_comments(text);
        vec!["comment saved".to_string()]
      }
      Command::Submit => busy_line(self.workflow.submit_feedback().await.err()),
      Command::Show => match self.workflow.artifact() {
        Some(result) => vec![render_artifact(&result)],
        None => vec!["no code generated yet".to_string()],
      },
      Command::Save(path) => self.save(&path).await,
      Command::Clear => {
        self.workflow.clear();
        vec![]
      }
      Command::Stats => match self.workflow.refresh_statistics().await.or_else(|| self.workflow.statistics()) {
        Some(snapshot) => vec![render_statistics(&snapshot)],
        None => vec!["statistics unavailable".to_string()],
      },
      Command::Health => match self.workflow.service().health().await {
        Ok(h) => vec![format!("service status: {}", h.status)],
        Err(e) => vec![format!("service unreachable: {}", e)],
      },
      Command::Status => vec![render_status(&self.workflow.status()).unwrap_or_else(|| "idle".to_string())],
      Command::Help => vec![HELP.to_string()],
      Command::Quit => return Outcome::Quit,
    };
    Outcome::Continue(lines)
  }

  fn generate(&mut self, prompt: &str) -> Vec<String> {
    match self.workflow.spawn_generate(prompt, self.language) {
      Ok(handle) => {
        self.render_task = Some(tokio::spawn(async move {
          if let Ok(Ok(result)) = handle.await {
            println!("{}", render_artifact(&result));
          }
        }));
        vec![]
      }
      Err(e) => busy_line(Some(e)),
    }
  }

  async fn save(&self, path: &std::path::Path) -> Vec<String> {
    let Some(result) = self.workflow.artifact() else {
      return vec!["no code to save".to_string()];
    };
    match tokio::fs::write(path, result.code.as_bytes()).await {
      Ok(()) => {
        tracing::debug!(path = %path.display(), artifact_id = %result.artifact_id, "artifact saved");
        vec![format!("saved {} bytes to {}", result.code.len(), path.display())]
      }
      Err(e) => vec![format!("failed to save {}: {}", path.display(), e)],
    }
  }
}

/// Busy rejections leave the status line untouched, so they are echoed here.
fn busy_line(err: Option<WorkflowError>) -> Vec<String> {
  match err {
    Some(e) if e.kind() == ErrorKind::Busy => vec![e.to_string()],
    _ => vec![],
  }
}

pub fn render_status(status: &WorkflowStatus) -> Option<String> {
  match status {
    WorkflowStatus::Idle => None,
    WorkflowStatus::Info(m) => Some(format!("[..] {}", m)),
    WorkflowStatus::Success(m) => Some(format!("[ok] {}", m)),
    WorkflowStatus::Error(m) => Some(format!("[error] {}", m)),
  }
}

pub fn render_artifact(result: &GenerationResult) -> String {
  format!(
    "```{}\n{}\n```\nartifact {} ({}, {}, {}ms, received {})",
    result.language,
    result.code.trim_end(),
    result.artifact_id,
    result.language,
    result.model_name,
    result.generation_time_ms,
    result.received_at,
  )
}

pub fn render_statistics(s: &StatisticsSnapshot) -> String {
  let mut out = format!(
    "prompts: {}  feedback: {}  avg rating: {:.1}  learning patterns: {}",
    s.total_prompts, s.total_feedback, s.avg_rating, s.learning_patterns
  );
  for perf in &s.model_performance {
    out.push_str(&format!("\n  {}: {:.1} over {} outputs", perf.model, perf.avg_rating, perf.count));
  }
  out
}

pub async fn run_repl(workflow: Workflow) -> std::io::Result<()> {
  let mut status_rx = workflow.subscribe();
  let status_task = tokio::spawn(async move {
    while status_rx.changed().await.is_ok() {
      let status = status_rx.borrow_and_update().clone();
      if let Some(line) = render_status(&status) {
        println!("{}", line);
      }
    }
  });

  let startup = workflow.clone();
  tokio::spawn(async move {
    if let Some(snapshot) = startup.settle_statistics().await {
      println!("{}", render_statistics(&snapshot));
    }
  });
  println!("type 'help' for commands");

  let mut console = Console::new(workflow);
  let mut lines = BufReader::new(tokio::io::stdin()).lines();
  while let Some(line) = lines.next_line().await? {
    let cmd = match parse_command(&line) {
      Ok(cmd) => cmd,
      Err(ParseError::Empty) => continue,
      Err(e) => {
        println!("{}", e);
        continue;
      }
    };
    match console.execute(cmd).await {
      Outcome::Quit => break,
      Outcome::Continue(out) => {
        for l in out {
          println!("{}", l);
        }
      }
    }
  }

  console.settle().await;
  status_task.abort();
  Ok(())
}
