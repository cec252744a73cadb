//! CSV batch analysis
//!
//! Reads one message per row, runs each through retrieval and generation
//! sequentially, and rewrites the output CSV after every row so partial
//! progress survives an interruption.

use crate::config::BatchConfig;
use crate::corpus::truncate_chars;
use crate::engine::Engine;
use crate::error::{PaperLensError, Result};
use crate::generation::{AnswerOutcome, GenerationParams};
use chrono::{DateTime, Local};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const SKIPPED_EMPTY: &str = "[SKIPPED: Empty message]";

/// Counters reported once the batch finishes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub analyzed: usize,
    pub errors: usize,
    pub skipped: usize,
    pub truncated: usize,
    pub output: PathBuf,
}

/// In-memory table: header row plus data rows, all padded to the same width
struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    input_col: usize,
    output_col: usize,
}

impl Table {
    fn read(path: &Path, config: &BatchConfig) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
        let mut headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();

        let input_col = headers
            .iter()
            .position(|h| h == &config.input_column)
            .ok_or_else(|| {
                PaperLensError::Config(format!(
                    "CSV must have a '{}' column. Found columns: {}",
                    config.input_column,
                    headers.join(", ")
                ))
            })?;

        let output_col = match headers.iter().position(|h| h == &config.output_column) {
            Some(col) => col,
            None => {
                headers.push(config.output_column.clone());
                headers.len() - 1
            }
        };

        let mut rows = Vec::new();
        for record in reader.records() {
            let mut row: Vec<String> = record?.iter().map(str::to_string).collect();
            row.resize(headers.len(), String::new());
            rows.push(row);
        }

        Ok(Self {
            headers,
            rows,
            input_col,
            output_col,
        })
    }

    fn write(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(&self.headers)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }
        writer.flush().map_err(|e| PaperLensError::Io {
            source: e,
            context: format!("Failed to flush {}", path.display()),
        })
    }
}

/// `<stem>_analyzed_<YYYYmmdd_HHMMSS>.csv` next to the input file
pub fn default_output_path(input: &Path, now: DateTime<Local>) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "batch".to_string());
    let name = format!("{}_analyzed_{}.csv", stem, now.format("%Y%m%d_%H%M%S"));
    match input.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

/// Analysis request wrapped around one message
pub fn analysis_prompt(message: &str) -> String {
    format!(
        "Analyze the following message comprehensively and provide a detailed assessment:

MESSAGE TO ANALYZE:
{}

ANALYSIS REQUIREMENTS:

1. SCAM ASSESSMENT
   - Is this message a scam or legitimate? Provide your confidence level (0-100%)
   - Explain your reasoning

2. SCAM TECHNIQUES IDENTIFICATION
   If this is a scam, identify each manipulation technique used and explain:
   - The specific technique name
   - How it's being deployed in this message
   - The psychological principle and the specific cognitive bias it exploits
   - Why this technique is effective on victims

3. RED FLAGS ANALYSIS
   List and explain all red flags that indicate this is fraudulent:
   - Obvious indicators
   - Subtle warning signs
   - Technical indicators (URLs, email addresses, formatting)
   - Language and tone issues

Please provide a thorough, structured analysis.",
        message
    )
}

/// Sequential batch driver over an open engine
pub struct BatchRunner<'a> {
    engine: &'a Engine,
    config: BatchConfig,
    params: GenerationParams,
}

impl<'a> BatchRunner<'a> {
    pub fn new(engine: &'a Engine, config: &BatchConfig) -> Self {
        Self {
            engine,
            config: config.clone(),
            params: engine.params_with_max_tokens(config.max_tokens),
        }
    }

    pub fn run(&self, input: &Path, output: Option<&Path>) -> Result<BatchSummary> {
        let mut table = Table::read(input, &self.config)?;
        let output = output
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_output_path(input, Local::now()));

        info!(
            "Loaded {} rows from {}, writing to {}",
            table.rows.len(),
            input.display(),
            output.display()
        );

        let too_long = table
            .rows
            .iter()
            .filter(|row| row[table.input_col].chars().count() > self.config.max_message_chars)
            .count();
        if too_long > 0 {
            warn!(
                "{} messages exceed {} characters and will be truncated",
                too_long, self.config.max_message_chars
            );
        }

        let pb = ProgressBar::new(table.rows.len() as u64);
        if let Ok(style) =
            ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} messages {msg}")
        {
            pb.set_style(style.progress_chars("#>-"));
        }

        let mut summary = BatchSummary {
            total: table.rows.len(),
            truncated: too_long,
            output: output.clone(),
            ..Default::default()
        };

        for idx in 0..table.rows.len() {
            let message = table.rows[idx][table.input_col].clone();
            let cell = self.process(idx, &message, &pb, &mut summary);
            table.rows[idx][table.output_col] = cell;
            table.write(&output)?;
            pb.inc(1);
        }
        pb.finish_and_clear();

        info!(
            "Batch complete: {} analyzed, {} errors, {} skipped of {}",
            summary.analyzed, summary.errors, summary.skipped, summary.total
        );
        Ok(summary)
    }

    /// Output cell for one message
    fn process(&self, idx: usize, message: &str, pb: &ProgressBar, summary: &mut BatchSummary) -> String {
        if message.trim().is_empty() {
            summary.skipped += 1;
            pb.println(format!("[Message {}] skipped: empty", idx + 1));
            return SKIPPED_EMPTY.to_string();
        }

        let message = truncate_chars(message, self.config.max_message_chars);
        pb.set_message(preview(&message, 40));

        let prompt = analysis_prompt(&message);
        let response = self.engine.ask_with(&prompt, self.config.top_k, &self.params);

        match response.answer.outcome {
            AnswerOutcome::Failed(reason) => {
                summary.errors += 1;
                pb.println(format!("[Message {}] error: {}", idx + 1, reason));
                format!("[ERROR: {}]", reason)
            }
            _ => {
                summary.analyzed += 1;
                pb.println(format!(
                    "[Message {}] {}",
                    idx + 1,
                    preview(&response.answer.text, 100)
                ));
                response.answer.text
            }
        }
    }
}

fn preview(text: &str, max_chars: usize) -> String {
    truncate_chars(text, max_chars).replace('\n', " ")
}
