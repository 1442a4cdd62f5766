//! Batch runner: many claims, bounded concurrency, results in input order.
//!
//! Input and output formats follow the file extension. A `.csv` input is a
//! table whose claim column is named on the command line (`texts` by
//! default); a `.csv` output echoes the input rows with `answers` and `error`
//! columns added. Anything else is read as a JSON array or as lines, and
//! written as a JSON array of [`BatchRecord`].

use anyhow::{anyhow, bail, Context, Result};
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::warn;

use polygraph_agent::Pipeline;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRecord {
    pub claim: String,
    /// `None` when the claim aborted; see `error`.
    pub verdict: Option<bool>,
    pub error: Option<String>,
}

/// A JSON array of strings, or one claim per line (blank lines skipped).
pub fn parse_claims(text: &str) -> Result<Vec<String>> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('[') {
        let claims: Vec<String> =
            serde_json::from_str(trimmed).context("input looks like JSON but is not an array of strings")?;
        return Ok(claims);
    }
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

pub const DEFAULT_CLAIM_COLUMN: &str = "texts";
const ANSWERS_COLUMN: &str = "answers";
const ERROR_COLUMN: &str = "error";

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"))
}

/// Rows of a claims table, kept whole so the output can echo them.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    column: usize,
}

impl ClaimTable {
    /// Read a headed CSV and locate `column`.
    pub fn from_csv<R: io::Read>(reader: R, column: &str) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
        let headers: Vec<String> = reader
            .headers()
            .context("reading CSV header")?
            .iter()
            .map(|h| h.trim().to_string())
            .collect();
        let Some(index) = headers.iter().position(|h| h == column) else {
            bail!("CSV has no `{column}` column (found: {})", headers.join(", "));
        };

        let mut rows = Vec::new();
        for (line, record) in reader.records().enumerate() {
            let record = record.with_context(|| format!("reading CSV row {}", line + 1))?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self {
            headers,
            rows,
            column: index,
        })
    }

    /// A one-column table, used when plain claims are written as CSV.
    pub fn from_claims(column: &str, claims: Vec<String>) -> Self {
        Self {
            headers: vec![column.to_string()],
            rows: claims.into_iter().map(|claim| vec![claim]).collect(),
            column: 0,
        }
    }

    pub fn claims(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|row| row.get(self.column).cloned().unwrap_or_default())
            .collect()
    }

    /// Write every row back with `answers` (`True`/`False`, empty when the
    /// claim aborted) and `error` set. Existing columns of those names are
    /// overwritten in place.
    pub fn write_answers<W: io::Write>(&self, writer: W, records: &[BatchRecord]) -> Result<()> {
        if records.len() != self.rows.len() {
            bail!("{} results for {} rows", records.len(), self.rows.len());
        }

        let mut headers = self.headers.clone();
        let answers_at = column_slot(&mut headers, ANSWERS_COLUMN);
        let error_at = column_slot(&mut headers, ERROR_COLUMN);

        let mut writer = csv::Writer::from_writer(writer);
        writer.write_record(&headers)?;
        for (row, record) in self.rows.iter().zip(records) {
            let mut fields = row.clone();
            fields.resize(headers.len(), String::new());
            fields[answers_at] = match record.verdict {
                Some(true) => "True".to_string(),
                Some(false) => "False".to_string(),
                None => String::new(),
            };
            fields[error_at] = record.error.clone().unwrap_or_default();
            writer.write_record(&fields)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Index of `name` in `headers`, appending it when absent.
fn column_slot(headers: &mut Vec<String>, name: &str) -> usize {
    match headers.iter().position(|h| h == name) {
        Some(index) => index,
        None => {
            headers.push(name.to_string());
            headers.len() - 1
        }
    }
}

pub async fn run_batch(pipeline: Arc<Pipeline>, claims: Vec<String>, concurrency: usize) -> Vec<BatchRecord> {
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let mut handles = Vec::with_capacity(claims.len());

    for claim in claims {
        let pipeline = pipeline.clone();
        let semaphore = semaphore.clone();
        let task_claim = claim.clone();
        let handle = tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| anyhow!("batch semaphore closed: {e}"))?;
            pipeline
                .run(task_claim.as_str())
                .await
                .map_err(anyhow::Error::from)
        });
        handles.push((claim, handle));
    }

    let mut records = Vec::with_capacity(handles.len());
    for (claim, handle) in handles {
        let outcome = match handle.await {
            Ok(result) => result,
            Err(join) => Err(anyhow!("claim task failed: {join}")),
        };
        let record = match outcome {
            Ok(state) => BatchRecord {
                claim,
                verdict: state.verdict(),
                error: None,
            },
            Err(e) => {
                warn!(claim = %claim, error = %e, "claim aborted");
                BatchRecord {
                    claim,
                    verdict: None,
                    error: Some(format!("{e:#}")),
                }
            }
        };
        records.push(record);
    }
    records
}

pub async fn cmd_batch(
    pipeline: Arc<Pipeline>,
    input: &Path,
    output: &Path,
    column: &str,
    concurrency: usize,
) -> Result<()> {
    let text = fs::read_to_string(input).with_context(|| format!("reading {}", input.display()))?;
    let table = if is_csv(input) {
        ClaimTable::from_csv(text.as_bytes(), column)
            .with_context(|| format!("parsing {}", input.display()))?
    } else {
        ClaimTable::from_claims(column, parse_claims(&text)?)
    };
    let claims = table.claims();
    eprintln!(
        "{} {} claims from {} (concurrency {})",
        "Checking".green().bold(),
        claims.len(),
        input.display(),
        concurrency.max(1)
    );

    let records = run_batch(pipeline, claims, concurrency).await;
    let failed = records.iter().filter(|r| r.error.is_some()).count();
    let held = records.iter().filter(|r| r.verdict == Some(true)).count();

    if is_csv(output) {
        let file = fs::File::create(output).with_context(|| format!("creating {}", output.display()))?;
        table
            .write_answers(io::BufWriter::new(file), &records)
            .with_context(|| format!("writing {}", output.display()))?;
    } else {
        fs::write(output, serde_json::to_string_pretty(&records)?)
            .with_context(|| format!("writing {}", output.display()))?;
    }

    eprintln!(
        "{} {} ({} true, {} false, {} failed)",
        "wrote".green().bold(),
        output.display().to_string().bold(),
        held,
        records.len() - held - failed,
        failed
    );
    Ok(())
}
