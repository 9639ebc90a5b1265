//! Export the task collection as CSV, a Markdown checklist or iCalendar, and
//! read tasks back from CSV or Markdown.
//!
//! Ids and dependency references are written 1-based, as the CLI shows them.
//! Imports ignore ids and dependencies.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::{Error, IoStage, Result, ValidationError};
use crate::tasks::models::validate_description;
use crate::tasks::store::write_atomic;
use crate::tasks::{normalize_tags, parse_due, parse_timestamp, NewTask, Priority, Task};

const CSV_HEADER: [&str; 8] =
    ["id", "description", "priority", "completed", "tags", "created_at", "due", "depends_on"];

const ICS_PRODID: &str = "-//taskdeck//EN";

/// `- [x] description (Priority) [tag, tag]`, priority and tags optional.
static CHECKLIST_ITEM: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^\s*[-*]\s*\[([xX ])\]\s*(.+?)(?:\s+\(((?i:high|medium|low))\))?(?:\s+\[([^\]]*)\])?\s*$",
    )
    .unwrap()
});

/// An indented `- Due: YYYY-MM-DD` line under a checklist item.
static DUE_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s+[-*]\s*Due:\s*(\S+)\s*$").unwrap());

/// File format for export and import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma separated values, one task per row.
    Csv,
    /// A Markdown checklist.
    Markdown,
    /// An iCalendar file with one all-day event per task that has a due date.
    /// Export only.
    Ics,
}

impl ExportFormat {
    /// Conventional file extension.
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Markdown => "md",
            Self::Ics => "ics",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "md" | "markdown" => Ok(Self::Markdown),
            "ics" | "ical" => Ok(Self::Ics),
            _ => Err(ValidationError::UnknownFormat(s.to_string())),
        }
    }
}

/// Render `tasks` in the given format.
pub fn render(format: ExportFormat, tasks: &[Task]) -> String {
    match format {
        ExportFormat::Csv => render_csv(tasks),
        ExportFormat::Markdown => render_markdown(tasks),
        ExportFormat::Ics => render_ics(tasks),
    }
}

/// How many records [`render`] writes for `tasks`.
pub fn record_count(format: ExportFormat, tasks: &[Task]) -> usize {
    match format {
        ExportFormat::Csv | ExportFormat::Markdown => tasks.len(),
        ExportFormat::Ics => tasks.iter().filter(|t| t.due.is_some()).count(),
    }
}

/// Render and write to `path` atomically. Returns the number of records written.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_to(path: &Path, format: ExportFormat, tasks: &[Task]) -> Result<usize> {
    write_atomic(path, render(format, tasks).as_bytes())?;
    let count = record_count(format, tasks);
    tracing::debug!(path = %path.display(), count, "exported tasks");
    Ok(count)
}

/// Parse tasks from CSV or Markdown text, in input order.
///
/// CSV needs a header row with a `description` column (`text`, `task` and
/// `title` also work); `priority`, `completed`, `tags`, `created_at` and
/// `due` are read when present. Markdown reads `- [ ]` / `- [x]` lines in
/// the shape [`render`] writes, with an optional `  - Due:` line after each.
///
/// # Errors
///
/// Returns [`ValidationError::ImportRow`] for the first row that cannot be
/// read, and [`ValidationError::InvalidArgument`] for [`ExportFormat::Ics`].
pub fn parse(format: ExportFormat, input: &str) -> Result<Vec<NewTask>> {
    match format {
        ExportFormat::Csv => parse_csv(input),
        ExportFormat::Markdown => parse_markdown(input),
        ExportFormat::Ics => Err(ValidationError::InvalidArgument(
            "ics files cannot be imported (use csv or md)".to_string(),
        )
        .into()),
    }
}

/// Read and [`parse`] a file.
///
/// # Errors
///
/// Returns [`Error::Io`] if the file cannot be read, or a [`parse`] error.
pub fn read_from(path: &Path, format: ExportFormat) -> Result<Vec<NewTask>> {
    let input = fs::read_to_string(path).map_err(|e| Error::io(IoStage::Read, path, e))?;
    parse(format, &input)
}

fn csv_cell(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn join_ids(ids: &[usize]) -> String {
    ids.iter().map(|i| (i + 1).to_string()).collect::<Vec<_>>().join(";")
}

fn render_csv(tasks: &[Task]) -> String {
    let mut out = CSV_HEADER.join(",");
    out.push('\n');
    for (index, task) in tasks.iter().enumerate() {
        let tags = task.tags.iter().map(String::as_str).collect::<Vec<_>>().join(";");
        let row = [
            (index + 1).to_string(),
            task.description.clone(),
            task.priority.to_string(),
            task.completed.to_string(),
            tags,
            task.created_at.to_rfc3339(),
            task.due.map(|d| d.to_string()).unwrap_or_default(),
            join_ids(&task.depends_on),
        ];
        let cells: Vec<String> = row.iter().map(|c| csv_cell(c)).collect();
        out.push_str(&cells.join(","));
        out.push('\n');
    }
    out
}

fn render_ics(tasks: &[Task]) -> String {
    let mut lines =
        vec!["BEGIN:VCALENDAR".to_string(), "VERSION:2.0".to_string(), format!("PRODID:{ICS_PRODID}")];
    for (index, task) in tasks.iter().enumerate() {
        let Some(due) = task.due else {
            continue;
        };
        lines.push("BEGIN:VEVENT".to_string());
        lines.push(format!("UID:task-{}-{}@taskdeck", index + 1, task.created_at.timestamp()));
        lines.push(format!("DTSTAMP:{}", task.created_at.format("%Y%m%dT%H%M%SZ")));
        lines.push(format!("DTSTART;VALUE=DATE:{}", due.format("%Y%m%d")));
        lines.push(format!("SUMMARY:{}", ics_text(&task.description)));
        if !task.tags.is_empty() {
            let categories: Vec<String> = task.tags.iter().map(|t| ics_text(t)).collect();
            lines.push(format!("CATEGORIES:{}", categories.join(",")));
        }
        lines.push("END:VEVENT".to_string());
    }
    lines.push("END:VCALENDAR".to_string());

    let mut out = lines.join("\r\n");
    out.push_str("\r\n");
    out
}

fn ics_text(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace(';', "\\;")
        .replace(',', "\\,")
        .replace("\r\n", "\\n")
        .replace('\n', "\\n")
}

fn render_markdown(tasks: &[Task]) -> String {
    let mut out = String::from("# Tasks\n\n");
    for task in tasks {
        let check = if task.completed { 'x' } else { ' ' };
        let _ = write!(out, "- [{check}] {} ({})", task.description, task.priority);
        if !task.tags.is_empty() {
            let tags = task.tags.iter().map(String::as_str).collect::<Vec<_>>().join(", ");
            let _ = write!(out, " [{tags}]");
        }
        out.push('\n');
        if let Some(due) = task.due {
            let _ = writeln!(out, "  - Due: {due}");
        }
    }
    out
}

/// Split CSV text into records. Quoted cells may contain commas, doubled
/// quotes and line breaks.
fn csv_records(input: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record = Vec::new();
    let mut cell = String::new();
    let mut in_quotes = false;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    cell.push('"');
                    chars.next();
                }
                '"' => in_quotes = false,
                _ => cell.push(c),
            }
            continue;
        }
        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut cell)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                record.push(std::mem::take(&mut cell));
                records.push(std::mem::take(&mut record));
            }
            _ => cell.push(c),
        }
    }
    if !cell.is_empty() || !record.is_empty() {
        record.push(cell);
        records.push(record);
    }
    records
}

/// Column positions found in a CSV header.
struct CsvColumns {
    description: usize,
    priority: Option<usize>,
    completed: Option<usize>,
    tags: Option<usize>,
    created_at: Option<usize>,
    due: Option<usize>,
}

impl CsvColumns {
    fn from_header(header: &[String]) -> Option<Self> {
        let find = |names: &[&str]| {
            header.iter().position(|h| names.contains(&h.trim().to_lowercase().as_str()))
        };
        Some(Self {
            description: find(&["description", "text", "task", "title"])?,
            priority: find(&["priority"]),
            completed: find(&["completed", "done"]),
            tags: find(&["tags"]),
            created_at: find(&["created_at", "created"]),
            due: find(&["due", "due_date"]),
        })
    }

    fn task(&self, row: usize, record: &[String]) -> std::result::Result<NewTask, ValidationError> {
        let cell = |col: Option<usize>| col.and_then(|c| record.get(c)).map_or("", |s| s.trim());
        let fail = |e: ValidationError| ValidationError::ImportRow { row, reason: e.to_string() };

        let description = validate_row_description(row, cell(Some(self.description)))?;
        let priority = match cell(self.priority) {
            "" => Priority::default(),
            p => p.parse::<Priority>().map_err(fail)?,
        };
        let due = match cell(self.due) {
            "" => None,
            d => Some(parse_due(d).map_err(fail)?),
        };

        Ok(NewTask {
            description,
            priority,
            tags: normalize_tags(cell(self.tags).split(';')),
            due,
            completed: matches!(
                cell(self.completed).to_lowercase().as_str(),
                "true" | "1" | "x" | "yes"
            ),
            created_at: parse_timestamp(cell(self.created_at)),
        })
    }
}

fn validate_row_description(
    row: usize,
    description: &str,
) -> std::result::Result<String, ValidationError> {
    validate_description(description)
        .map(str::to_string)
        .map_err(|e| ValidationError::ImportRow { row, reason: e.to_string() })
}

fn parse_csv(input: &str) -> Result<Vec<NewTask>> {
    let mut records = csv_records(input)
        .into_iter()
        .enumerate()
        .filter(|(_, record)| record.iter().any(|c| !c.trim().is_empty()));

    let Some((header_index, header)) = records.next() else {
        return Ok(Vec::new());
    };
    let columns = CsvColumns::from_header(&header).ok_or_else(|| ValidationError::ImportRow {
        row: header_index + 1,
        reason: "header has no description column".to_string(),
    })?;

    let tasks = records
        .map(|(index, record)| columns.task(index + 1, &record))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(tasks)
}

fn parse_markdown(input: &str) -> Result<Vec<NewTask>> {
    let mut tasks: Vec<NewTask> = Vec::new();
    for (index, line) in input.lines().enumerate() {
        let row = index + 1;
        if let Some(caps) = CHECKLIST_ITEM.captures(line) {
            tasks.push(NewTask {
                description: validate_row_description(row, &caps[2])?,
                priority: caps.get(3).and_then(|m| m.as_str().parse().ok()).unwrap_or_default(),
                tags: caps.get(4).map(|m| normalize_tags(m.as_str().split(','))).unwrap_or_default(),
                due: None,
                completed: caps[1].eq_ignore_ascii_case("x"),
                created_at: None,
            });
        } else if let Some(caps) = DUE_LINE.captures(line) {
            if let Some(last) = tasks.last_mut() {
                let due = parse_due(&caps[1])
                    .map_err(|e| ValidationError::ImportRow { row, reason: e.to_string() })?;
                last.due = Some(due);
            }
        }
    }
    Ok(tasks)
}
