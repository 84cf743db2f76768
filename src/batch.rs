use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{Local, NaiveDate};
use tracing::{info, warn};

use crate::classify::{classify_transcript, ProblemAccumulator, TranscriptContext};
use crate::config::{AnalyzerConfig, SheetLayout};
use crate::error::SheetError;
use crate::extract::{extract_as_of_date, extract_fields};
use crate::models::{AnalysisBatch, AsOfDate, FileReport, FileStatus};
use crate::normalize::normalize_rows;
use crate::registry::{resolve_subjects, ProfileRegistry, SubjectsOfInterest};
use crate::sheet::{is_transcript_file, load_sheet};

pub fn list_transcripts(folder: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(folder)
        .with_context(|| format!("failed to read folder {}", folder.display()))?;

    let mut files = Vec::new();
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && is_transcript_file(&path) {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn track_range(range: &mut (Option<NaiveDate>, Option<NaiveDate>), date: NaiveDate) {
    let (earliest, latest) = range;
    if earliest.map_or(true, |current| date < current) {
        *earliest = Some(date);
    }
    if latest.map_or(true, |current| date > current) {
        *latest = Some(date);
    }
}

/// Folds transcripts into one batch, a file at a time.
///
/// Results only grow between calls to [`BatchAggregator::process_file`], so a
/// caller may stop early and still [`finish`](BatchAggregator::finish) with the
/// files seen so far.
pub struct BatchAggregator<'a> {
    subjects: &'a SubjectsOfInterest,
    class_name: Option<String>,
    layout: SheetLayout,
    today: NaiveDate,
    problems: ProblemAccumulator,
    files: Vec<FileReport>,
    range: (Option<NaiveDate>, Option<NaiveDate>),
}

impl<'a> BatchAggregator<'a> {
    pub fn new(
        subjects: &'a SubjectsOfInterest,
        class_name: Option<&str>,
        layout: SheetLayout,
        today: NaiveDate,
    ) -> Self {
        Self {
            subjects,
            class_name: class_name
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(str::to_string),
            layout,
            today,
            problems: ProblemAccumulator::new(),
            files: Vec::new(),
            range: (None, None),
        }
    }

    /// Analyze one transcript. Failures are recorded on the returned report, never raised.
    pub fn process_file(&mut self, path: &Path) -> &FileReport {
        let name = file_name(path);
        let report = match self.analyze_file(path, &name) {
            Ok(report) => report,
            Err(err) => {
                warn!(file = %path.display(), error = %err, "skipping transcript");
                FileReport {
                    file_name: name,
                    student_name: None,
                    class_name: None,
                    as_of: None,
                    emitted: 0,
                    retracted: 0,
                    status: FileStatus::Skipped {
                        reason: err.to_string(),
                    },
                }
            }
        };
        self.files.push(report);
        &self.files[self.files.len() - 1]
    }

    fn analyze_file(&mut self, path: &Path, name: &str) -> Result<FileReport, SheetError> {
        let sheet = load_sheet(path)?;
        let fields = extract_fields(
            sheet.header(self.layout.header_rows),
            name,
            self.class_name.as_deref(),
        );
        let rows = normalize_rows(sheet.body(self.layout.body_offset))?;

        let as_of = match fields.as_of_date {
            Some(date) => {
                track_range(&mut self.range, date);
                AsOfDate::Extracted(date)
            }
            None => {
                warn!(
                    file = %path.display(),
                    today = %self.today,
                    "no as-of date in header, using processing date"
                );
                AsOfDate::Fallback(self.today)
            }
        };

        let context = TranscriptContext {
            student_name: &fields.student_name,
            class_name: fields.class_or_unknown(),
            as_of: as_of.date(),
        };
        let outcome = classify_transcript(&mut self.problems, context, &rows, self.subjects);
        info!(
            file = %path.display(),
            sheet = %sheet.name,
            student = %fields.student_name,
            rows = rows.len(),
            emitted = outcome.emitted,
            retracted = outcome.retracted,
            "transcript analyzed"
        );

        Ok(FileReport {
            file_name: name.to_string(),
            class_name: Some(fields.class_or_unknown().to_string()),
            student_name: Some(fields.student_name),
            as_of: Some(as_of),
            emitted: outcome.emitted,
            retracted: outcome.retracted,
            status: FileStatus::Processed,
        })
    }

    pub fn finish(self) -> AnalysisBatch {
        if self.problems.is_empty() {
            info!(files = self.files.len(), "no problems found");
        } else {
            info!(files = self.files.len(), problems = self.problems.len(), "batch complete");
        }
        let (earliest_date, latest_date) = self.range;
        AnalysisBatch {
            problem_records: self.problems.into_records(),
            earliest_date,
            latest_date,
            files: self.files,
        }
    }
}

/// Analyze every transcript in `folder`.
///
/// Only an unreadable folder is an error; bad files are skipped and listed in
/// [`AnalysisBatch::files`].
pub fn analyze(
    folder: &Path,
    class_name: Option<&str>,
    registry: &dyn ProfileRegistry,
    config: &AnalyzerConfig,
) -> anyhow::Result<AnalysisBatch> {
    analyze_as_of(folder, class_name, registry, config, Local::now().date_naive())
}

pub fn analyze_as_of(
    folder: &Path,
    class_name: Option<&str>,
    registry: &dyn ProfileRegistry,
    config: &AnalyzerConfig,
    today: NaiveDate,
) -> anyhow::Result<AnalysisBatch> {
    let files = list_transcripts(folder)?;
    info!(folder = %folder.display(), files = files.len(), "analyzing transcripts");

    let subjects = resolve_subjects(registry, class_name, &config.default_subjects);
    let mut aggregator = BatchAggregator::new(&subjects, class_name, config.layout, today);
    for path in &files {
        aggregator.process_file(path);
    }

    Ok(aggregator.finish())
}

/// Earliest and latest as-of dates across the folder.
///
/// Counts the same files [`analyze`] would: undated files and files it skips are left out.
pub fn extract_batch_dates(
    folder: &Path,
    layout: SheetLayout,
) -> anyhow::Result<(Option<NaiveDate>, Option<NaiveDate>)> {
    let mut range = (None, None);
    for path in list_transcripts(folder)? {
        match transcript_date(&path, layout) {
            Ok(Some(date)) => track_range(&mut range, date),
            Ok(None) => {}
            Err(err) => warn!(file = %path.display(), error = %err, "could not read transcript date"),
        }
    }
    Ok(range)
}

fn transcript_date(path: &Path, layout: SheetLayout) -> Result<Option<NaiveDate>, SheetError> {
    let sheet = load_sheet(path)?;
    normalize_rows(sheet.body(layout.body_offset))?;
    Ok(extract_as_of_date(sheet.header(layout.header_rows), &file_name(path)))
}
