use std::fmt::Write as _;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::models::{AnalysisBatch, FileStatus, ProblemKind, ProblemRecord};

pub const CSV_HEADERS: [&str; 7] = [
    "ФИО ученика",
    "Класс",
    "Предмет",
    "Период промежуточной аттестации",
    "Дата промежуточной аттестации",
    "Итоговая отметка",
    "Тип проблемы",
];

const UTF8_BOM: &[u8] = "\u{feff}".as_bytes();

/// Write records as CSV, BOM-prefixed so spreadsheet tools pick up UTF-8.
pub fn write_csv<W: Write>(records: &[ProblemRecord], mut out: W) -> anyhow::Result<()> {
    out.write_all(UTF8_BOM)?;
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(CSV_HEADERS)?;
    for record in records {
        let grade = record.final_grade.to_string();
        writer.write_record([
            record.student_name.as_str(),
            record.class_name.as_str(),
            record.subject.as_str(),
            record.period_label.as_str(),
            record.period_end_date.as_str(),
            grade.as_str(),
            record.problem_kind.label(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub fn save_csv(records: &[ProblemRecord], path: &Path) -> anyhow::Result<Option<PathBuf>> {
    if records.is_empty() {
        return Ok(None);
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    write_csv(records, std::io::BufWriter::new(file))?;
    Ok(Some(path.to_path_buf()))
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentSummary {
    pub student_name: String,
    pub class_name: String,
    /// Subjects with a failing grade or an outstanding debt.
    pub failed_subjects: Vec<String>,
    /// Subjects held back by a borderline grade.
    pub satisfactory_subjects: Vec<String>,
    pub problems: Vec<ProblemRecord>,
}

fn push_unique(subjects: &mut Vec<String>, subject: &str) {
    if !subjects.iter().any(|existing| existing == subject) {
        subjects.push(subject.to_string());
    }
}

/// Group problems by student in the order students first appear.
///
/// Outstanding debts are listed under `failed_subjects` alongside failing grades, so a
/// notification built from a summary names every subject still owed.
pub fn summarize_by_student(records: &[ProblemRecord]) -> Vec<StudentSummary> {
    let mut summaries: Vec<StudentSummary> = Vec::new();

    for record in records {
        let index = match summaries
            .iter()
            .position(|summary| summary.student_name == record.student_name)
        {
            Some(index) => index,
            None => {
                summaries.push(StudentSummary {
                    student_name: record.student_name.clone(),
                    class_name: record.class_name.clone(),
                    failed_subjects: Vec::new(),
                    satisfactory_subjects: Vec::new(),
                    problems: Vec::new(),
                });
                summaries.len() - 1
            }
        };

        let summary = &mut summaries[index];
        match record.problem_kind {
            ProblemKind::Failing | ProblemKind::OutstandingDebt => {
                push_unique(&mut summary.failed_subjects, &record.subject)
            }
            ProblemKind::Borderline => push_unique(&mut summary.satisfactory_subjects, &record.subject),
        }
        summary.problems.push(record.clone());
    }

    summaries
}

pub fn summarize_by_kind(records: &[ProblemRecord]) -> Vec<(ProblemKind, usize)> {
    let mut counts: std::collections::HashMap<ProblemKind, usize> = std::collections::HashMap::new();
    for record in records {
        *counts.entry(record.problem_kind).or_insert(0) += 1;
    }

    let mut summary: Vec<(ProblemKind, usize)> = counts.into_iter().collect();
    summary.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.label().cmp(b.0.label())));
    summary
}

pub fn build_report(batch: &AnalysisBatch, class_name: Option<&str>) -> String {
    let mut output = String::new();
    let class_label = class_name.unwrap_or("all classes");

    let _ = writeln!(output, "# Transcript Early Warning Report");
    let _ = writeln!(
        output,
        "Generated for {} from {} transcripts ({} skipped)",
        class_label,
        batch.files.len(),
        batch.skipped_files().count()
    );
    match (batch.earliest_date, batch.latest_date) {
        (Some(earliest), Some(latest)) if earliest == latest => {
            let _ = writeln!(output, "Data as of {}", earliest.format("%d.%m.%Y"));
        }
        (Some(earliest), Some(latest)) => {
            let _ = writeln!(
                output,
                "Data as of {} – {}",
                earliest.format("%d.%m.%Y"),
                latest.format("%d.%m.%Y")
            );
        }
        _ => {
            let _ = writeln!(output, "No transcript carried an as-of date.");
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Problem Mix");

    let kinds = summarize_by_kind(&batch.problem_records);
    if kinds.is_empty() {
        let _ = writeln!(output, "No problems found.");
    } else {
        for (kind, count) in kinds {
            let _ = writeln!(output, "- {}: {}", kind.label(), count);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Students");

    let students = summarize_by_student(&batch.problem_records);
    if students.is_empty() {
        let _ = writeln!(output, "No students with problems.");
    } else {
        for student in &students {
            let _ = writeln!(output, "### {} ({})", student.student_name, student.class_name);
            for problem in &student.problems {
                let _ = writeln!(
                    output,
                    "- {}, {} ({}): {} [{}]",
                    problem.subject,
                    problem.period_label,
                    problem.period_end_date,
                    problem.final_grade,
                    problem.problem_kind.label()
                );
            }
        }
    }

    let skipped: Vec<_> = batch.skipped_files().collect();
    if !skipped.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Skipped Files");
        for file in skipped {
            if let FileStatus::Skipped { reason } = &file.status {
                let _ = writeln!(output, "- {}: {}", file.file_name, reason);
            }
        }
    }

    let fallbacks: Vec<&str> = batch
        .files
        .iter()
        .filter(|file| matches!(file.as_of, Some(date) if date.extracted().is_none()))
        .map(|file| file.file_name.as_str())
        .collect();
    if !fallbacks.is_empty() {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Files Without an As-Of Date");
        for name in fallbacks {
            let _ = writeln!(output, "- {name} (processing date used)");
        }
    }

    output
}
