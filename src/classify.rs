use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::debug;

use crate::dates::parse_period_date;
use crate::models::{Grade, ProblemKind, ProblemRecord, TranscriptRow};
use crate::registry::SubjectsOfInterest;

pub const PASSING_GRADE: f64 = 3.0;
pub const BORDERLINE_GRADE: f64 = 3.0;

#[derive(Debug, Clone, Copy)]
pub struct TranscriptContext<'a> {
    pub student_name: &'a str,
    pub class_name: &'a str,
    pub as_of: NaiveDate,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassifyOutcome {
    pub emitted: usize,
    pub retracted: usize,
}

/// Problems found so far in a batch.
///
/// Borderline records live in slots indexed by (student, subject) so a later
/// improvement can retract them without scanning. Output keeps every borderline
/// record ahead of the failing and outstanding-debt records, each group in the
/// order it was emitted.
#[derive(Debug, Default)]
pub struct ProblemAccumulator {
    borderline: Vec<Option<ProblemRecord>>,
    borderline_index: HashMap<(String, String), Vec<usize>>,
    failures: Vec<ProblemRecord>,
}

impl ProblemAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    fn emit(&mut self, record: ProblemRecord) {
        debug!(
            student = %record.student_name,
            subject = %record.subject,
            period = %record.period_label,
            kind = ?record.problem_kind,
            "problem recorded"
        );
        match record.problem_kind {
            ProblemKind::Borderline => {
                let key = (record.student_name.clone(), record.subject.clone());
                self.borderline_index
                    .entry(key)
                    .or_default()
                    .push(self.borderline.len());
                self.borderline.push(Some(record));
            }
            ProblemKind::Failing | ProblemKind::OutstandingDebt => self.failures.push(record),
        }
    }

    /// Drop every live borderline record for the pair. Returns how many were removed.
    fn retract_borderline(&mut self, student_name: &str, subject: &str) -> usize {
        let key = (student_name.to_string(), subject.to_string());
        let Some(slots) = self.borderline_index.remove(&key) else {
            return 0;
        };
        let retracted = slots
            .into_iter()
            .filter_map(|slot| self.borderline[slot].take())
            .count();
        debug!(student = student_name, subject, retracted, "borderline grade retracted");
        retracted
    }

    pub fn len(&self) -> usize {
        self.borderline.iter().flatten().count() + self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_records(self) -> Vec<ProblemRecord> {
        self.borderline
            .into_iter()
            .flatten()
            .chain(self.failures)
            .collect()
    }
}

/// Classify one transcript's rows into the accumulator.
///
/// Each subject block walks its graded periods in order, remembering the last
/// numeric grade. A missing or non-numeric grade leaves that memory untouched;
/// a new block clears it.
pub fn classify_transcript(
    accumulator: &mut ProblemAccumulator,
    context: TranscriptContext<'_>,
    rows: &[TranscriptRow],
    subjects: &SubjectsOfInterest,
) -> ClassifyOutcome {
    let mut outcome = ClassifyOutcome::default();
    let mut previous_grade: Option<f64> = None;

    for row in rows {
        if row.starts_block {
            previous_grade = None;
        }
        if !subjects.contains(&row.subject) {
            continue;
        }

        match &row.final_grade {
            Grade::Numeric(grade) => {
                let grade = *grade;
                if grade < PASSING_GRADE {
                    accumulator.emit(problem(context, row, ProblemKind::Failing));
                    outcome.emitted += 1;
                }
                if grade == BORDERLINE_GRADE {
                    accumulator.emit(problem(context, row, ProblemKind::Borderline));
                    outcome.emitted += 1;
                } else if previous_grade == Some(BORDERLINE_GRADE) && grade > BORDERLINE_GRADE {
                    outcome.retracted +=
                        accumulator.retract_borderline(context.student_name, &row.subject);
                }
                previous_grade = Some(grade);
            }
            Grade::Missing => {
                let overdue = parse_period_date(&row.period_end_date)
                    .is_some_and(|end| end < context.as_of);
                if overdue {
                    accumulator.emit(problem(context, row, ProblemKind::OutstandingDebt));
                    outcome.emitted += 1;
                }
            }
            Grade::Marker(_) => {}
        }
    }

    outcome
}

fn problem(context: TranscriptContext<'_>, row: &TranscriptRow, kind: ProblemKind) -> ProblemRecord {
    ProblemRecord {
        student_name: context.student_name.to_string(),
        class_name: context.class_name.to_string(),
        subject: row.subject.clone(),
        period_label: row.period_label.clone(),
        period_end_date: row.period_end_date.clone(),
        final_grade: row.final_grade.clone(),
        problem_kind: kind,
    }
}
