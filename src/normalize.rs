use crate::error::SheetError;
use crate::models::{Cell, Grade, TranscriptRow, EMPTY_CELL};

pub const BODY_COLUMNS: usize = 6;

const SUBJECT: usize = 0;
const PERIOD_LABEL: usize = 1;
const PERIOD_END_DATE: usize = 2;
const FINAL_GRADE: usize = 5;

/// Rebuild transcript rows from the sheet body, carrying each subject down its block.
///
/// Body columns are fixed: subject, period label, period end date, raw marks,
/// weighted average, final grade. Blank rows and rows above the first subject
/// are dropped.
pub fn normalize_rows(body: &[Vec<Cell>]) -> Result<Vec<TranscriptRow>, SheetError> {
    let filled: Vec<&Vec<Cell>> = body
        .iter()
        .filter(|row| row.iter().any(|cell| !cell.is_empty()))
        .collect();
    if filled.is_empty() {
        return Ok(Vec::new());
    }

    let width = filled.iter().map(|row| row.len()).max().unwrap_or(0);
    if width < BODY_COLUMNS {
        return Err(SheetError::MissingColumns { found: width });
    }

    let mut rows = Vec::with_capacity(filled.len());
    let mut current_subject: Option<String> = None;

    for cells in filled {
        let column = |index: usize| cells.get(index).unwrap_or(&EMPTY_CELL);

        let starts_block = !column(SUBJECT).is_empty();
        if starts_block {
            current_subject = Some(column(SUBJECT).to_string());
        }
        let Some(subject) = current_subject.clone() else {
            continue;
        };

        rows.push(TranscriptRow {
            subject,
            starts_block,
            period_label: column(PERIOD_LABEL).to_string(),
            period_end_date: column(PERIOD_END_DATE).to_string(),
            final_grade: Grade::from_cell(column(FINAL_GRADE)),
        });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: [&str; 6]) -> Vec<Cell> {
        cells.iter().map(|value| Cell::text(*value)).collect()
    }

    #[test]
    fn subject_is_carried_down_its_block() {
        let body = vec![
            row(["Алгебра", "1 модуль", "01.10.2023", "5 4", "4.5", "4"]),
            row(["", "2 модуль", "01.12.2023", "3", "3.0", "3"]),
            row(["Физика", "1 модуль", "01.10.2023", "", "", ""]),
            row(["", "2 модуль", "01.12.2023", "", "", "5"]),
        ];

        let rows = normalize_rows(&body).expect("body parses");
        let subjects: Vec<(&str, bool)> = rows
            .iter()
            .map(|r| (r.subject.as_str(), r.starts_block))
            .collect();
        assert_eq!(
            subjects,
            vec![
                ("Алгебра", true),
                ("Алгебра", false),
                ("Физика", true),
                ("Физика", false),
            ]
        );
        assert_eq!(rows[1].final_grade, Grade::Numeric(3.0));
        assert_eq!(rows[2].final_grade, Grade::Missing);
        assert_eq!(rows[3].period_end_date, "01.12.2023");
    }

    #[test]
    fn blank_rows_and_orphans_are_dropped() {
        let body = vec![
            row(["", "вне блока", "", "", "", "2"]),
            row(["", "", "", "", "", ""]),
            row(["Геометрия", "1 модуль", "", "", "", "зачёт"]),
        ];

        let rows = normalize_rows(&body).expect("body parses");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].final_grade, Grade::Marker("зачёт".to_string()));
    }

    #[test]
    fn narrow_body_is_rejected() {
        let body = vec![vec![Cell::text("Алгебра"), Cell::text("1 модуль")]];
        assert!(matches!(
            normalize_rows(&body),
            Err(SheetError::MissingColumns { found: 2 })
        ));
    }

    #[test]
    fn empty_body_is_fine() {
        assert!(normalize_rows(&[]).expect("empty parses").is_empty());
    }
}
