// src/utils/csv.rs

use serde::Deserialize;

use crate::error::AppError;
use crate::models::question::{Difficulty, QuestionType};

/// Raw question row as it appears in the upload CSV. Headers are
/// camelCase: questionText,questionType,marks,difficulty,topic,
/// optionA,optionB,optionC,optionD,correctAnswer,explanation.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionCsvRow {
    pub question_text: String,
    pub question_type: String,
    pub marks: f64,
    #[serde(default)]
    pub difficulty: Option<String>,
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub option_a: Option<String>,
    #[serde(default)]
    pub option_b: Option<String>,
    #[serde(default)]
    pub option_c: Option<String>,
    #[serde(default)]
    pub option_d: Option<String>,
    pub correct_answer: String,
    #[serde(default)]
    pub explanation: Option<String>,
}

/// A question row parsed and validated, ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewQuestion {
    pub question_text: String,
    pub question_type: QuestionType,
    pub marks: f64,
    pub difficulty: Difficulty,
    pub topic: Option<String>,
    pub option_a: Option<String>,
    pub option_b: Option<String>,
    pub option_c: Option<String>,
    pub option_d: Option<String>,
    pub correct_answer: String,
    pub explanation: Option<String>,
}

/// Raw student row from the import CSV. Headers: firstName,lastName,
/// email,password,phone,studentNumber,classId,departmentId,
/// enrollmentYear,currentSemester.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentCsvRow {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub student_number: Option<String>,
    #[serde(default)]
    pub class_id: Option<i64>,
    #[serde(default)]
    pub department_id: Option<i64>,
    #[serde(default)]
    pub enrollment_year: Option<i32>,
    #[serde(default)]
    pub current_semester: Option<i32>,
}

/// Parses a question-upload CSV. Fails on the first malformed row,
/// naming its line number; a partial batch is never inserted.
pub fn parse_questions_csv(bytes: &[u8]) -> Result<Vec<NewQuestion>, AppError> {
    let mut reader = csv::Reader::from_reader(bytes);
    let mut questions = Vec::new();

    for (idx, record) in reader.deserialize::<QuestionCsvRow>().enumerate() {
        let row_number = idx + 1;
        let row = record
            .map_err(|e| AppError::BadRequest(format!("Row {}: {}", row_number, e)))?;

        let question_type = QuestionType::from_label(&row.question_type).ok_or_else(|| {
            AppError::BadRequest(format!(
                "Row {}: unknown question type '{}'",
                row_number, row.question_type
            ))
        })?;

        let difficulty = match row.difficulty.as_deref() {
            None | Some("") => Difficulty::Medium,
            Some(label) => Difficulty::from_label(label).ok_or_else(|| {
                AppError::BadRequest(format!(
                    "Row {}: unknown difficulty '{}'",
                    row_number, label
                ))
            })?,
        };

        if row.question_text.trim().is_empty() {
            return Err(AppError::BadRequest(format!(
                "Row {}: questionText is empty",
                row_number
            )));
        }
        if row.correct_answer.trim().is_empty() {
            return Err(AppError::BadRequest(format!(
                "Row {}: correctAnswer is empty",
                row_number
            )));
        }

        questions.push(NewQuestion {
            question_text: row.question_text,
            question_type,
            marks: row.marks,
            difficulty,
            topic: row.topic,
            option_a: row.option_a,
            option_b: row.option_b,
            option_c: row.option_c,
            option_d: row.option_d,
            correct_answer: row.correct_answer,
            explanation: row.explanation,
        });
    }

    if questions.is_empty() {
        return Err(AppError::BadRequest("CSV contains no data rows".to_string()));
    }

    Ok(questions)
}

/// Parses a student-import CSV. Row-level problems beyond basic shape
/// (duplicate email, missing references) are handled at insert time so
/// one bad row does not sink the batch.
pub fn parse_students_csv(bytes: &[u8]) -> Result<Vec<StudentCsvRow>, AppError> {
    let mut reader = csv::Reader::from_reader(bytes);
    let mut students = Vec::new();

    for (idx, record) in reader.deserialize::<StudentCsvRow>().enumerate() {
        let row = record
            .map_err(|e| AppError::BadRequest(format!("Row {}: {}", idx + 1, e)))?;
        students.push(row);
    }

    if students.is_empty() {
        return Err(AppError::BadRequest("CSV contains no data rows".to_string()));
    }

    Ok(students)
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUESTION_HEADER: &str =
        "questionText,questionType,marks,difficulty,topic,optionA,optionB,optionC,optionD,correctAnswer,explanation";

    #[test]
    fn parses_question_rows() {
        let csv = format!(
            "{}\nWhat is 2+2?,Multiple Choice,5,Easy,Arithmetic,3,4,5,6,B,Basic addition\n",
            QUESTION_HEADER
        );

        let questions = parse_questions_csv(csv.as_bytes()).unwrap();
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].question_type, QuestionType::MultipleChoice);
        assert_eq!(questions[0].marks, 5.0);
        assert_eq!(questions[0].correct_answer, "B");
        assert_eq!(questions[0].option_b.as_deref(), Some("4"));
    }

    #[test]
    fn difficulty_defaults_to_medium() {
        let csv = format!(
            "{}\nSky is blue.,True/False,2,,,,,,,True,\n",
            QUESTION_HEADER
        );

        let questions = parse_questions_csv(csv.as_bytes()).unwrap();
        assert_eq!(questions[0].difficulty, Difficulty::Medium);
        assert_eq!(questions[0].question_type, QuestionType::TrueFalse);
        assert!(questions[0].topic.is_none());
    }

    #[test]
    fn rejects_unknown_question_type() {
        let csv = format!("{}\nBroken,Oral,5,Easy,,,,,,A,\n", QUESTION_HEADER);

        let err = parse_questions_csv(csv.as_bytes()).unwrap_err();
        let msg = format!("{}", err);
        assert!(msg.contains("Row 1"), "unexpected error: {}", msg);
        assert!(msg.contains("Oral"), "unexpected error: {}", msg);
    }

    #[test]
    fn rejects_empty_file() {
        let csv = format!("{}\n", QUESTION_HEADER);
        assert!(parse_questions_csv(csv.as_bytes()).is_err());
    }

    #[test]
    fn parses_student_rows_with_defaults() {
        let csv = "firstName,lastName,email,password,phone,studentNumber,classId,departmentId,enrollmentYear,currentSemester\n\
                   Ada,Lovelace,ada@example.com,,,STU-001,,,2024,1\n\
                   Alan,Turing,alan@example.com,secret99,555-0100,STU-002,3,2,2023,2\n";

        let students = parse_students_csv(csv.as_bytes()).unwrap();
        assert_eq!(students.len(), 2);
        assert!(students[0].password.is_none());
        assert_eq!(students[0].enrollment_year, Some(2024));
        assert_eq!(students[1].class_id, Some(3));
        assert_eq!(students[1].password.as_deref(), Some("secret99"));
    }
}
