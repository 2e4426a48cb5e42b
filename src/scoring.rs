// src/scoring.rs

use std::collections::{BTreeMap, HashMap};

use crate::models::question::{Answer, Question};
use crate::models::response::{QuestionScore, ScoreReport};

/// Grades an answer set against a form's question set.
///
/// Pure and total: malformed or missing sub-answers degrade to zero credit
/// for that unit instead of failing the run. A question contributes nothing
/// at all only when the respondent supplied no answer object for it; an
/// answer object that is present but empty or mismatched is graded
/// unit-by-unit with every missing unit counted as incorrect.
pub fn score(questions: &[Question], answers: &HashMap<String, Answer>) -> ScoreReport {
    let mut total_units = 0u32;
    let mut earned_units = 0u32;
    let mut per_question = BTreeMap::new();

    for question in questions {
        let Some(answer) = answers.get(question.id()) else {
            continue;
        };

        let question_score = score_question(question, answer);
        total_units += question_score.total_units;
        earned_units += question_score.earned_units;
        per_question.insert(question.id().to_string(), question_score);
    }

    ScoreReport {
        total_units,
        earned_units,
        percentage: percentage(earned_units, total_units),
        per_question,
    }
}

/// Grades a single question. One unit per blank (cloze), per sub-question
/// (comprehension), or per whole question (categorize).
fn score_question(question: &Question, answer: &Answer) -> QuestionScore {
    match question {
        // No correct categorization exists in the data model, so this type
        // counts one denominator unit and can never be earned.
        Question::Categorize { .. } => QuestionScore {
            earned_units: 0,
            total_units: 1,
            fully_correct: false,
        },

        Question::Cloze { blanks, .. } => {
            let selections = match answer {
                Answer::Cloze(map) => Some(map),
                _ => None,
            };

            let mut earned = 0u32;
            for blank in blanks {
                // Exact, case-sensitive match. No trimming or normalization.
                let correct = selections
                    .and_then(|map| map.get(&blank.id))
                    .is_some_and(|selected| *selected == blank.correct_answer);
                if correct {
                    earned += 1;
                }
            }

            let total = blanks.len() as u32;
            QuestionScore {
                earned_units: earned,
                total_units: total,
                fully_correct: earned == total,
            }
        }

        Question::Comprehension { sub_questions, .. } => {
            let selections = match answer {
                Answer::Comprehension(map) => Some(map),
                _ => None,
            };

            let mut earned = 0u32;
            for sub in sub_questions {
                // A sub-question without a correct index stays in the
                // denominator but is never earnable.
                let correct = match sub.correct_answer {
                    Some(expected) => selections
                        .and_then(|map| map.get(&sub.id))
                        .is_some_and(|selected| *selected == expected),
                    None => false,
                };
                if correct {
                    earned += 1;
                }
            }

            let total = sub_questions.len() as u32;
            QuestionScore {
                earned_units: earned,
                total_units: total,
                fully_correct: earned == total,
            }
        }
    }
}

fn percentage(earned: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    ((100.0 * f64::from(earned)) / f64::from(total)).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::{Blank, SubQuestion};

    fn cloze(id: &str, blanks: &[(&str, &str)]) -> Question {
        Question::Cloze {
            id: id.to_string(),
            title: "Fill in the blanks".to_string(),
            image: None,
            text: "The capital of ___ is ___.".to_string(),
            blanks: blanks
                .iter()
                .map(|(blank_id, correct)| Blank {
                    id: blank_id.to_string(),
                    correct_answer: correct.to_string(),
                })
                .collect(),
            options: blanks.iter().map(|(_, c)| c.to_string()).collect(),
        }
    }

    fn comprehension(id: &str, subs: &[(&str, Option<u32>)]) -> Question {
        Question::Comprehension {
            id: id.to_string(),
            title: "Passage".to_string(),
            image: None,
            passage: "Read carefully.".to_string(),
            sub_questions: subs
                .iter()
                .map(|(sub_id, correct)| SubQuestion {
                    id: sub_id.to_string(),
                    question: "Pick one".to_string(),
                    options: vec!["a".to_string(), "b".to_string(), "c".to_string()],
                    correct_answer: *correct,
                })
                .collect(),
        }
    }

    fn categorize(id: &str) -> Question {
        Question::Categorize {
            id: id.to_string(),
            title: "Sort".to_string(),
            image: None,
            items: vec!["apple".to_string(), "carrot".to_string()],
            categories: vec!["fruit".to_string(), "vegetable".to_string()],
        }
    }

    fn cloze_answer(pairs: &[(&str, &str)]) -> Answer {
        Answer::Cloze(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn cloze_partial_credit() {
        let questions = vec![cloze("q1", &[("b1", "Paris"), ("b2", "France")])];
        let answers = HashMap::from([(
            "q1".to_string(),
            cloze_answer(&[("b1", "Paris"), ("b2", "Spain")]),
        )]);

        let report = score(&questions, &answers);
        assert_eq!(report.earned_units, 1);
        assert_eq!(report.total_units, 2);
        assert_eq!(report.percentage, 50);

        let per = &report.per_question["q1"];
        assert_eq!(per.earned_units, 1);
        assert!(!per.fully_correct);
    }

    #[test]
    fn cloze_match_is_case_and_whitespace_sensitive() {
        let questions = vec![cloze("q1", &[("b1", "Paris")])];

        for wrong in ["paris", "PARIS", " Paris", "Paris "] {
            let answers = HashMap::from([("q1".to_string(), cloze_answer(&[("b1", wrong)]))]);
            let report = score(&questions, &answers);
            assert_eq!(report.earned_units, 0, "{wrong:?} must not match");
        }
    }

    #[test]
    fn comprehension_strict_index_match() {
        let questions = vec![comprehension("q1", &[("s1", Some(2))])];
        let answers = HashMap::from([(
            "q1".to_string(),
            Answer::Comprehension(HashMap::from([("s1".to_string(), 1u32)])),
        )]);

        let report = score(&questions, &answers);
        assert_eq!(report.earned_units, 0);
        assert_eq!(report.total_units, 1);
    }

    #[test]
    fn comprehension_sub_without_key_is_never_earnable() {
        let questions = vec![comprehension("q1", &[("s1", Some(0)), ("s2", None)])];
        let answers = HashMap::from([(
            "q1".to_string(),
            Answer::Comprehension(HashMap::from([
                ("s1".to_string(), 0u32),
                ("s2".to_string(), 0u32),
            ])),
        )]);

        let report = score(&questions, &answers);
        // s2 lowers the ceiling: 1 of 2 even with every box ticked.
        assert_eq!(report.earned_units, 1);
        assert_eq!(report.total_units, 2);
        assert!(!report.per_question["q1"].fully_correct);
    }

    #[test]
    fn categorize_is_denominator_only() {
        let questions = vec![categorize("q1")];
        let answers = HashMap::from([(
            "q1".to_string(),
            Answer::Categorize(HashMap::from([(
                "fruit".to_string(),
                vec!["apple".to_string(), "carrot".to_string()],
            )])),
        )]);

        let report = score(&questions, &answers);
        assert_eq!(report.earned_units, 0);
        assert_eq!(report.total_units, 1);
        assert!(!report.per_question["q1"].fully_correct);
    }

    #[test]
    fn whole_form_percentage_mixes_question_weights() {
        // One cloze (2 blanks, both right) plus one categorize:
        // 2 of 3 units -> 67%.
        let questions = vec![
            cloze("q1", &[("b1", "Paris"), ("b2", "France")]),
            categorize("q2"),
        ];
        let answers = HashMap::from([
            (
                "q1".to_string(),
                cloze_answer(&[("b1", "Paris"), ("b2", "France")]),
            ),
            ("q2".to_string(), Answer::Categorize(HashMap::new())),
        ]);

        let report = score(&questions, &answers);
        assert_eq!(report.total_units, 3);
        assert_eq!(report.earned_units, 2);
        assert_eq!(report.percentage, 67);
        assert!(report.per_question["q1"].fully_correct);
    }

    #[test]
    fn unanswered_question_is_skipped_entirely() {
        let questions = vec![
            cloze("q1", &[("b1", "Paris")]),
            cloze("q2", &[("b1", "Rome")]),
        ];
        let answers = HashMap::from([("q1".to_string(), cloze_answer(&[("b1", "Paris")]))]);

        let report = score(&questions, &answers);
        assert_eq!(report.total_units, 1);
        assert_eq!(report.earned_units, 1);
        assert_eq!(report.percentage, 100);
        assert!(!report.per_question.contains_key("q2"));
    }

    #[test]
    fn present_but_empty_answer_counts_against() {
        let questions = vec![cloze("q1", &[("b1", "Paris"), ("b2", "France")])];
        let answers = HashMap::from([("q1".to_string(), cloze_answer(&[]))]);

        let report = score(&questions, &answers);
        assert_eq!(report.total_units, 2);
        assert_eq!(report.earned_units, 0);
        assert_eq!(report.percentage, 0);
    }

    #[test]
    fn mismatched_answer_shape_earns_nothing() {
        let questions = vec![cloze("q1", &[("b1", "Paris")])];
        let answers = HashMap::from([(
            "q1".to_string(),
            Answer::Comprehension(HashMap::from([("b1".to_string(), 0u32)])),
        )]);

        let report = score(&questions, &answers);
        assert_eq!(report.total_units, 1);
        assert_eq!(report.earned_units, 0);
    }

    #[test]
    fn empty_answer_set_scores_zero_over_zero() {
        let questions = vec![cloze("q1", &[("b1", "Paris")]), categorize("q2")];
        let report = score(&questions, &HashMap::new());

        assert_eq!(report.total_units, 0);
        assert_eq!(report.earned_units, 0);
        assert_eq!(report.percentage, 0);
        assert!(report.per_question.is_empty());
    }

    #[test]
    fn scoring_is_deterministic() {
        let questions = vec![
            cloze("q1", &[("b1", "Paris"), ("b2", "France")]),
            comprehension("q2", &[("s1", Some(1)), ("s2", None)]),
            categorize("q3"),
        ];
        let answers = HashMap::from([
            ("q1".to_string(), cloze_answer(&[("b1", "Paris")])),
            (
                "q2".to_string(),
                Answer::Comprehension(HashMap::from([("s1".to_string(), 1u32)])),
            ),
            ("q3".to_string(), Answer::Categorize(HashMap::new())),
        ]);

        let first = score(&questions, &answers);
        let second = score(&questions, &answers);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn percentage_stays_within_bounds() {
        let questions = vec![comprehension("q1", &[("s1", Some(0)), ("s2", Some(1))])];
        let answers = HashMap::from([(
            "q1".to_string(),
            Answer::Comprehension(HashMap::from([
                ("s1".to_string(), 0u32),
                ("s2".to_string(), 1u32),
            ])),
        )]);

        let report = score(&questions, &answers);
        assert_eq!(report.percentage, 100);
        assert!(report.percentage <= 100);
    }
}
