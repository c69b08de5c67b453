//! Alumni knowledge quiz. Graded locally; answers never leave the registrar.

use serde::Serialize;

/// How long the UI should show the score before moving on after a pass.
pub const REVEAL_DELAY_MS: u64 = 1500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub prompt: String,
    pub options: Vec<String>,
    pub answer: usize,
}

/// What the front end gets to see: no answer key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionView<'a> {
    pub index: usize,
    pub prompt: &'a str,
    pub options: &'a [String],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizOutcome {
    pub score: usize,
    pub total: usize,
    pub passed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    questions: Vec<Question>,
    pass_mark: usize,
}

impl Quiz {
    pub fn new(questions: Vec<Question>, pass_mark: usize) -> Self {
        Self {
            questions,
            pass_mark,
        }
    }

    /// The three-question alumni quiz; two correct answers pass.
    pub fn alumni() -> Self {
        let q = |prompt: &str, options: [&str; 4], answer: usize| Question {
            prompt: prompt.to_string(),
            options: options.iter().map(|o| o.to_string()).collect(),
            answer,
        };
        Self::new(
            vec![
                q(
                    "Which office issues transcripts and degree certificates to alumni?",
                    ["Examination office", "Canteen", "Hostel warden", "Sports office"],
                    0,
                ),
                q(
                    "What does your 'batch' refer to at this reunion?",
                    [
                        "A hostel block",
                        "Your year of graduation",
                        "A cricket team",
                        "A lab group",
                    ],
                    1,
                ),
                q(
                    "Which document shows you completed your programme?",
                    ["Library card", "Bus pass", "Degree certificate", "Mess bill"],
                    2,
                ),
            ],
            2,
        )
    }

    pub fn questions(&self) -> Vec<QuestionView<'_>> {
        self.questions
            .iter()
            .enumerate()
            .map(|(index, q)| QuestionView {
                index,
                prompt: &q.prompt,
                options: &q.options,
            })
            .collect()
    }

    /// Score a set of answers, one option index per question. Missing or
    /// out-of-range answers count as wrong.
    pub fn grade(&self, answers: &[Option<usize>]) -> QuizOutcome {
        let score = self
            .questions
            .iter()
            .zip(answers.iter().chain(std::iter::repeat(&None)))
            .filter(|(q, a)| **a == Some(q.answer))
            .count();
        QuizOutcome {
            score,
            total: self.questions.len(),
            passed: score >= self.pass_mark,
        }
    }
}
