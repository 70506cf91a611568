use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Task as delivered by `GET /tasks`. `question` and `possible_answers` mean
/// different things depending on `version`; [`Task`] is the typed form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiTask {
    #[serde(alias = "id", alias = "taskId")]
    pub task_id: String,
    pub section: u32,
    #[serde(alias = "sectionName")]
    pub section_name: String,
    pub version: u8,
    pub question: String,
    #[serde(alias = "possibleAnswers")]
    pub possible_answers: Vec<String>,
    #[serde(alias = "correctAnswerIndex")]
    pub correct_answer_index: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TasksResponse {
    #[serde(default)]
    pub tasks: Vec<ApiTask>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TaskDecodeError {
    #[error("task {task_id}: unknown version {version}")]
    UnknownVersion { task_id: String, version: u8 },
    #[error("task {task_id}: correct answer index {index} out of range for {len} answers")]
    AnswerOutOfRange {
        task_id: String,
        index: usize,
        len: usize,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum TaskKind {
    /// Version 1: a sign image is shown, the learner picks the letter.
    LetterFromSign {
        sign_image: String,
        letters: Vec<String>,
        correct_index: usize,
    },
    /// Version 2: a letter is shown, the learner picks the sign image.
    SignFromLetter {
        letter: String,
        sign_images: Vec<String>,
        correct_index: usize,
    },
    /// Version 3: the learner performs the sign in front of the camera.
    PerformSign {
        reference_image: String,
        target: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub section: u32,
    pub section_name: String,
    pub kind: TaskKind,
}

impl Task {
    pub fn version(&self) -> u8 {
        match self.kind {
            TaskKind::LetterFromSign { .. } => 1,
            TaskKind::SignFromLetter { .. } => 2,
            TaskKind::PerformSign { .. } => 3,
        }
    }

    pub fn is_verification(&self) -> bool {
        matches!(self.kind, TaskKind::PerformSign { .. })
    }

    /// Letter (or word) credited to the learner when this task is answered
    /// correctly, normalised to lowercase.
    pub fn learned_letter(&self) -> String {
        match &self.kind {
            TaskKind::LetterFromSign { sign_image, .. } => extract_letter(sign_image),
            TaskKind::PerformSign {
                reference_image, ..
            } => extract_letter(reference_image),
            TaskKind::SignFromLetter { letter, .. } => letter.to_lowercase(),
        }
    }
}

impl TryFrom<ApiTask> for Task {
    type Error = TaskDecodeError;

    fn try_from(api: ApiTask) -> Result<Self, Self::Error> {
        let len = api.possible_answers.len();
        if api.correct_answer_index >= len {
            return Err(TaskDecodeError::AnswerOutOfRange {
                task_id: api.task_id,
                index: api.correct_answer_index,
                len,
            });
        }

        let kind = match api.version {
            1 => TaskKind::LetterFromSign {
                sign_image: api.question,
                letters: api.possible_answers,
                correct_index: api.correct_answer_index,
            },
            2 => TaskKind::SignFromLetter {
                letter: api.question,
                sign_images: api.possible_answers,
                correct_index: api.correct_answer_index,
            },
            3 => {
                let target = api.possible_answers[api.correct_answer_index].clone();
                TaskKind::PerformSign {
                    reference_image: api.question,
                    target,
                }
            }
            version => {
                return Err(TaskDecodeError::UnknownVersion {
                    task_id: api.task_id,
                    version,
                })
            }
        };

        Ok(Task {
            id: api.task_id,
            section: api.section,
            section_name: api.section_name,
            kind,
        })
    }
}

/// Pulls the letter out of a sign reference such as
/// `https://cdn.example.com/asl/p.png`. Single characters pass through;
/// anything unrecognised is returned whole, lowercased.
pub fn extract_letter(input: &str) -> String {
    if input.chars().count() == 1 {
        return input.to_lowercase();
    }

    if input.contains(".png") {
        let filename = input.rsplit('/').next().unwrap_or(input);
        if let Some(stem) = filename.split('.').next() {
            if stem.chars().count() == 1 && stem.chars().all(|c| c.is_ascii_alphanumeric()) {
                return stem.to_lowercase();
            }
        }
    }

    input.to_lowercase()
}
