use teloxide::types::{Poll, PollType};

/// What the admin sent in: either a usable quiz or something that isn't one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizSource {
    Quiz {
        question: String,
        options: Vec<String>,
        correct_option: u8,
    },
    Unsupported,
}

impl QuizSource {
    /// Only quiz-mode polls with a known correct answer are usable. Telegram
    /// reveals the answer of a forwarded quiz only to its creator, so a quiz
    /// forwarded from someone else comes out `Unsupported` too.
    pub fn from_poll(poll: &Poll) -> Self {
        let correct_option = match (&poll.poll_type, poll.correct_option_id) {
            (PollType::Quiz, Some(correct)) => correct,
            _ => return QuizSource::Unsupported,
        };

        QuizSource::Quiz {
            question: poll.question.clone(),
            options: poll.options.iter().map(|option| option.text.clone()).collect(),
            correct_option,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn poll(kind: &str, correct: Option<u8>) -> Poll {
        serde_json::from_value(json!({
            "id": "5",
            "question": "Capital of France?",
            "options": [
                { "text": "Paris", "voter_count": 0 },
                { "text": "Rome", "voter_count": 0 }
            ],
            "total_voter_count": 0,
            "is_closed": false,
            "is_anonymous": true,
            "type": kind,
            "allows_multiple_answers": false,
            "correct_option_id": correct
        }))
        .unwrap()
    }

    #[test]
    fn quiz_poll_becomes_a_quiz() {
        assert_eq!(
            QuizSource::from_poll(&poll("quiz", Some(0))),
            QuizSource::Quiz {
                question: "Capital of France?".into(),
                options: vec!["Paris".into(), "Rome".into()],
                correct_option: 0,
            }
        );
    }

    #[test]
    fn regular_poll_is_unsupported() {
        assert_eq!(QuizSource::from_poll(&poll("regular", None)), QuizSource::Unsupported);
    }

    #[test]
    fn quiz_without_known_answer_is_unsupported() {
        assert_eq!(QuizSource::from_poll(&poll("quiz", None)), QuizSource::Unsupported);
    }
}
