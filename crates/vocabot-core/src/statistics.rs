//! Running tallies for the driver loop.

use serde::{Deserialize, Serialize};

use crate::session::SessionState;

/// Correct/wrong counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStats {
    pub correct: u64,
    pub wrong: u64,
}

impl RunStats {
    pub fn record(&mut self, correct: bool) {
        if correct {
            self.correct += 1;
        } else {
            self.wrong += 1;
        }
    }

    pub fn answered(&self) -> u64 {
        self.correct + self.wrong
    }

    /// Percentage of answers that were correct. A run with no wrong answers
    /// (including an empty one) counts as 100%.
    pub fn accuracy_percent(&self) -> f64 {
        if self.wrong == 0 {
            100.0
        } else {
            self.correct as f64 / self.answered() as f64 * 100.0
        }
    }
}

/// One line of progress output.
pub fn status_line(stats: &RunStats, state: &SessionState) -> String {
    format!(
        "Correct answers: {} | Wrong answers: {} | Errors: {} | Points: {} | Correct %: {:.2}% | List Progress %: {:.2}%",
        stats.correct,
        stats.wrong,
        state.total_errors,
        state.total_points,
        stats.accuracy_percent(),
        state.list_progress * 100.0,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accuracy_is_full_without_wrong_answers() {
        let stats = RunStats::default();
        assert_eq!(stats.accuracy_percent(), 100.0);

        let stats = RunStats {
            correct: 5,
            wrong: 0,
        };
        assert_eq!(stats.accuracy_percent(), 100.0);
    }

    #[test]
    fn accuracy_ratio() {
        let mut stats = RunStats::default();
        stats.record(true);
        stats.record(true);
        stats.record(true);
        stats.record(false);
        assert_eq!(stats.answered(), 4);
        assert!((stats.accuracy_percent() - 75.0).abs() < 1e-9);
    }

    #[test]
    fn status_line_contents() {
        let stats = RunStats {
            correct: 1,
            wrong: 2,
        };
        let state = SessionState {
            total_points: 30,
            total_errors: 4,
            list_progress: 0.25,
            ..Default::default()
        };
        let line = status_line(&stats, &state);
        assert!(line.contains("Correct answers: 1"));
        assert!(line.contains("Wrong answers: 2"));
        assert!(line.contains("Errors: 4"));
        assert!(line.contains("Points: 30"));
        assert!(line.contains("Correct %: 33.33%"));
        assert!(line.contains("List Progress %: 25.00%"));
    }
}
