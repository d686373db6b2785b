//! Board evaluator
//!
//! Pure transitions over a single [`BoardState`]. Every operation takes the
//! current board by reference and returns the next board; the input is never
//! modified. All operations are no-ops on a completed board.
//!
//! State machine: `Incomplete -> Incomplete* -> {Success, Fail}`

use super::board::{BoardState, Completion, Row};
use super::feedback::{MatchState, evaluate, is_perfect};

/// Append `ch` to the open row
///
/// Creates the first row if the board has none. The letter is tagged
/// `Invalid` until the row is committed. No-op if the board is complete or
/// the open row already holds `letter_count` letters.
#[must_use]
pub fn add_letter(state: &BoardState, letter_count: usize, ch: char) -> BoardState {
    if state.is_complete() {
        return state.clone();
    }

    let mut next = state.clone();
    if next.rows.is_empty() {
        next.rows.push(Row::new(letter_count));
    }

    if let Some(row) = next.rows.last_mut()
        && !row.is_full()
    {
        row.letters.push((ch, MatchState::Invalid));
    }

    next
}

/// Drop the last letter of the open row
///
/// No-op if the board is complete, has no rows, or the open row is empty.
#[must_use]
pub fn remove_letter(state: &BoardState) -> BoardState {
    if state.is_complete() {
        return state.clone();
    }

    let mut next = state.clone();
    if let Some(row) = next.rows.last_mut() {
        row.letters.pop();
    }
    next
}

/// Commit the open row
///
/// No-op unless the open row holds exactly `letter_count` letters. The row
/// is scored against the target; a perfect row completes the board with
/// `Success`, otherwise reaching `guess_count` rows completes it with `Fail`,
/// otherwise a new empty row is opened.
#[must_use]
pub fn enter(state: &BoardState, letter_count: usize, guess_count: usize) -> BoardState {
    if state.is_complete() {
        return state.clone();
    }

    let Some(open) = state.rows.last() else {
        return state.clone();
    };
    if open.len() != letter_count {
        return state.clone();
    }

    let guess: Vec<char> = open.letters.iter().map(|(c, _)| *c).collect();
    let target: Vec<char> = state.target.chars().collect();
    let feedback = evaluate(&guess, &target);

    let mut next = state.clone();
    let row_count = next.rows.len();
    if let Some(row) = next.rows.last_mut() {
        for ((_, slot), result) in row.letters.iter_mut().zip(&feedback) {
            *slot = *result;
        }
        row.committed = true;
    }

    if is_perfect(&feedback) {
        next.complete = Completion::Success;
    } else if row_count >= guess_count {
        next.complete = Completion::Fail;
    } else {
        next.rows.push(Row::new(letter_count));
    }

    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use MatchState::{Invalid, Match, Position};

    fn type_word(state: &BoardState, word: &str) -> BoardState {
        word.chars()
            .fold(state.clone(), |board, ch| add_letter(&board, word.len(), ch))
    }

    fn guess(state: &BoardState, word: &str, guess_count: usize) -> BoardState {
        enter(&type_word(state, word), word.len(), guess_count)
    }

    #[test]
    fn add_letter_creates_first_row() {
        let board = BoardState::new("crane");
        let next = add_letter(&board, 5, 'c');

        assert!(board.rows.is_empty(), "input must not be modified");
        assert_eq!(next.rows.len(), 1);
        assert_eq!(next.rows[0].letters, vec![('c', Invalid)]);
        assert_eq!(next.rows[0].width, 5);
    }

    #[test]
    fn add_letter_stops_at_width() {
        let board = type_word(&BoardState::new("crane"), "crane");
        let next = add_letter(&board, 5, 'x');
        assert_eq!(next, board);
    }

    #[test]
    fn add_then_remove_round_trips() {
        let board = type_word(&BoardState::new("crane"), "cr");
        let next = remove_letter(&add_letter(&board, 5, 'a'));
        assert_eq!(next, board);
    }

    #[test]
    fn remove_letter_noop_cases() {
        let empty = BoardState::new("crane");
        assert_eq!(remove_letter(&empty), empty);

        let opened = remove_letter(&add_letter(&empty, 5, 'c'));
        assert_eq!(remove_letter(&opened), opened);
    }

    #[test]
    fn enter_short_row_is_noop() {
        let board = type_word(&BoardState::new("crane"), "cra");
        assert_eq!(enter(&board, 5, 6), board);

        let empty = BoardState::new("crane");
        assert_eq!(enter(&empty, 5, 6), empty);
    }

    #[test]
    fn enter_scores_row_and_opens_next() {
        let board = guess(&BoardState::new("crane"), "trace", 6);

        assert_eq!(board.complete, Completion::Incomplete);
        assert_eq!(board.rows.len(), 2);
        assert!(board.rows[0].committed);
        assert_eq!(
            board.rows[0].states(),
            vec![Invalid, Match, Match, Position, Match]
        );
        assert!(board.rows[1].is_empty());
        assert!(!board.rows[1].committed);
    }

    #[test]
    fn enter_perfect_row_succeeds_with_rows_remaining() {
        let board = guess(&BoardState::new("crane"), "crane", 6);
        assert_eq!(board.complete, Completion::Success);
        assert_eq!(board.rows.len(), 1);
    }

    #[test]
    fn enter_fails_after_guess_count_rows() {
        let mut board = BoardState::new("crane");
        for _ in 0..3 {
            assert!(!board.is_complete());
            board = guess(&board, "slate", 3);
        }
        assert_eq!(board.complete, Completion::Fail);
        assert_eq!(board.rows.len(), 3);
        assert_eq!(board.guesses_used(), 3);
    }

    #[test]
    fn completed_board_ignores_everything() {
        let board = guess(&BoardState::new("crane"), "crane", 6);

        assert_eq!(add_letter(&board, 5, 'x'), board);
        assert_eq!(remove_letter(&board), board);
        assert_eq!(enter(&board, 5, 6), board);
    }

    #[test]
    fn success_on_last_row_wins() {
        let mut board = BoardState::new("crane");
        board = guess(&board, "slate", 2);
        board = guess(&board, "crane", 2);
        assert_eq!(board.complete, Completion::Success);
    }
}
