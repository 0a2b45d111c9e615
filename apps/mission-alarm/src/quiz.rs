//! Daily mission quiz: pick today's unfinished tasks out of a shuffled list
//! padded with decoys.

use crate::models::Task;
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeSet, HashSet};

/// Decoys shown by default alongside the real tasks.
pub const DEFAULT_DECOYS: [&str; 8] = [
    "Play games",
    "Watch TV",
    "Sleep in",
    "Eat snacks",
    "Browse social media",
    "Read webtoons",
    "Listen to music",
    "Go shopping",
];

/// Default number of decoys per quiz.
pub const DEFAULT_MAX_DECOYS: usize = 3;

/// Texts of today's incomplete tasks.
pub type AnswerSet = BTreeSet<String>;

/// Plausible but wrong task texts.
///
/// Blank entries are dropped and entries equal ignoring case are collapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoyPool {
    decoys: Vec<String>,
}

impl DecoyPool {
    pub fn new<I, S>(decoys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let decoys = decoys
            .into_iter()
            .map(Into::into)
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty() && seen.insert(d.to_lowercase()))
            .collect();
        Self { decoys }
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.decoys.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.decoys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoys.is_empty()
    }
}

impl Default for DecoyPool {
    fn default() -> Self {
        Self::new(DEFAULT_DECOYS)
    }
}

/// One generated quiz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizOptions {
    /// Answers and decoys in display order.
    pub options: Vec<String>,
    /// The correct selection, kept for grading.
    pub answers: AnswerSet,
}

impl QuizOptions {
    pub fn len(&self) -> usize {
        self.options.len()
    }
}

/// Build a quiz from today's incomplete tasks.
///
/// Decoys matching an answer (ignoring case) are never offered. Up to
/// `max_decoys` of the rest are sampled without replacement, then answers and
/// decoys are shuffled together.
pub fn generate<R: Rng + ?Sized>(
    answers: &AnswerSet,
    pool: &DecoyPool,
    max_decoys: usize,
    rng: &mut R,
) -> QuizOptions {
    let taken: HashSet<String> = answers.iter().map(|a| a.to_lowercase()).collect();
    let available: Vec<&str> = pool
        .iter()
        .filter(|d| !taken.contains(&d.to_lowercase()))
        .collect();

    let count = max_decoys.min(available.len());
    let mut options: Vec<String> = answers.iter().cloned().collect();
    options.extend(available.choose_multiple(rng, count).map(|d| d.to_string()));
    options.shuffle(rng);

    QuizOptions {
        options,
        answers: answers.clone(),
    }
}

/// Exact, order-independent comparison of a selection against the answers.
pub fn grade(selected: &AnswerSet, answers: &AnswerSet) -> bool {
    selected == answers
}

/// Whether a quiz can be offered for a day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    /// Nothing registered for the day.
    NoTasks,
    /// Every task is already done.
    AllComplete,
    /// Quiz can be generated from these answers.
    Ready(AnswerSet),
}

impl Availability {
    pub fn from_tasks(tasks: &[Task]) -> Self {
        if tasks.is_empty() {
            return Self::NoTasks;
        }
        let answers: AnswerSet = tasks
            .iter()
            .filter(|t| !t.completed)
            .map(|t| t.text.clone())
            .collect();
        if answers.is_empty() {
            Self::AllComplete
        } else {
            Self::Ready(answers)
        }
    }
}

/// Result of submitting a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Correct,
    /// Wrong selection. `expected` is set only when the selection has the
    /// wrong number of items and carries the answer count.
    Incorrect { expected: Option<usize> },
}

#[derive(Debug, Clone, Default)]
enum QuizState {
    #[default]
    NotGenerated,
    Generated {
        quiz: QuizOptions,
        selected: BTreeSet<usize>,
    },
}

/// Quiz state for one user session.
#[derive(Debug, Clone, Default)]
pub struct QuizSession {
    state: QuizState,
}

impl QuizSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_generated(&self) -> bool {
        matches!(self.state, QuizState::Generated { .. })
    }

    pub fn quiz(&self) -> Option<&QuizOptions> {
        match &self.state {
            QuizState::Generated { quiz, .. } => Some(quiz),
            QuizState::NotGenerated => None,
        }
    }

    /// Generate a quiz unless one for the same answers already exists.
    ///
    /// Returns true when a new quiz was generated.
    pub fn ensure_generated<R: Rng + ?Sized>(
        &mut self,
        answers: &AnswerSet,
        pool: &DecoyPool,
        max_decoys: usize,
        rng: &mut R,
    ) -> bool {
        if let QuizState::Generated { quiz, .. } = &self.state {
            if &quiz.answers == answers {
                return false;
            }
        }
        self.state = QuizState::Generated {
            quiz: generate(answers, pool, max_decoys, rng),
            selected: BTreeSet::new(),
        };
        true
    }

    /// Throw away the current quiz and build a fresh one.
    pub fn regenerate<R: Rng + ?Sized>(
        &mut self,
        answers: &AnswerSet,
        pool: &DecoyPool,
        max_decoys: usize,
        rng: &mut R,
    ) {
        self.reset();
        self.ensure_generated(answers, pool, max_decoys, rng);
    }

    pub fn reset(&mut self) {
        self.state = QuizState::NotGenerated;
    }

    /// Flip the selection of the option at `index`.
    pub fn toggle(&mut self, index: usize) {
        if let QuizState::Generated { quiz, selected } = &mut self.state {
            if index < quiz.options.len() && !selected.remove(&index) {
                selected.insert(index);
            }
        }
    }

    pub fn is_selected(&self, index: usize) -> bool {
        match &self.state {
            QuizState::Generated { selected, .. } => selected.contains(&index),
            QuizState::NotGenerated => false,
        }
    }

    pub fn selected_count(&self) -> usize {
        match &self.state {
            QuizState::Generated { selected, .. } => selected.len(),
            QuizState::NotGenerated => 0,
        }
    }

    /// Grade the current selection.
    ///
    /// A correct answer ends the session's quiz; a wrong one keeps it so the
    /// user can retry. Returns `None` when no quiz has been generated.
    pub fn submit(&mut self) -> Option<Verdict> {
        let QuizState::Generated { quiz, selected } = &self.state else {
            return None;
        };

        let picked: AnswerSet = selected
            .iter()
            .filter_map(|i| quiz.options.get(*i).cloned())
            .collect();

        if grade(&picked, &quiz.answers) {
            self.reset();
            return Some(Verdict::Correct);
        }

        let expected = (picked.len() != quiz.answers.len()).then_some(quiz.answers.len());
        Some(Verdict::Incorrect { expected })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn set(items: &[&str]) -> AnswerSet {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_generate_example() {
        let answers = set(&["clean room", "read book"]);
        let pool = DecoyPool::new(["game", "tv", "nap", "snack"]);

        let quiz = generate(&answers, &pool, 3, &mut rng());

        assert_eq!(quiz.len(), 5);
        assert_eq!(
            quiz.options.iter().filter(|o| answers.contains(*o)).count(),
            2
        );
        assert!(grade(&set(&["read book", "clean room"]), &quiz.answers));
        assert!(!grade(&set(&["clean room"]), &quiz.answers));
    }

    #[test]
    fn test_decoys_matching_answers_ignore_case() {
        let answers = set(&["Watch TV"]);
        let pool = DecoyPool::new(["watch tv", "WATCH TV", "nap"]);

        let quiz = generate(&answers, &pool, 3, &mut rng());

        let mut options = quiz.options.clone();
        options.sort();
        assert_eq!(options, vec!["Watch TV".to_string(), "nap".to_string()]);
    }

    #[test]
    fn test_decoy_count_capped() {
        let answers = set(&["a"]);
        let pool = DecoyPool::default();

        assert_eq!(generate(&answers, &pool, 0, &mut rng()).len(), 1);
        assert_eq!(generate(&answers, &pool, 3, &mut rng()).len(), 4);
        assert_eq!(generate(&answers, &pool, 100, &mut rng()).len(), 1 + pool.len());
        let empty = DecoyPool::new(Vec::<String>::new());
        assert_eq!(generate(&answers, &empty, 3, &mut rng()).len(), 1);
    }

    #[test]
    fn test_options_are_shuffled() {
        let answers = set(&["a", "b", "c"]);
        let pool = DecoyPool::new(["x", "y"]);
        let mut rng = rng();

        let mut orders = BTreeSet::new();
        let mut answer_first = 0;
        for _ in 0..50 {
            let quiz = generate(&answers, &pool, 2, &mut rng);
            if answers.contains(&quiz.options[0]) {
                answer_first += 1;
            }
            orders.insert(quiz.options);
        }

        assert!(orders.len() > 1);
        assert!(answer_first < 50);
    }

    #[test]
    fn test_pool_drops_blank_and_duplicates() {
        let pool = DecoyPool::new(["nap", " ", "Nap", "tv "]);
        assert_eq!(pool.iter().collect::<Vec<_>>(), vec!["nap", "tv"]);
    }

    #[test]
    fn test_availability() {
        assert_eq!(Availability::from_tasks(&[]), Availability::NoTasks);

        let mut done = Task::new("laundry");
        done.completed = true;
        assert_eq!(
            Availability::from_tasks(&[done.clone()]),
            Availability::AllComplete
        );

        let open = Task::new("read book");
        assert_eq!(
            Availability::from_tasks(&[done, open]),
            Availability::Ready(set(&["read book"]))
        );
    }

    #[test]
    fn test_session_correct_answer_resets() {
        let answers = set(&["clean room", "read book"]);
        let pool = DecoyPool::default();
        let mut session = QuizSession::new();
        assert_eq!(session.submit(), None);

        assert!(session.ensure_generated(&answers, &pool, 3, &mut rng()));
        let quiz = session.quiz().unwrap().clone();
        for (i, option) in quiz.options.iter().enumerate() {
            if answers.contains(option) {
                session.toggle(i);
            }
        }

        assert_eq!(session.submit(), Some(Verdict::Correct));
        assert!(!session.is_generated());
    }

    #[test]
    fn test_session_wrong_answer_keeps_quiz() {
        let answers = set(&["clean room", "read book"]);
        let pool = DecoyPool::default();
        let mut session = QuizSession::new();
        session.ensure_generated(&answers, &pool, 3, &mut rng());
        let quiz = session.quiz().unwrap().clone();

        // One answer only: size differs, hint given
        let first = quiz.options.iter().position(|o| o == "clean room").unwrap();
        session.toggle(first);
        assert_eq!(
            session.submit(),
            Some(Verdict::Incorrect { expected: Some(2) })
        );

        // Same size but one decoy swapped in: no hint
        let decoy = quiz.options.iter().position(|o| !answers.contains(o)).unwrap();
        session.toggle(decoy);
        assert_eq!(session.submit(), Some(Verdict::Incorrect { expected: None }));

        assert!(session.is_generated());
        assert_eq!(session.quiz(), Some(&quiz));
    }

    #[test]
    fn test_session_regenerates_when_answers_change() {
        let pool = DecoyPool::default();
        let mut session = QuizSession::new();
        session.ensure_generated(&set(&["a", "b"]), &pool, 3, &mut rng());
        session.toggle(0);

        assert!(!session.ensure_generated(&set(&["a", "b"]), &pool, 3, &mut rng()));
        assert_eq!(session.selected_count(), 1);

        assert!(session.ensure_generated(&set(&["a"]), &pool, 3, &mut rng()));
        assert_eq!(session.selected_count(), 0);
        assert_eq!(session.quiz().unwrap().answers, set(&["a"]));
    }

    #[test]
    fn test_regenerate_after_wrong_answer() {
        let answers = set(&["clean room", "read book"]);
        let pool = DecoyPool::default();
        let mut rng = rng();
        let mut session = QuizSession::new();
        session.ensure_generated(&answers, &pool, 3, &mut rng);

        session.toggle(0);
        assert!(matches!(session.submit(), Some(Verdict::Incorrect { .. })));
        assert_eq!(session.selected_count(), 1);

        session.regenerate(&answers, &pool, 3, &mut rng);
        assert!(session.is_generated());
        assert_eq!(session.selected_count(), 0);
        let quiz = session.quiz().unwrap();
        assert_eq!(quiz.answers, answers);
        assert_eq!(quiz.len(), 5);
    }

    #[test]
    fn test_toggle_twice_deselects() {
        let mut session = QuizSession::new();
        session.ensure_generated(&set(&["a"]), &DecoyPool::default(), 3, &mut rng());
        session.toggle(1);
        assert!(session.is_selected(1));
        session.toggle(1);
        assert!(!session.is_selected(1));
        session.toggle(99);
        assert_eq!(session.selected_count(), 0);
    }

    proptest! {
        #[test]
        fn prop_options_are_answers_plus_decoys(
            answers in proptest::collection::btree_set("[a-z]{1,8}", 1..6),
            pool in proptest::collection::vec("[a-z]{1,8}", 0..12),
            max_decoys in 0usize..6,
            seed in any::<u64>(),
        ) {
            let pool = DecoyPool::new(pool);
            let mut rng = StdRng::seed_from_u64(seed);
            let quiz = generate(&answers, &pool, max_decoys, &mut rng);

            let available: BTreeSet<String> = pool
                .iter()
                .filter(|d| !answers.contains(*d))
                .map(str::to_string)
                .collect();
            let decoys: Vec<&String> = quiz
                .options
                .iter()
                .filter(|o| !answers.contains(*o))
                .collect();

            prop_assert_eq!(quiz.len(), answers.len() + max_decoys.min(available.len()));
            prop_assert_eq!(decoys.len(), max_decoys.min(available.len()));
            prop_assert!(decoys.iter().all(|d| available.contains(*d)));
            prop_assert!(answers.iter().all(|a| quiz.options.contains(a)));

            let distinct: BTreeSet<&String> = quiz.options.iter().collect();
            prop_assert_eq!(distinct.len(), quiz.len());
            prop_assert_eq!(&quiz.answers, &answers);
        }

        #[test]
        fn prop_grade_is_set_equality(
            answers in proptest::collection::btree_set("[a-z]{1,6}", 0..5),
            other in proptest::collection::btree_set("[a-z]{1,6}", 0..5),
        ) {
            prop_assert!(grade(&answers, &answers));
            prop_assert_eq!(grade(&other, &answers), other == answers);
        }
    }
}
