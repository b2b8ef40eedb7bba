use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use rand::{seq::SliceRandom, Rng};
use uuid::Uuid;

use crate::database::quiz::Quiz;

/// Pools this small are picked from freely; there is nothing to rotate.
pub const SMALL_POOL: usize = 3;

/// Ids of the most recently dispatched quizzes, oldest at the front.
#[derive(Debug, Clone)]
pub struct RecentWindow {
    ids: VecDeque<Uuid>,
    capacity: usize,
}

impl RecentWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            ids: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Moves `id` to the back (appending it if absent) and evicts from the
    /// front past capacity.
    pub fn track(&mut self, id: Uuid) {
        if let Some(position) = self.ids.iter().position(|recent| *recent == id) {
            self.ids.remove(position);
        }
        self.ids.push_back(id);
        while self.ids.len() > self.capacity {
            self.ids.pop_front();
        }
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Uuid> {
        self.ids.iter()
    }
}

/// Picks the next quiz to send from the active members of `pool`.
///
/// Small pools are sampled uniformly. Larger ones skip whatever is in the
/// recent window; when the window covers the whole pool, the quizzes sent
/// longest ago (never-sent first) are picked from instead. Selection does
/// not touch the window.
pub fn select_quiz<'a, R>(pool: &'a [Quiz], recent: &RecentWindow, rng: &mut R) -> Option<&'a Quiz>
where
    R: Rng + ?Sized,
{
    let active: Vec<&Quiz> = pool.iter().filter(|quiz| quiz.is_active()).collect();
    if active.len() <= SMALL_POOL {
        return active.choose(rng).copied();
    }

    let fresh: Vec<&Quiz> = active
        .iter()
        .copied()
        .filter(|quiz| !recent.contains(quiz.id()))
        .collect();
    if !fresh.is_empty() {
        return fresh.choose(rng).copied();
    }

    let oldest = active.iter().map(|quiz| sent_at(quiz)).min()?;
    let stalest: Vec<&Quiz> = active
        .into_iter()
        .filter(|quiz| sent_at(quiz) == oldest)
        .collect();
    stalest.choose(rng).copied()
}

// never-sent quizzes sort before everything else
fn sent_at(quiz: &Quiz) -> DateTime<Utc> {
    quiz.last_sent().unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    fn quiz(question: &str) -> Quiz {
        Quiz::new(question.into(), vec!["yes".into(), "no".into()], 0).unwrap()
    }

    fn pool(n: usize) -> Vec<Quiz> {
        (0..n).map(|i| quiz(&format!("question {i}"))).collect()
    }

    #[test]
    fn empty_pool_yields_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(select_quiz(&[], &RecentWindow::new(10), &mut rng).is_none());
    }

    #[test]
    fn small_pools_ignore_the_window() {
        let mut rng = StdRng::seed_from_u64(7);
        for size in 1..=SMALL_POOL {
            let pool = pool(size);
            let mut window = RecentWindow::new(10);
            pool.iter().for_each(|q| window.track(q.id()));

            for _ in 0..50 {
                let picked = select_quiz(&pool, &window, &mut rng).unwrap();
                assert!(pool.iter().any(|q| q.id() == picked.id()));
            }
        }
    }

    #[test]
    fn recent_quizzes_are_skipped() {
        let mut rng = StdRng::seed_from_u64(3);
        let pool = pool(6);
        let mut window = RecentWindow::new(10);
        pool[..5].iter().for_each(|q| window.track(q.id()));

        for _ in 0..50 {
            assert_eq!(select_quiz(&pool, &window, &mut rng).unwrap().id(), pool[5].id());
        }
    }

    #[test]
    fn saturated_window_falls_back_to_oldest() {
        let mut rng = StdRng::seed_from_u64(11);
        let now = Utc::now();
        let pool: Vec<Quiz> = pool(5)
            .into_iter()
            .enumerate()
            .map(|(i, q)| q.with_last_sent(Some(now - Duration::minutes(i as i64))))
            .collect();
        let mut window = RecentWindow::new(10);
        pool.iter().for_each(|q| window.track(q.id()));

        assert_eq!(select_quiz(&pool, &window, &mut rng).unwrap().id(), pool[4].id());
    }

    #[test]
    fn never_sent_counts_as_oldest_and_ties_stay_in_the_tie_set() {
        let mut rng = StdRng::seed_from_u64(5);
        let now = Utc::now();
        let mut pool = pool(5);
        pool[0] = pool[0].clone().with_last_sent(Some(now));
        pool[1] = pool[1].clone().with_last_sent(Some(now));
        pool[2] = pool[2].clone().with_last_sent(Some(now));
        let mut window = RecentWindow::new(10);
        pool.iter().for_each(|q| window.track(q.id()));

        let ties = [pool[3].id(), pool[4].id()];
        for _ in 0..50 {
            assert!(ties.contains(&select_quiz(&pool, &window, &mut rng).unwrap().id()));
        }
    }

    #[test]
    fn inactive_quizzes_are_never_picked() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut pool = pool(2);
        pool[0].set_active(false);
        for _ in 0..20 {
            assert_eq!(select_quiz(&pool, &RecentWindow::new(10), &mut rng).unwrap().id(), pool[1].id());
        }
    }

    #[test]
    fn window_never_exceeds_capacity() {
        let mut window = RecentWindow::new(4);
        let ids: Vec<Uuid> = (0..9).map(|_| Uuid::new_v4()).collect();
        for (step, id) in ids.iter().cycle().take(40).enumerate() {
            window.track(*id);
            if step % 3 == 0 {
                window.track(ids[0]);
            }
            assert!(window.len() <= 4);
        }
    }

    #[test]
    fn retracking_moves_to_back_without_duplicates() {
        let mut window = RecentWindow::new(3);
        let (a, b, c, d) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        window.track(a);
        window.track(b);
        window.track(c);
        window.track(a);
        assert_eq!(window.iter().copied().collect::<Vec<_>>(), vec![b, c, a]);

        window.track(d);
        assert_eq!(window.iter().copied().collect::<Vec<_>>(), vec![c, a, d]);
        assert!(!window.contains(b));
    }
}
