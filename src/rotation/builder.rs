use uuid::Uuid;

use crate::{rotation::pairs::unique_pairs, state::session::Pairing};

/// Build a rotation of at least `min_length` matches for the given roster.
///
/// Each full pass walks every unique pair exactly once, greedily preferring a
/// pair that shares exactly one player with the previous entry so one player
/// stays at the table between matches. Passes are appended whole until the
/// length requirement is met, each seeded for continuity against the running
/// tail, so the result may be slightly longer than requested.
///
/// A two-player roster degenerates to the single possible pairing repeated
/// `min_length` times; fewer than two players yields an empty rotation.
pub fn build(roster: &[Uuid], min_length: usize) -> Vec<Pairing> {
    if roster.len() < 2 {
        return Vec::new();
    }
    if roster.len() == 2 {
        return vec![Pairing::new(roster[0], roster[1]); min_length.max(1)];
    }

    let pool = unique_pairs(roster);
    let mut sequence = single_pass(None, &pool);
    while sequence.len() < min_length {
        let tail = sequence.last().copied();
        sequence.extend(single_pass(tail.as_ref(), &pool));
    }
    sequence
}

/// Produce at least `min_extra` further matches continuing an existing
/// rotation whose last entry is `tail`.
///
/// Used by the low-watermark refill: the first spliced pair keeps continuity
/// with the queued tail whenever the roster allows it.
pub fn extend(tail: Option<&Pairing>, roster: &[Uuid], min_extra: usize) -> Vec<Pairing> {
    if roster.len() < 2 {
        return Vec::new();
    }
    if roster.len() == 2 {
        return vec![Pairing::new(roster[0], roster[1]); min_extra.max(1)];
    }

    let pool = unique_pairs(roster);
    let mut sequence = Vec::new();
    let mut seed = tail.copied();
    while sequence.len() < min_extra {
        sequence.extend(single_pass(seed.as_ref(), &pool));
        seed = sequence.last().copied();
    }
    sequence
}

/// One greedy walk over the full pair pool, using each pair exactly once.
///
/// At every step the first unused pair sharing exactly one player with the
/// previous entry wins; when no such pair remains, the first unused pair is
/// taken instead (a full table changeover). Ties always break by the pool's
/// stable order.
fn single_pass(seed: Option<&Pairing>, pool: &[Pairing]) -> Vec<Pairing> {
    let mut used = vec![false; pool.len()];
    let mut pass = Vec::with_capacity(pool.len());
    let mut previous = seed.copied();

    for _ in 0..pool.len() {
        let index = pick_next(previous.as_ref(), pool, &used);
        used[index] = true;
        previous = Some(pool[index]);
        pass.push(pool[index]);
    }
    pass
}

fn pick_next(previous: Option<&Pairing>, pool: &[Pairing], used: &[bool]) -> usize {
    if let Some(previous) = previous {
        let continuity = pool
            .iter()
            .enumerate()
            .find(|(index, pair)| !used[*index] && pair.shared_count(previous) == 1);
        if let Some((index, _)) = continuity {
            return index;
        }
    }

    used.iter()
        .position(|taken| !taken)
        .expect("pool has an unused pair")
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn players(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    /// Whether any unused pair at this step would have preserved continuity.
    fn continuity_possible(previous: &Pairing, remaining: &[Pairing]) -> bool {
        remaining.iter().any(|pair| pair.shared_count(previous) == 1)
    }

    #[test]
    fn one_full_pass_uses_each_pair_exactly_once() {
        for n in 3..=7 {
            let roster = players(n);
            let pair_count = n * (n - 1) / 2;
            let sequence = build(&roster, pair_count);

            assert_eq!(sequence.len(), pair_count);
            let distinct: HashSet<_> = sequence.iter().copied().collect();
            assert_eq!(distinct.len(), pair_count, "no pair dropped or duplicated");
        }
    }

    #[test]
    fn consecutive_entries_share_a_player_when_possible() {
        for n in 3..=7 {
            let roster = players(n);
            let pool = unique_pairs(&roster);
            let sequence = build(&roster, pool.len());

            for (step, window) in sequence.windows(2).enumerate() {
                let (previous, next) = (&window[0], &window[1]);
                let remaining: Vec<Pairing> = pool
                    .iter()
                    .filter(|pair| !sequence[..=step].contains(pair))
                    .copied()
                    .collect();

                if continuity_possible(previous, &remaining) {
                    assert!(
                        next.shared_count(previous) >= 1,
                        "step {step} broke continuity although an eligible pair remained"
                    );
                }
            }
        }
    }

    #[test]
    fn two_player_roster_repeats_the_single_pairing() {
        let roster = players(2);
        let sequence = build(&roster, 25);
        assert_eq!(sequence.len(), 25);
        assert!(sequence.iter().all(|pair| *pair == Pairing::new(roster[0], roster[1])));
    }

    #[test]
    fn degenerate_roster_builds_nothing() {
        assert!(build(&[], 10).is_empty());
        assert!(build(&players(1), 10).is_empty());
    }

    #[test]
    fn four_player_roster_gives_six_continuous_matches() {
        // roster [A,B,C,D]: the 6 unique pairs, every adjacent pair of
        // entries sharing a player.
        let roster = players(4);
        let sequence = build(&roster, 6);

        assert_eq!(sequence.len(), 6);
        let distinct: HashSet<_> = sequence.iter().copied().collect();
        assert_eq!(distinct.len(), 6);
        for window in sequence.windows(2) {
            assert!(window[1].shared_count(&window[0]) >= 1);
        }
    }

    #[test]
    fn extension_passes_never_fall_below_the_request() {
        let roster = players(4);
        let sequence = build(&roster, 100);
        assert!(sequence.len() >= 100);
        // Whole passes only: the length is a multiple of the pass size.
        assert_eq!(sequence.len() % 6, 0);
    }

    #[test]
    fn extend_keeps_continuity_with_the_given_tail() {
        let roster = players(5);
        let base = build(&roster, 10);
        let tail = *base.last().unwrap();

        let extra = extend(Some(&tail), &roster, 8);
        assert!(extra.len() >= 8);
        assert!(extra[0].shared_count(&tail) >= 1, "splice seam keeps continuity");
    }

    #[test]
    fn extend_for_two_players_repeats_the_pairing() {
        let roster = players(2);
        let pairing = Pairing::new(roster[0], roster[1]);
        let extra = extend(Some(&pairing), &roster, 7);
        assert_eq!(extra, vec![pairing; 7]);
    }
}
