use uuid::Uuid;

use crate::state::session::Pairing;

/// Enumerate all C(N,2) unordered pairs of the given players, each exactly
/// once, lexicographic by input position.
///
/// Fewer than two players yields an empty vec; pairing is meaningless below
/// that and callers treat it as a roster precondition failure.
pub fn unique_pairs(players: &[Uuid]) -> Vec<Pairing> {
    let mut pairs = Vec::with_capacity(players.len().saturating_sub(1) * players.len() / 2);
    for (i, first) in players.iter().enumerate() {
        for second in &players[i + 1..] {
            pairs.push(Pairing::new(*first, *second));
        }
    }
    pairs
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    fn players(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    #[test]
    fn counts_match_the_binomial() {
        for n in 2..=8 {
            let roster = players(n);
            let pairs = unique_pairs(&roster);
            assert_eq!(pairs.len(), n * (n - 1) / 2, "C({n},2) pairs expected");
        }
    }

    #[test]
    fn no_duplicates_and_no_self_pairs() {
        let roster = players(6);
        let pairs = unique_pairs(&roster);

        let distinct: HashSet<_> = pairs.iter().copied().collect();
        assert_eq!(distinct.len(), pairs.len());
        assert!(pairs.iter().all(|pair| pair.player1 != pair.player2));
    }

    #[test]
    fn two_players_give_the_single_pair() {
        let roster = players(2);
        let pairs = unique_pairs(&roster);
        assert_eq!(pairs, vec![Pairing::new(roster[0], roster[1])]);
    }

    #[test]
    fn degenerate_rosters_give_nothing() {
        assert!(unique_pairs(&[]).is_empty());
        assert!(unique_pairs(&players(1)).is_empty());
    }

    #[test]
    fn order_is_lexicographic_by_input_position() {
        let roster = players(4);
        let pairs = unique_pairs(&roster);
        let expected = [(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)];
        for (pair, (i, j)) in pairs.iter().zip(expected) {
            assert_eq!(pair.player1, roster[i]);
            assert_eq!(pair.player2, roster[j]);
        }
    }
}
