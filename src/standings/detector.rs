use std::collections::HashMap;

use super::types::{PlayerRecord, Transition};

/// Compares two lists by index and reports every player whose position
/// moved. Output follows `current` order.
///
/// Players that only appear on one side are ignored, and so are players that
/// kept their position even if their score changed.
pub fn detect_transitions(previous: &[PlayerRecord], current: &[PlayerRecord]) -> Vec<Transition> {
    let previous_index = index_by_name(previous);

    current
        .iter()
        .enumerate()
        .filter_map(|(new_idx, player)| {
            let old_idx = *previous_index.get(player.name.as_str())?;
            (old_idx != new_idx).then(|| Transition::between(&player.name, old_idx + 1, new_idx + 1))
        })
        .collect()
}

/// Players that kept their position but whose score changed.
pub fn detect_score_changes<'a>(
    previous: &[PlayerRecord],
    current: &'a [PlayerRecord],
) -> Vec<&'a str> {
    let previous_index = index_by_name(previous);

    current
        .iter()
        .enumerate()
        .filter(|(new_idx, player)| {
            previous_index
                .get(player.name.as_str())
                .is_some_and(|&old_idx| old_idx == *new_idx && previous[old_idx].score != player.score)
        })
        .map(|(_, player)| player.name.as_str())
        .collect()
}

// first occurrence wins if a name is duplicated
fn index_by_name(players: &[PlayerRecord]) -> HashMap<&str, usize> {
    let mut index = HashMap::with_capacity(players.len());
    for (idx, player) in players.iter().enumerate() {
        index.entry(player.name.as_str()).or_insert(idx);
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::standings::types::{Direction, Score};

    fn list(entries: &[(&str, Score)]) -> Vec<PlayerRecord> {
        entries
            .iter()
            .map(|(name, score)| PlayerRecord::new(*name, *score))
            .collect()
    }

    fn permutations(items: Vec<PlayerRecord>) -> Vec<Vec<PlayerRecord>> {
        if items.len() <= 1 {
            return vec![items];
        }
        let mut out = Vec::new();
        for idx in 0..items.len() {
            let mut rest = items.clone();
            let head = rest.remove(idx);
            for mut tail in permutations(rest) {
                tail.insert(0, head.clone());
                out.push(tail);
            }
        }
        out
    }

    #[test]
    fn swap_at_the_top_reports_both_players() {
        let previous = list(&[("A", 100), ("B", 90), ("C", 80)]);
        let current = list(&[("B", 95), ("A", 100), ("C", 80)]);

        let transitions = detect_transitions(&previous, &current);

        assert_eq!(
            transitions,
            vec![
                Transition {
                    name: "B".into(),
                    old_rank: 2,
                    new_rank: 1,
                    direction: Direction::Up,
                    is_top3: true,
                },
                Transition {
                    name: "A".into(),
                    old_rank: 1,
                    new_rank: 2,
                    direction: Direction::Down,
                    is_top3: true,
                },
            ]
        );
        let celebrating: Vec<_> = transitions
            .iter()
            .filter(|t| t.celebrates())
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(celebrating, ["B"]);
    }

    #[test]
    fn removed_player_yields_no_transition() {
        let previous = list(&[("A", 100), ("B", 90), ("C", 80)]);
        let current = list(&[("A", 100), ("C", 80)]);

        let transitions = detect_transitions(&previous, &current);

        assert!(transitions.iter().all(|t| t.name != "B"));
        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].name, "C");
        assert_eq!((transitions[0].old_rank, transitions[0].new_rank), (3, 2));
    }

    #[test]
    fn new_entrant_is_not_reported() {
        let previous = list(&[("A", 10)]);
        let current = list(&[("N", 50), ("A", 10)]);

        let transitions = detect_transitions(&previous, &current);

        assert_eq!(transitions.len(), 1);
        assert_eq!(transitions[0].name, "A");
        assert_eq!(transitions[0].direction, Direction::Down);
    }

    #[test]
    fn comparing_a_list_with_itself_is_empty() {
        let players = list(&[("A", 3), ("B", 2), ("C", 1), ("D", 0)]);
        assert!(detect_transitions(&players, &players).is_empty());
        assert!(detect_transitions(&[], &[]).is_empty());
    }

    #[test]
    fn score_only_change_is_not_a_transition() {
        let previous = list(&[("A", 100), ("B", 90)]);
        let current = list(&[("A", 150), ("B", 90)]);

        assert!(detect_transitions(&previous, &current).is_empty());
        assert_eq!(detect_score_changes(&previous, &current), ["A"]);
    }

    #[test]
    fn every_moved_player_gets_exactly_one_transition() {
        let base = list(&[("A", 4), ("B", 3), ("C", 2), ("D", 1), ("E", 0)]);

        for current in permutations(base.clone()) {
            let transitions = detect_transitions(&base, &current);

            for (new_idx, player) in current.iter().enumerate() {
                let old_idx = base.iter().position(|p| p.name == player.name).unwrap();
                let matching: Vec<_> = transitions
                    .iter()
                    .filter(|t| t.name == player.name)
                    .collect();

                if old_idx == new_idx {
                    assert!(matching.is_empty());
                    continue;
                }

                assert_eq!(matching.len(), 1);
                let transition = matching[0];
                assert_eq!(transition.old_rank, old_idx + 1);
                assert_eq!(transition.new_rank, new_idx + 1);
                let expected = if old_idx > new_idx {
                    Direction::Up
                } else {
                    Direction::Down
                };
                assert_eq!(transition.direction, expected);
                assert_eq!(transition.is_top3, transition.new_rank <= 3);
            }
        }
    }
}
