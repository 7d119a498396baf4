//! Best-effort name matching for players who type the character they had in mind.

use super::KnowledgeBase;

/// Minimum normalized similarity accepted by the edit-distance fallback.
pub const SIMILARITY_CUTOFF: f64 = 0.6;

/// Resolves free text to an entity index: exact (case-insensitive) name or id,
/// then a unique substring match, then the closest name by edit distance.
pub fn find_entity(kb: &KnowledgeBase, query: &str) -> Option<usize> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return None;
    }

    let exact = kb.entities().iter().position(|entity| {
        entity.name.to_lowercase() == needle || entity.id.as_str().to_lowercase() == needle
    });
    if exact.is_some() {
        return exact;
    }

    let mut partial = kb
        .entities()
        .iter()
        .enumerate()
        .filter(|(_, entity)| entity.name.to_lowercase().contains(&needle));
    if let (Some((idx, _)), None) = (partial.next(), partial.next()) {
        return Some(idx);
    }

    let mut best: Option<(usize, f64)> = None;
    for (idx, entity) in kb.entities().iter().enumerate() {
        let score = similarity(&needle, &entity.name.to_lowercase());
        if score >= SIMILARITY_CUTOFF && best.is_none_or(|(_, top)| score > top) {
            best = Some((idx, score));
        }
    }
    best.map(|(idx, _)| idx)
}

/// `1 - distance / max_len`, in `[0, 1]`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / longest as f64
}

pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kb::fixtures::four_way;

    #[test]
    fn exact_match_ignores_case_and_accepts_ids() {
        let kb = four_way();
        assert_eq!(find_entity(&kb, "  bravo "), Some(1));
        assert_eq!(find_entity(&kb, "D"), Some(3));
    }

    #[test]
    fn unique_substring_matches() {
        let kb = four_way();
        assert_eq!(find_entity(&kb, "harl"), Some(2));
    }

    #[test]
    fn typos_fall_back_to_edit_distance() {
        let kb = four_way();
        assert_eq!(find_entity(&kb, "Chralie"), Some(2));
        assert_eq!(find_entity(&kb, "zzzzzz"), None);
        assert_eq!(find_entity(&kb, ""), None);
    }

    #[test]
    fn levenshtein_counts_edits() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
    }
}
