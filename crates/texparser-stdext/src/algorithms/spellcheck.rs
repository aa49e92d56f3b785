//! Spell checking using Levenshtein distance
//!
//! Used to suggest a known control sequence when an undefined one is encountered.
//! The distance is computed with the classic dynamic programming recurrence,
//! keeping only the previous row of the matrix.

/// Returns the Levenshtein distance between the two words.
pub fn distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];
    for (i, a_char) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, b_char) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(a_char != *b_char);
            let deletion = previous[j + 1] + 1;
            let insertion = current[j] + 1;
            current[j + 1] = substitution.min(deletion).min(insertion);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}

/// Finds words in the dictionary that are close to the search word.
///
/// Returns at most `max_results` words whose distance is at most `max_distance`,
/// closest first.
/// Ties are broken alphabetically so the output is deterministic.
pub fn find_close_words<'a, I: IntoIterator<Item = &'a str>>(
    dictionary: I,
    word: &str,
    max_distance: usize,
    max_results: usize,
) -> Vec<&'a str> {
    let mut candidates: Vec<(usize, &'a str)> = dictionary
        .into_iter()
        .map(|candidate| (distance(word, candidate), candidate))
        .filter(|(d, _)| *d <= max_distance)
        .collect();
    candidates.sort();
    candidates.dedup();
    candidates
        .into_iter()
        .take(max_results)
        .map(|(_, candidate)| candidate)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! distance_tests {
        ($( ($name: ident, $a: expr, $b: expr, $want: expr), )+) => {
            $(
                #[test]
                fn $name() {
                    assert_eq!(distance($a, $b), $want);
                    assert_eq!(distance($b, $a), $want);
                }
            )+
        };
    }

    distance_tests![
        (same_word, "def", "def", 0),
        (empty, "", "relax", 5),
        (one_substitution, "gdef", "edef", 1),
        (one_deletion, "iftrue", "iftru", 1),
        (kitten, "kitten", "sitting", 3),
    ];

    #[test]
    fn close_words_are_sorted() {
        let dictionary = ["else", "fi", "ifnum", "ifcase", "iftrue", "iffalse"];
        assert_eq!(
            find_close_words(dictionary, "iftru", 3, 3),
            vec!["iftrue", "ifnum"]
        );
    }
}
