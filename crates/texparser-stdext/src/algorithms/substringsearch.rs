//! Knuth–Morris–Pratt substring search
//!
//! Finds occurrences of a fixed, non-empty pattern in a sequence whose elements
//! arrive one at a time.
//! This is the shape of the problem when matching the delimiter of a macro argument:
//! tokens are pulled from the input stream until the delimiter has been seen,
//! and the full input is never available up front.
//!
//! A [Matcher] is built once per pattern and precomputes the prefix function.
//! Each search creates a cheap [Search] with [Matcher::start].
//!
//! ```
//! # use texparser_stdext::algorithms::substringsearch::Matcher;
//! let matcher = Matcher::new(vec![2, 3, 2]).unwrap();
//! let mut search = matcher.start();
//! assert_eq![search.next(&1), false];
//! assert_eq![search.next(&2), false];
//! assert_eq![search.next(&3), false];
//! assert_eq![search.next(&2), true];
//! assert_eq![search.next(&3), false];
//! assert_eq![search.next(&2), true];
//! ```

/// Precomputed data for searching for a specific pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matcher<T> {
    pattern: Vec<T>,
    prefix_fn: Vec<usize>,
}

impl<T: PartialEq> Matcher<T> {
    /// Builds a matcher for the pattern, or returns [None] if the pattern is empty.
    pub fn new(pattern: Vec<T>) -> Option<Matcher<T>> {
        if pattern.is_empty() {
            return None;
        }
        let mut prefix_fn = Vec::with_capacity(pattern.len());
        prefix_fn.push(0);
        let mut k = 0;
        for i in 1..pattern.len() {
            while k > 0 && pattern[k] != pattern[i] {
                k = prefix_fn[k - 1];
            }
            if pattern[k] == pattern[i] {
                k += 1;
            }
            prefix_fn.push(k);
        }
        Some(Matcher { pattern, prefix_fn })
    }

    pub fn start(&self) -> Search<'_, T> {
        Search {
            matcher: self,
            matched: 0,
        }
    }

    /// Returns the pattern.
    pub fn pattern(&self) -> &[T] {
        &self.pattern
    }
}

/// An in-progress search.
pub struct Search<'a, T> {
    matcher: &'a Matcher<T>,
    matched: usize,
}

impl<'a, T: PartialEq> Search<'a, T> {
    /// Feeds the next element.
    ///
    /// Returns true if the elements fed so far end with the pattern.
    pub fn next(&mut self, tail: &T) -> bool {
        let pattern = &self.matcher.pattern;
        while self.matched > 0 && &pattern[self.matched] != tail {
            self.matched = self.matcher.prefix_fn[self.matched - 1];
        }
        if &pattern[self.matched] == tail {
            self.matched += 1;
        }
        if self.matched == pattern.len() {
            self.matched = self.matcher.prefix_fn[self.matched - 1];
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn find_all(pattern: &str, input: &str) -> Vec<usize> {
        let matcher = Matcher::new(pattern.chars().collect()).unwrap();
        let mut search = matcher.start();
        input
            .chars()
            .enumerate()
            .filter_map(|(i, c)| if search.next(&c) { Some(i) } else { None })
            .collect()
    }

    #[test]
    fn empty_pattern() {
        assert_eq!(Matcher::<char>::new(vec![]), None);
    }

    #[test]
    fn single_element() {
        assert_eq!(find_all("a", "banana"), vec![1, 3, 5]);
    }

    #[test]
    fn overlapping_matches() {
        assert_eq!(find_all("aa", "aaaa"), vec![1, 2, 3]);
    }

    #[test]
    fn fallback_through_prefix_function() {
        assert_eq!(find_all("abab", "abaabab"), vec![6]);
    }

    #[test]
    fn no_match() {
        assert_eq!(find_all("xyz", "xyxyxzy"), Vec::<usize>::new());
    }
}
