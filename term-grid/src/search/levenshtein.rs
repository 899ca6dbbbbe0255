//! Edit distance and similarity over chars.

/// Levenshtein distance between `a` and `b`, counted in chars.
///
/// Fills the full `(m + 1) × (n + 1)` table.
///
/// ```rust
/// use term_grid::search::levenshtein;
///
/// assert_eq!(levenshtein("kitten", "sitting"), 3);
/// assert_eq!(levenshtein("", "abc"), 3);
/// ```
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let (m, n) = (a.len(), b.len());

    let mut table = vec![vec![0usize; n + 1]; m + 1];
    for (i, row) in table.iter_mut().enumerate() {
        row[0] = i;
    }
    for j in 0..=n {
        table[0][j] = j;
    }

    for i in 1..=m {
        for j in 1..=n {
            let substitution = usize::from(a[i - 1] != b[j - 1]);
            table[i][j] = (table[i - 1][j] + 1)
                .min(table[i][j - 1] + 1)
                .min(table[i - 1][j - 1] + substitution);
        }
    }
    table[m][n]
}

/// `1 - distance / max(len)`, in `0.0..=1.0`.
///
/// Two empty strings are identical (1.0). When `case_sensitive` is false both
/// sides are lowercased first.
pub fn similarity(a: &str, b: &str, case_sensitive: bool) -> f64 {
    let (a, b) = if case_sensitive {
        (a.to_string(), b.to_string())
    } else {
        (a.to_lowercase(), b.to_lowercase())
    };
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(&a, &b) as f64 / longest as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_distances() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("flaw", "lawn"), 2);
        assert_eq!(levenshtein("same", "same"), 0);
        assert_eq!(levenshtein("", ""), 0);
    }

    #[test]
    fn test_distance_counts_chars_not_bytes() {
        assert_eq!(levenshtein("café", "cafe"), 1);
    }

    #[test]
    fn test_similarity() {
        assert_eq!(similarity("Grid", "grid", false), 1.0);
        assert!(similarity("Grid", "grid", true) < 1.0);
        assert_eq!(similarity("", "", true), 1.0);
        assert_eq!(similarity("abc", "", true), 0.0);
        let kitten = similarity("kitten", "sitting", true);
        assert!((kitten - (1.0 - 3.0 / 7.0)).abs() < 1e-9);
    }
}
