//! Iteration helpers.

/// One step of a [`symmetrical_iter`] walk: either a pair taken from both
/// ends of the list, or the lone middle element of an odd-length list.
#[derive(Debug, Clone, PartialEq)]
pub enum Symmetric<T> {
    Pair(T, T),
    Single(T),
}

impl<T> Symmetric<T> {
    /// The element taken from the front of the list.
    pub fn first(&self) -> &T {
        match self {
            Symmetric::Pair(first, _) | Symmetric::Single(first) => first,
        }
    }

    /// The element taken from the back of the list, if any.
    pub fn second(&self) -> Option<&T> {
        match self {
            Symmetric::Pair(_, second) => Some(second),
            Symmetric::Single(_) => None,
        }
    }
}

/// Walk a list from both ends at once.
///
/// `[1, 2, 3, 4]` yields `(1, 4), (2, 3)`; `[1, 2, 3]` yields `(1, 3), 2`.
pub fn symmetrical_iter<T: Clone>(items: &[T]) -> Vec<Symmetric<T>> {
    let n = items.len();
    (0..(n + 1) / 2)
        .map(|i| {
            let j = n - 1 - i;
            if i == j {
                Symmetric::Single(items[i].clone())
            } else {
                Symmetric::Pair(items[i].clone(), items[j].clone())
            }
        })
        .collect()
}

/// True when every element equals the first (vacuously true when empty).
pub fn all_equal<T: PartialEq>(items: &[T]) -> bool {
    items.windows(2).all(|w| w[0] == w[1])
}

/// A possibly nested list, as produced when collecting values per subplot
/// and then per layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Nested<T> {
    Item(T),
    List(Vec<Nested<T>>),
}

/// Flatten a nested list depth-first.
pub fn flatten<T: Clone>(items: &[Nested<T>]) -> Vec<T> {
    let mut flat = Vec::new();
    for item in items {
        match item {
            Nested::Item(value) => flat.push(value.clone()),
            Nested::List(inner) => flat.extend(flatten(inner)),
        }
    }
    flat
}

/// Remove duplicates, keeping the first occurrence of each value.
pub fn unique<T: PartialEq + Clone>(items: &[T]) -> Vec<T> {
    let mut seen: Vec<T> = Vec::with_capacity(items.len());
    for item in items {
        if !seen.contains(item) {
            seen.push(item.clone());
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_symmetrical_iter_even() {
        assert_eq!(
            symmetrical_iter(&[1, 2, 3, 4]),
            vec![Symmetric::Pair(1, 4), Symmetric::Pair(2, 3)]
        );
    }

    #[test]
    fn test_symmetrical_iter_odd() {
        assert_eq!(
            symmetrical_iter(&[1, 2, 3]),
            vec![Symmetric::Pair(1, 3), Symmetric::Single(2)]
        );
        assert_eq!(symmetrical_iter(&[1]), vec![Symmetric::Single(1)]);
    }

    #[test]
    fn test_symmetrical_iter_small() {
        let empty: Vec<i32> = vec![];
        assert!(symmetrical_iter(&empty).is_empty());
        assert_eq!(symmetrical_iter(&[1, 2]), vec![Symmetric::Pair(1, 2)]);
    }

    #[test]
    fn test_symmetrical_iter_duplicates_are_pairs() {
        // Equal values at opposite ends still form a pair
        assert_eq!(
            symmetrical_iter(&[5, 7, 5]),
            vec![Symmetric::Pair(5, 5), Symmetric::Single(7)]
        );
    }

    #[test]
    fn test_all_equal() {
        assert!(all_equal(&[1, 1, 1]));
        assert!(!all_equal(&[1, 2, 1]));
        assert!(all_equal::<i32>(&[]));
        assert!(all_equal(&["K"]));
    }

    #[test]
    fn test_flatten() {
        let nested = vec![
            Nested::Item(1),
            Nested::List(vec![Nested::Item(2), Nested::List(vec![Nested::Item(3)])]),
            Nested::Item(4),
        ];
        assert_eq!(flatten(&nested), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_unique_preserves_order() {
        assert_eq!(unique(&["b", "a", "b", "c", "a"]), vec!["b", "a", "c"]);
    }
}
