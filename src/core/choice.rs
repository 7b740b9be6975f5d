//! Choice pseudostates.
//!
//! A choice routes to exactly one of at least two branches. Guards are
//! evaluated lazily in declaration order; the first true guard wins and the
//! chain must end with an unconditional branch, so a choice can never fail to
//! select.

/// Start a choice with its first guarded branch.
///
/// # Example
///
/// ```rust
/// use railchart::core::choice;
///
/// let turned_left = false;
/// let target = choice(|| turned_left, "left")
///     .when(|| !turned_left, "right")
///     .otherwise("turning");
/// assert_eq!(target, "right");
/// ```
pub fn choice<S, G>(guard: G, target: S) -> Choice<S>
where
    G: FnOnce() -> bool,
{
    Choice {
        selected: guard().then_some(target),
    }
}

/// A partially evaluated branch chain; finish it with [`Choice::otherwise`].
#[must_use = "a choice selects nothing until `otherwise` is called"]
#[derive(Debug)]
pub struct Choice<S> {
    selected: Option<S>,
}

impl<S> Choice<S> {
    /// Add a guarded branch. The guard is not evaluated once a branch matched.
    pub fn when<G>(self, guard: G, target: S) -> Self
    where
        G: FnOnce() -> bool,
    {
        match self.selected {
            Some(_) => self,
            None => Self {
                selected: guard().then_some(target),
            },
        }
    }

    /// Close the chain with the unconditional branch.
    pub fn otherwise(self, target: S) -> S {
        self.selected.unwrap_or(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn first_true_guard_wins() {
        let target = choice(|| false, 1).when(|| true, 2).when(|| true, 3).otherwise(4);
        assert_eq!(target, 2);
    }

    #[test]
    fn otherwise_is_taken_last() {
        let target = choice(|| false, 1).when(|| false, 2).otherwise(3);
        assert_eq!(target, 3);
    }

    #[test]
    fn guards_after_the_match_are_not_evaluated() {
        let evaluated = Cell::new(0);
        let target = choice(
            || {
                evaluated.set(evaluated.get() + 1);
                true
            },
            "a",
        )
        .when(
            || {
                evaluated.set(evaluated.get() + 1);
                true
            },
            "b",
        )
        .otherwise("c");

        assert_eq!(target, "a");
        assert_eq!(evaluated.get(), 1);
    }
}
