use super::Permutation;

/// Rearranges `a` into its lexicographic successor, returning `false` when `a` is the last one.
fn next_permutation(a: &mut [usize]) -> bool {
    if a.len() < 2 {
        return false;
    }
    let mut i = a.len() - 2;
    while a[i] >= a[i + 1] {
        if i == 0 {
            return false;
        }
        i -= 1;
    }
    let mut j = a.len() - 1;
    while a[j] <= a[i] {
        j -= 1;
    }
    a.swap(i, j);
    a[i + 1..].reverse();
    true
}

/// Restartable cursor over all `n!` permutations of `0..n`, in lexicographic order.
///
/// After [`IntPermutations::reset`] the identity comes first. For `n = 0` exactly one
/// (empty) permutation is produced.
#[derive(Debug, Clone)]
pub struct IntPermutations {
    size: usize,
    pending: Option<Vec<usize>>,
}

impl IntPermutations {
    pub fn new(size: usize) -> Self {
        IntPermutations {
            size,
            pending: Some((0..size).collect()),
        }
    }

    pub fn reset(&mut self) {
        self.pending = Some((0..self.size).collect());
    }

    pub fn has_next(&self) -> bool {
        self.pending.is_some()
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

impl Iterator for IntPermutations {
    type Item = Permutation;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.pending.take()?;
        let mut successor = current.clone();
        if next_permutation(&mut successor) {
            self.pending = Some(successor);
        }
        Some(Permutation::from_map(current))
    }
}

/// Like [`IntPermutations`], but the permutation marked with
/// [`PriorityPermutations::prefer_last`] is replayed first after every reset.
///
/// The preference only reorders the sequence: every reset still produces each of the
/// `n!` permutations exactly once.
#[derive(Debug, Clone)]
pub struct PriorityPermutations {
    plain: IntPermutations,
    preferred: Option<Permutation>,
    replayed: bool,
    last: Option<Permutation>,
}

impl PriorityPermutations {
    pub fn new(size: usize) -> Self {
        PriorityPermutations {
            plain: IntPermutations::new(size),
            preferred: None,
            replayed: false,
            last: None,
        }
    }

    pub fn reset(&mut self) {
        self.plain.reset();
        self.replayed = false;
        self.last = None;
    }

    /// Remembers the permutation returned last, replacing any earlier preference.
    ///
    /// Call it after the permutation led to a successful match, then reset.
    pub fn prefer_last(&mut self) {
        if let Some(last) = self.last.take() {
            self.preferred = Some(last);
        }
    }

    pub fn preferred(&self) -> Option<&Permutation> {
        self.preferred.as_ref()
    }
}

impl Iterator for PriorityPermutations {
    type Item = Permutation;

    fn next(&mut self) -> Option<Self::Item> {
        let next = match &self.preferred {
            Some(p) if !self.replayed => {
                self.replayed = true;
                Some(p.clone())
            }
            preferred => {
                self.replayed = true;
                self.plain.by_ref().find(|p| Some(p) != preferred.as_ref())
            }
        };
        self.last.clone_from(&next);
        next
    }
}
