use std::{cmp::Ordering, fmt::Display};

use ahash::AHashSet;

use crate::structure::{IndexId, Polarity};

const DIFF: u8 = 0b100;
const SEEN: u8 = 0b011;

/// Target of one mapped index: the target id, which polarities of the source have
/// been mapped so far, and whether the mapping flips polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MappingRecord {
    to: IndexId,
    states: u8,
}

impl MappingRecord {
    pub fn new(to: IndexId, seen: Polarity, diff_states: bool) -> Self {
        MappingRecord {
            to,
            states: seen.bit() | if diff_states { DIFF } else { 0 },
        }
    }

    pub fn to(&self) -> IndexId {
        self.to
    }

    pub fn diff_states(&self) -> bool {
        self.states & DIFF != 0
    }

    pub fn seen(&self, polarity: Polarity) -> bool {
        self.states & polarity.bit() != 0
    }

    /// Both polarities of the source have been mapped.
    pub fn is_contracted(&self) -> bool {
        self.states & SEEN == SEEN
    }

    pub(crate) fn agrees(&self, to: IndexId, diff_states: bool) -> bool {
        self.to == to && self.diff_states() == diff_states
    }

    pub(crate) fn see(&mut self, polarity: Polarity) {
        self.states |= polarity.bit();
    }

    fn unite(&self, other: &MappingRecord) -> Option<MappingRecord> {
        self.agrees(other.to, other.diff_states())
            .then_some(MappingRecord {
                to: self.to,
                states: self.states | other.states,
            })
    }
}

/// Immutable, sorted snapshot of a partial mapping with its sign.
///
/// Two holders merge by a linear scan over their sorted sources; a source present in
/// both must agree on target and polarity flip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FromToHolder {
    from: Vec<IndexId>,
    records: Vec<MappingRecord>,
    sign: bool,
}

impl FromToHolder {
    pub(crate) fn from_entries(
        mut entries: Vec<(IndexId, MappingRecord)>,
        sign: bool,
    ) -> Self {
        entries.sort_unstable_by_key(|(from, _)| *from);
        let (from, records) = entries.into_iter().unzip();
        FromToHolder {
            from,
            records,
            sign,
        }
    }

    pub fn len(&self) -> usize {
        self.from.len()
    }

    pub fn is_empty(&self) -> bool {
        self.from.is_empty()
    }

    pub fn sign(&self) -> bool {
        self.sign
    }

    pub fn get(&self, from: IndexId) -> Option<&MappingRecord> {
        self.from
            .binary_search(&from)
            .ok()
            .map(|pos| &self.records[pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = (IndexId, &MappingRecord)> + '_ {
        self.from.iter().copied().zip(self.records.iter())
    }

    /// Copy of `self` without the given sources.
    pub fn without(&self, excluded: &AHashSet<IndexId>) -> Self {
        let (from, records) = self
            .iter()
            .filter(|(from, _)| !excluded.contains(from))
            .map(|(from, r)| (from, *r))
            .unzip();
        FromToHolder {
            from,
            records,
            sign: self.sign,
        }
    }

    /// Union of both mappings with the XOR of their signs, or `None` on a conflict.
    pub fn merge_with(&self, other: &FromToHolder) -> Option<FromToHolder> {
        let mut from = Vec::with_capacity(self.len() + other.len());
        let mut records = Vec::with_capacity(self.len() + other.len());
        let (mut i, mut j) = (0, 0);
        while i < self.len() && j < other.len() {
            match self.from[i].cmp(&other.from[j]) {
                Ordering::Less => {
                    from.push(self.from[i]);
                    records.push(self.records[i]);
                    i += 1;
                }
                Ordering::Greater => {
                    from.push(other.from[j]);
                    records.push(other.records[j]);
                    j += 1;
                }
                Ordering::Equal => {
                    from.push(self.from[i]);
                    records.push(self.records[i].unite(&other.records[j])?);
                    i += 1;
                    j += 1;
                }
            }
        }
        from.extend_from_slice(&self.from[i..]);
        records.extend_from_slice(&self.records[i..]);
        from.extend_from_slice(&other.from[j..]);
        records.extend_from_slice(&other.records[j..]);
        Some(FromToHolder {
            from,
            records,
            sign: self.sign ^ other.sign,
        })
    }
}

impl Display for FromToHolder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.sign {
            write!(f, "-")?;
        }
        write!(f, "{{")?;
        for (k, (from, record)) in self.iter().enumerate() {
            if k > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{from}")?;
            if record.diff_states() {
                write!(f, "→^{}", record.to())?;
            } else {
                write!(f, "→{}", record.to())?;
            }
        }
        write!(f, "}}")
    }
}
