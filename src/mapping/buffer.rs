use std::{
    collections::hash_map::Entry,
    fmt::Display,
    hash::{Hash, Hasher},
    sync::Arc,
};

use ahash::AHashMap;

use super::holder::{FromToHolder, MappingRecord};
use crate::{
    settings::MappingSettings,
    structure::{Index, IndexId},
};

/// A partial index mapping under construction, with the sign accumulated so far.
///
/// Keys of the optional frozen holder must be mapped exactly as the holder says and
/// are never recorded in the buffer itself. Equality and hashing look at the exported
/// content and the sign only.
#[derive(Debug, Clone)]
pub struct IndexMappingBuffer {
    map: AHashMap<IndexId, MappingRecord>,
    frozen: Option<Arc<FromToHolder>>,
    sign: bool,
    settings: MappingSettings,
}

impl IndexMappingBuffer {
    pub fn new(settings: MappingSettings) -> Self {
        IndexMappingBuffer {
            map: AHashMap::new(),
            frozen: None,
            sign: false,
            settings,
        }
    }

    /// A fresh buffer that checks candidates against `frozen`.
    pub fn tester(frozen: Arc<FromToHolder>, settings: MappingSettings) -> Self {
        IndexMappingBuffer {
            frozen: Some(frozen),
            ..Self::new(settings)
        }
    }

    pub fn from_holder(holder: &FromToHolder, settings: MappingSettings) -> Self {
        IndexMappingBuffer {
            map: holder.iter().map(|(from, r)| (from, *r)).collect(),
            frozen: None,
            sign: holder.sign(),
            settings,
        }
    }

    /// Records `from → to`.
    ///
    /// Fails on differing index types, on a polarity flip that the settings forbid for
    /// this type, and on a conflict with an earlier or frozen record. Repeating an
    /// existing record succeeds.
    pub fn try_map(&mut self, from: Index, to: Index) -> bool {
        let ty = from.index_type();
        if ty != to.index_type() {
            return false;
        }
        let diff_states = from.polarity != to.polarity;
        if diff_states && !self.settings.allows_diff_states(ty) {
            return false;
        }
        if let Some(record) = self.frozen.as_ref().and_then(|f| f.get(from.id)) {
            return record.agrees(to.id, diff_states);
        }
        match self.map.entry(from.id) {
            Entry::Occupied(mut e) => {
                let record = e.get_mut();
                if !record.agrees(to.id, diff_states) {
                    return false;
                }
                record.see(from.polarity);
                true
            }
            Entry::Vacant(e) => {
                e.insert(MappingRecord::new(to.id, from.polarity, diff_states));
                true
            }
        }
    }

    pub fn add_sign(&mut self, sign: bool) {
        self.sign ^= sign;
    }

    pub fn sign(&self) -> bool {
        self.sign
    }

    pub fn settings(&self) -> &MappingSettings {
        &self.settings
    }

    pub fn get(&self, from: IndexId) -> Option<&MappingRecord> {
        self.map
            .get(&from)
            .or_else(|| self.frozen.as_ref().and_then(|f| f.get(from)))
    }

    /// Drops records whose source has been mapped with both polarities.
    pub fn remove_contracted(&mut self) {
        self.map.retain(|_, r| !r.is_contracted());
    }

    /// Number of records held by the buffer itself, excluding frozen ones.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (IndexId, &MappingRecord)> + '_ {
        self.map.iter().map(|(from, r)| (*from, r))
    }

    /// Own and frozen records as a sorted holder carrying the buffer's sign.
    pub fn export(&self) -> FromToHolder {
        let mut entries: Vec<_> = self.iter().map(|(from, r)| (from, *r)).collect();
        if let Some(frozen) = &self.frozen {
            entries.extend(frozen.iter().map(|(from, r)| (from, *r)));
        }
        FromToHolder::from_entries(entries, self.sign)
    }
}

impl PartialEq for IndexMappingBuffer {
    fn eq(&self, other: &Self) -> bool {
        self.export() == other.export()
    }
}

impl Eq for IndexMappingBuffer {}

impl Hash for IndexMappingBuffer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.export().hash(state)
    }
}

impl Display for IndexMappingBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.export())
    }
}
