use std::fmt::{Debug, Display};

use derive_more::{From, Into};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils::{digit_value, to_subscript};

const NAME_BITS: u32 = 24;
const NAME_MASK: u32 = (1 << NAME_BITS) - 1;
const ALPHABET: u32 = 24;
const LATIN: u32 = 26;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("Index name {0} does not fit in 24 bits")]
    NameTooLarge(u32),
    #[error("Unknown index type tag {0}")]
    UnknownType(u8),
    #[error("Unexpected character {0:?} in index list {1:?}")]
    UnexpectedChar(char, String),
    #[error("Index list {0:?} has no polarity marker before the first index")]
    MissingPolarity(String),
    #[error("Index suffix overflows in {0:?}")]
    SuffixOverflow(String),
}

/// The alphabet an index is drawn from.
///
/// Lower case alphabets are metric by default: their indices can be raised and
/// lowered, so an index may be mapped onto the opposite polarity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum IndexType {
    LatinLower,
    LatinUpper,
    GreekLower,
    GreekUpper,
}

impl IndexType {
    pub const ALL: [IndexType; 4] = [
        IndexType::LatinLower,
        IndexType::LatinUpper,
        IndexType::GreekLower,
        IndexType::GreekUpper,
    ];

    pub fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Result<Self, IndexError> {
        Self::ALL
            .get(tag as usize)
            .copied()
            .ok_or(IndexError::UnknownType(tag))
    }

    pub fn is_metric_by_default(self) -> bool {
        matches!(self, IndexType::LatinLower | IndexType::GreekLower)
    }

    fn alphabet_size(self) -> u32 {
        match self {
            IndexType::LatinLower | IndexType::LatinUpper => LATIN,
            IndexType::GreekLower | IndexType::GreekUpper => ALPHABET,
        }
    }

    fn first_letter(self) -> char {
        match self {
            IndexType::LatinLower => 'a',
            IndexType::LatinUpper => 'A',
            IndexType::GreekLower => 'α',
            IndexType::GreekUpper => 'Α',
        }
    }

    fn classify(c: char) -> Option<(IndexType, u32)> {
        IndexType::ALL.into_iter().find_map(|ty| {
            let offset = (c as u32).checked_sub(ty.first_letter() as u32)?;
            // final sigma sits inside the lower greek block
            let offset = match (ty, c) {
                (IndexType::GreekLower, 'ς') => return None,
                (IndexType::GreekLower, _) if c > 'ς' => offset - 1,
                (IndexType::GreekUpper, _) if c > 'Ρ' => offset - 1,
                _ => offset,
            };
            (offset < ty.alphabet_size()).then_some((ty, offset))
        })
    }

    fn letter(self, offset: u32) -> char {
        let mut code = self.first_letter() as u32 + offset;
        match self {
            IndexType::GreekLower if code >= 'ς' as u32 => code += 1,
            IndexType::GreekUpper if code > 'Ρ' as u32 => code += 1,
            _ => {}
        }
        char::from_u32(code).unwrap_or('?')
    }
}

/// Name and type of an index, packed as `type << 24 | name`.
///
/// Polarity is not part of the id: `_m` and `^m` share the same [`IndexId`].
#[derive(
    Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, From, Into,
)]
pub struct IndexId(u32);

impl IndexId {
    pub fn new(ty: IndexType, name: u32) -> Result<Self, IndexError> {
        if name > NAME_MASK {
            return Err(IndexError::NameTooLarge(name));
        }
        Ok(IndexId(((ty.tag() as u32) << NAME_BITS) | name))
    }

    pub fn index_type(self) -> IndexType {
        // only constructed through `new` or deserialisation of a valid id
        IndexType::from_tag((self.0 >> NAME_BITS) as u8).unwrap_or(IndexType::LatinLower)
    }

    pub fn name(self) -> u32 {
        self.0 & NAME_MASK
    }
}

impl Display for IndexId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ty = self.index_type();
        let size = ty.alphabet_size();
        let (offset, suffix) = (self.name() % size, self.name() / size);
        write!(f, "{}", ty.letter(offset))?;
        if suffix > 0 {
            write!(f, "{}", to_subscript(suffix as usize - 1))?;
        }
        Ok(())
    }
}

impl Debug for IndexId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self}")
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Polarity {
    Lower,
    Upper,
}

impl Polarity {
    pub fn dual(self) -> Self {
        match self {
            Polarity::Lower => Polarity::Upper,
            Polarity::Upper => Polarity::Lower,
        }
    }

    pub(crate) fn bit(self) -> u8 {
        match self {
            Polarity::Lower => 0b01,
            Polarity::Upper => 0b10,
        }
    }

    fn marker(self) -> char {
        match self {
            Polarity::Lower => '_',
            Polarity::Upper => '^',
        }
    }
}

/// An index slot occupant: an [`IndexId`] with its polarity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Index {
    pub id: IndexId,
    pub polarity: Polarity,
}

impl Index {
    pub fn new(id: IndexId, polarity: Polarity) -> Self {
        Index { id, polarity }
    }

    pub fn lower(id: IndexId) -> Self {
        Index::new(id, Polarity::Lower)
    }

    pub fn upper(id: IndexId) -> Self {
        Index::new(id, Polarity::Upper)
    }

    pub fn index_type(self) -> IndexType {
        self.id.index_type()
    }
}

impl Display for Index {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", self.polarity.marker(), self.id)
    }
}

/// Parses index-list notation such as `_mn^a` or `^{μν}_α₁`.
///
/// `_` and `^` switch polarity, a letter optionally followed by digits names one
/// index, braces and whitespace are ignored.
pub fn parse_indices(notation: &str) -> Result<Vec<Index>, IndexError> {
    let mut indices: Vec<Index> = Vec::new();
    let mut polarity = None;
    let mut chars = notation.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '_' => polarity = Some(Polarity::Lower),
            '^' => polarity = Some(Polarity::Upper),
            '{' | '}' => {}
            c if c.is_whitespace() => {}
            c => {
                let (ty, offset) = IndexType::classify(c)
                    .ok_or_else(|| IndexError::UnexpectedChar(c, notation.to_string()))?;
                let polarity =
                    polarity.ok_or_else(|| IndexError::MissingPolarity(notation.to_string()))?;
                let mut suffix: Option<u32> = None;
                while let Some(d) = chars.peek().copied().and_then(digit_value) {
                    chars.next();
                    suffix = suffix
                        .unwrap_or(0)
                        .checked_mul(10)
                        .and_then(|s| s.checked_add(d))
                        .map(Some)
                        .ok_or_else(|| IndexError::SuffixOverflow(notation.to_string()))?;
                }
                let name = match suffix {
                    None => offset,
                    Some(s) => (s + 1)
                        .checked_mul(ty.alphabet_size())
                        .and_then(|n| n.checked_add(offset))
                        .ok_or_else(|| IndexError::SuffixOverflow(notation.to_string()))?,
                };
                indices.push(Index::new(IndexId::new(ty, name)?, polarity));
            }
        }
    }
    Ok(indices)
}

/// Writes indices in notation, grouping runs of equal polarity.
pub fn write_indices(f: &mut std::fmt::Formatter<'_>, indices: &[Index]) -> std::fmt::Result {
    let mut last = None;
    for i in indices {
        if last != Some(i.polarity) {
            write!(f, "{}", i.polarity.marker())?;
            last = Some(i.polarity);
        }
        write!(f, "{}", i.id)?;
    }
    Ok(())
}
