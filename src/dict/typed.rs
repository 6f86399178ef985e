use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::marker::PhantomData;

use crate::cell::*;
use crate::error::Error;

use super::{build_dict_from_sorted_iter, dict_get, read_label, Branch, DictKey};

/// Typed dictionary with fixed length keys.
pub struct Dict<K, V> {
    pub(crate) root: Option<Cell>,
    _key: PhantomData<K>,
    _value: PhantomData<V>,
}

impl<'a, K, V> Load<'a> for Dict<K, V> {
    #[inline]
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(Self {
            root: ok!(<_>::load_from(slice)),
            _key: PhantomData,
            _value: PhantomData,
        })
    }
}

impl<K, V> Store for Dict<K, V> {
    #[inline]
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        self.root.store_into(builder)
    }
}

impl<K, V> Default for Dict<K, V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Clone for Dict<K, V> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            _key: PhantomData,
            _value: PhantomData,
        }
    }
}

impl<K, V> Eq for Dict<K, V> {}

impl<K, V> PartialEq for Dict<K, V> {
    fn eq(&self, other: &Self) -> bool {
        self.root == other.root
    }
}

impl<K, V> From<Option<Cell>> for Dict<K, V> {
    #[inline]
    fn from(dict: Option<Cell>) -> Self {
        Self {
            root: dict,
            _key: PhantomData,
            _value: PhantomData,
        }
    }
}

impl<K, V> std::fmt::Debug for Dict<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dict").field("root", &self.root).finish()
    }
}

impl<K, V> Dict<K, V> {
    /// Creates an empty dictionary
    pub const fn new() -> Self {
        Self {
            root: None,
            _key: PhantomData,
            _value: PhantomData,
        }
    }

    /// Returns `true` if the dictionary contains no elements.
    pub const fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Returns the underlying root cell of the dictionary.
    #[inline]
    pub const fn root(&self) -> &Option<Cell> {
        &self.root
    }

    /// Returns the underlying root cell of the dictionary.
    #[inline]
    pub fn into_root(self) -> Option<Cell> {
        self.root
    }
}

impl<K: DictKey, V: Store> Dict<K, V> {
    /// Builds a dictionary from a sorted map.
    pub fn try_from_btree(sorted: &BTreeMap<K, V>) -> Result<Self, Error> {
        let root = ok!(build_dict_from_sorted_iter(sorted.iter(), K::BITS));
        Ok(Self::from(root))
    }

    /// Builds a dictionary from a slice of entries.
    ///
    /// For duplicate keys the first entry is used.
    pub fn try_from_sorted_slice(sorted: &[(K, V)]) -> Result<Self, Error> {
        let root = ok!(build_dict_from_sorted_iter(
            sorted.iter().map(|(key, value)| (key, value)),
            K::BITS
        ));
        Ok(Self::from(root))
    }
}

impl<K: DictKey, V> Dict<K, V> {
    /// Returns `true` if the dictionary contains a value for the specified key.
    pub fn contains_key<Q>(&self, key: Q) -> Result<bool, Error>
    where
        Q: Borrow<K>,
    {
        Ok(ok!(self.get_raw(key)).is_some())
    }

    /// Returns the value corresponding to the key.
    pub fn get<'a, Q>(&'a self, key: Q) -> Result<Option<V>, Error>
    where
        Q: Borrow<K>,
        V: Load<'a>,
    {
        match ok!(self.get_raw(key)) {
            Some(mut value) => match V::load_from(&mut value) {
                Ok(value) => Ok(Some(value)),
                Err(e) => Err(e),
            },
            None => Ok(None),
        }
    }

    /// Returns the raw value corresponding to the key.
    pub fn get_raw<Q>(&self, key: Q) -> Result<Option<CellSlice<'_>>, Error>
    where
        Q: Borrow<K>,
    {
        let key = ok!(CellBuilder::build_from(key.borrow()));
        dict_get(self.root.as_ref(), K::BITS, key.as_slice())
    }

    /// Gets an iterator over the entries of the dictionary, sorted by key bits.
    /// The iterator element type is `Result<(K, V)>`.
    ///
    /// If the dictionary is invalid, finishes after the first invalid element,
    /// returning an error.
    pub fn iter<'a>(&'a self) -> Iter<'a, K, V>
    where
        V: Load<'a>,
    {
        Iter::new(&self.root)
    }

    /// Gets an iterator over the keys of the dictionary, in sorted order.
    pub fn keys<'a>(&'a self) -> impl Iterator<Item = Result<K, Error>> + 'a
    where
        K: 'a,
        V: Load<'a> + 'a,
    {
        self.iter().map(|item| item.map(|(key, _)| key))
    }
}

/// An iterator over the entries of a [`Dict`].
///
/// This struct is created by the [`iter`] method on [`Dict`]. See its documentation for more.
///
/// [`iter`]: Dict::iter
pub struct Iter<'a, K, V> {
    segments: Vec<IterSegment<'a>>,
    status: IterStatus,
    _key: PhantomData<K>,
    _value: PhantomData<V>,
}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            segments: self.segments.clone(),
            status: self.status,
            _key: PhantomData,
            _value: PhantomData,
        }
    }
}

impl<'a, K, V> Iter<'a, K, V>
where
    K: DictKey,
{
    /// Creates an iterator over the entries of a dictionary.
    pub fn new(root: &'a Option<Cell>) -> Self {
        let mut segments = Vec::new();
        if let Some(root) = root {
            segments.push(IterSegment {
                data: root,
                prefix: CellBuilder::new(),
            });
        }

        Self {
            segments,
            status: IterStatus::Valid,
            _key: PhantomData,
            _value: PhantomData,
        }
    }

    #[inline]
    fn finish(&mut self, err: Error) -> Error {
        self.status = IterStatus::Broken;
        self.segments.clear();
        err
    }

    fn next_leaf(&mut self) -> Result<Option<(CellBuilder, CellSlice<'a>)>, Error> {
        while let Some(IterSegment { data, mut prefix }) = self.segments.pop() {
            let mut data = data.as_slice();

            let remaining_bit_len = K::BITS.saturating_sub(prefix.bit_len());
            let label = ok!(read_label(&mut data, remaining_bit_len));
            if label.remaining_bits() > remaining_bit_len {
                return Err(Error::CellUnderflow);
            }
            ok!(prefix.store_slice_data(&label));

            if prefix.bit_len() == K::BITS {
                return Ok(Some((prefix, data)));
            }

            // Push the right branch first so that the left one is visited first
            for branch in [Branch::Right, Branch::Left] {
                let Some(child) = data.get_reference(branch as u8) else {
                    return Err(Error::CellUnderflow);
                };
                let mut prefix = prefix.clone();
                ok!(prefix.store_bit(branch == Branch::Right));
                self.segments.push(IterSegment {
                    data: child,
                    prefix,
                });
            }
        }

        Ok(None)
    }
}

impl<'a, K, V> Iterator for Iter<'a, K, V>
where
    K: DictKey,
    V: Load<'a>,
{
    type Item = Result<(K, V), Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.status != IterStatus::Valid {
            return None;
        }

        Some(match self.next_leaf() {
            Ok(Some((key, mut value))) => {
                let err = if let Some(key) = K::from_raw_data(key.raw_data()) {
                    match V::load_from(&mut value) {
                        Ok(value) => return Some(Ok((key, value))),
                        Err(e) => e,
                    }
                } else {
                    Error::CellUnderflow
                };
                Err(self.finish(err))
            }
            Ok(None) => return None,
            Err(e) => Err(self.finish(e)),
        })
    }
}

#[derive(Clone)]
struct IterSegment<'a> {
    data: &'a Cell,
    prefix: CellBuilder,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
enum IterStatus {
    /// Iterator is still valid.
    Valid,
    /// Iterator finished with an error.
    Broken,
}
