use crate::cell::*;
use crate::dict::{write_label, Branch};
use crate::error::Error;

/// Builds a new dictionary from an iterator of entries.
///
/// Entries are ordered by the bit representation of their keys,
/// duplicate keys are skipped (the first entry wins).
/// Returns `None` for an empty iterator.
pub fn build_dict_from_sorted_iter<K, V, I>(
    entries: I,
    key_bit_len: u16,
) -> Result<Option<Cell>, Error>
where
    I: IntoIterator<Item = (K, V)>,
    K: Store,
    V: Store,
{
    let mut items = Vec::<(Cell, V)>::new();
    for (key, value) in entries {
        let mut prefix = CellBuilder::new();
        ok!(key.store_into(&mut prefix));
        if prefix.bit_len() != key_bit_len || !prefix.references().is_empty() {
            return Err(Error::InvalidData);
        }
        items.push((ok!(prefix.build()), value));
    }

    // NOTE: all keys have the same length, so data bytes
    // (with the completion tag) are ordered the same way as key bits
    items.sort_by(|(left, _), (right, _)| left.data().cmp(right.data()));
    items.dedup_by(|(right, _), (left, _)| left == right);

    match items.is_empty() {
        true => Ok(None),
        false => build_node(&items, 0, key_bit_len).map(Some),
    }
}

/// Builds a subtree for entries which share the first `key_offset` bits.
fn build_node<V: Store>(
    items: &[(Cell, V)],
    key_offset: u16,
    key_bit_len: u16,
) -> Result<Cell, Error> {
    let (Some((first, first_value)), Some((last, _))) = (items.first(), items.last()) else {
        return Err(Error::InvalidData);
    };

    let mut first_key = first.as_slice();
    ok!(first_key.skip_first(key_offset, 0));
    let remaining_bits = first_key.remaining_bits();

    let mut last_key = last.as_slice();
    ok!(last_key.skip_first(key_offset, 0));

    // All items are sorted, so the common prefix of
    // the first and the last key is shared by all of them
    let lcp_len = first_key.longest_common_data_prefix_len(&last_key);

    let mut builder = CellBuilder::new();
    ok!(write_label(
        &first_key.get_prefix(lcp_len, 0),
        remaining_bits,
        &mut builder
    ));

    if items.len() == 1 {
        ok!(first_value.store_into(&mut builder));
    } else {
        if lcp_len >= remaining_bits {
            return Err(Error::InvalidData);
        }

        let fork_offset = key_offset + lcp_len;
        let split_at = items.partition_point(|(key, _)| {
            let branch = key.as_slice().get_bit(fork_offset).map(Branch::from);
            branch == Some(Branch::Left)
        });
        let (left, right) = items.split_at(split_at);

        ok!(builder.store_reference(ok!(build_node(left, fork_offset + 1, key_bit_len))));
        ok!(builder.store_reference(ok!(build_node(right, fork_offset + 1, key_bit_len))));
    }

    builder.build()
}
