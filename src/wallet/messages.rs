use crate::cell::*;
use crate::dict::Dict;
use crate::error::{Error, TransferError};
use crate::models::SendMode;
use crate::wallet::MAX_MESSAGES;

/// Messages dictionary of a highload wallet transfer.
///
/// Keys are message positions in the batch.
pub type MessagesDict = Dict<i16, HighloadMessage>;

/// Dictionary entry of a highload wallet transfer.
///
/// ```text
/// _ mode:uint8 message:^Cell = HighloadMessage;
/// ```
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct HighloadMessage {
    /// Send mode of the message.
    pub mode: SendMode,
    /// Encoded outbound message.
    pub message: Cell,
}

impl Store for HighloadMessage {
    fn store_into(&self, builder: &mut CellBuilder) -> Result<(), Error> {
        if !builder.has_capacity(8, 1) {
            return Err(Error::CellOverflow);
        }
        ok!(self.mode.store_into(builder));
        builder.store_reference(self.message.clone())
    }
}

impl<'a> Load<'a> for HighloadMessage {
    fn load_from(slice: &mut CellSlice<'a>) -> Result<Self, Error> {
        Ok(Self {
            mode: ok!(SendMode::load_from(slice)),
            message: ok!(slice.load_reference_cloned()),
        })
    }
}

/// Builds a messages dictionary with the same send mode for all messages.
///
/// Message at position `i` is stored with the key `i`.
pub fn build_messages_dict(mode: SendMode, messages: &[Cell]) -> Result<MessagesDict, TransferError> {
    if messages.len() > MAX_MESSAGES {
        return Err(TransferError::TooManyMessages {
            count: messages.len(),
            max: MAX_MESSAGES,
        });
    }

    let mut entries = Vec::with_capacity(messages.len());
    for (i, message) in messages.iter().enumerate() {
        let Ok(key) = i16::try_from(i) else {
            return Err(TransferError::InvalidInputRange {
                field: "message index",
            });
        };
        entries.push((
            key,
            HighloadMessage {
                mode,
                message: message.clone(),
            },
        ));
    }

    Ok(Dict::try_from_sorted_slice(&entries)?)
}

/// Returns all entries of the messages dictionary ordered by their keys.
pub fn parse_messages(dict: &MessagesDict) -> Result<Vec<(i16, HighloadMessage)>, Error> {
    let mut entries = ok!(dict.iter().collect::<Result<Vec<_>, _>>());
    // NOTE: dictionary iterates negative keys after positive ones
    entries.sort_unstable_by_key(|(key, _)| *key);
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_messages(count: usize) -> anyhow::Result<Vec<Cell>> {
        let mut messages = Vec::with_capacity(count);
        for i in 0..count {
            messages.push(CellBuilder::build_from(i as u32)?);
        }
        Ok(messages)
    }

    #[test]
    fn messages_dict_round_trip() -> anyhow::Result<()> {
        let mode = SendMode::PAY_FEE_SEPARATELY | SendMode::IGNORE_ERROR;
        for count in [0, 1, 2, 3, 17, 128, 200, MAX_MESSAGES] {
            let messages = make_messages(count)?;
            let dict = build_messages_dict(mode, &messages)?;
            assert_eq!(dict.is_empty(), count == 0);

            let entries = parse_messages(&dict)?;
            assert_eq!(entries.len(), count);
            for (i, (key, entry)) in entries.into_iter().enumerate() {
                assert_eq!(key as usize, i);
                assert_eq!(entry.mode, mode);
                assert_eq!(entry.message, messages[i]);
            }
        }
        Ok(())
    }

    #[test]
    fn messages_dict_limits() -> anyhow::Result<()> {
        let messages = make_messages(MAX_MESSAGES + 1)?;
        assert!(matches!(
            build_messages_dict(SendMode::empty(), &messages),
            Err(TransferError::TooManyMessages { count: 255, max: 254 })
        ));
        Ok(())
    }

    #[test]
    fn empty_messages_dict() -> anyhow::Result<()> {
        let dict = build_messages_dict(SendMode::PAY_FEE_SEPARATELY, &[])?;
        let cell = CellBuilder::build_from(&dict)?;
        assert_eq!(cell.bit_len(), 1);
        assert_eq!(cell.reference_count(), 0);
        Ok(())
    }

    #[test]
    fn entry_layout() -> anyhow::Result<()> {
        let message = CellBuilder::build_from(0xdeadbeefu32)?;
        let dict = build_messages_dict(SendMode::PAY_FEE_SEPARATELY, &[message.clone()])?;

        // Single entry: `hml_same` label of 16 zero bits (`11` + `0` + `10000`), then the value
        let root = dict.root().clone().unwrap();
        let mut slice = root.as_slice();
        assert_eq!(slice.load_small_uint(3)?, 0b110);
        assert_eq!(slice.load_small_uint(5)?, 0b10000);
        assert_eq!(slice.load_u8()?, 1);
        assert_eq!(slice.load_reference()?, &message);
        assert!(slice.is_data_empty() && slice.is_refs_empty());
        Ok(())
    }
}
