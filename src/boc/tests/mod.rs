use super::*;
use crate::cell::{CellBuilder, HashBytes};

const V1_CODE: &str = "B5EE9C72410108010097000114FF00F4A413F4BCF2C80B010201200203020148040500B8F28308D71820D31FD31FD31F02F823BBF263ED44D0D31FD31FD3FFD15132BAF2A15144BAF2A204F901541055F910F2A3F404D1F8007F8E16218010F4786FA5209802D307D43001FB009132E201B3E65B01A4C8CB1FCB1FCBFFC9ED540004D03002014806070017BB39CED44D0D33F31D70BFF80011B8C97ED44D0D70B1F8BD6A0D31";

#[test]
fn simple_cells() -> anyhow::Result<()> {
    let empty = Boc::encode(&Cell::empty_cell());
    assert_eq!(hex::encode(&empty), "b5ee9c72010101010002000000");
    assert_eq!(Boc::decode(&empty)?, Cell::empty_cell());

    let cell = CellBuilder::build_from(0xdeadbeefu32)?;
    let encoded = Boc::encode(&cell);
    assert_eq!(hex::encode(&encoded), "b5ee9c72010101010006000008deadbeef");
    assert_eq!(Boc::decode(&encoded)?, cell);
    Ok(())
}

#[test]
fn decode_contract_code() -> anyhow::Result<()> {
    let code = Boc::decode_hex(V1_CODE)?;
    assert_eq!(
        code.repr_hash(),
        &"0ab1ff93a9e79c0deff4405d8dad6b5ac9f8c01b2f1ebcb4259feb9e98380099".parse::<HashBytes>()?
    );

    // Re-encoded tree must decode into the same cell
    let encoded = Boc::encode(&code);
    assert_eq!(Boc::decode(&encoded)?.repr_hash(), code.repr_hash());

    let encoded = Boc::encode_base64(&code);
    assert_eq!(Boc::decode_base64(encoded)?, code);
    Ok(())
}

#[test]
fn boc_with_crc() {
    let boc_without_crc = Boc::encode(&Boc::decode_hex(V1_CODE).unwrap());
    let cell = Boc::decode(&boc_without_crc).unwrap();

    let mut boc_with_crc = Boc::encode_with_crc(&cell);
    assert_eq!(boc_without_crc.len() + 4, boc_with_crc.len());
    assert_eq!(boc_with_crc[4] & 0b0100_0000, 0b0100_0000);

    let decoded = Boc::decode(&boc_with_crc).unwrap();
    assert_eq!(decoded, cell);

    let last_byte = boc_with_crc.last_mut().unwrap();
    *last_byte = !*last_byte;

    assert!(matches!(
        Boc::decode(&boc_with_crc),
        Err(de::Error::InvalidChecksum)
    ));
}

#[test]
fn shared_subtrees_are_deduplicated() -> anyhow::Result<()> {
    let leaf = CellBuilder::build_from(0xabu8)?;
    let root = {
        let mut builder = CellBuilder::new();
        builder.store_reference(leaf.clone())?;
        builder.store_reference(leaf.clone())?;
        builder.build()?
    };

    let encoded = Boc::encode(&root);
    let header = de::BocHeader::decode(&encoded, &de::Options::exact(1))?;
    assert_eq!(header.cells().len(), 2);
    assert_eq!(header.roots(), &[0]);

    let decoded = Boc::decode(&encoded)?;
    assert_eq!(decoded, root);
    assert_eq!(decoded.reference(0), decoded.reference(1));
    Ok(())
}

#[test]
fn invalid_bocs() {
    assert_eq!(Boc::decode(Vec::<u8>::new()), Err(de::Error::UnexpectedEof));
    assert_eq!(
        Boc::decode([0xdeu8, 0xad, 0xbe, 0xef, 0x01, 0x01]),
        Err(de::Error::UnknownBocTag)
    );
    assert_eq!(
        Boc::decode_base64("not a boc"),
        Err(de::Error::UnknownBocTag)
    );

    let mut encoded = Boc::encode(&CellBuilder::build_from(0xdeadbeefu32).unwrap());
    encoded.pop();
    assert_eq!(Boc::decode(&encoded), Err(de::Error::UnexpectedEof));

    // Zero roots
    let no_roots = hex::decode("b5ee9c720101010000020000").unwrap();
    assert_eq!(Boc::decode(no_roots), Err(de::Error::RootCellNotFound));

    // Unaligned cell without a completion tag
    let untagged = hex::decode("b5ee9c7201010101000300000180").unwrap();
    assert_eq!(Boc::decode(untagged), Err(de::Error::UnnormalizedCell));
}

#[cfg(feature = "serde")]
#[derive(::serde::Serialize, ::serde::Deserialize)]
struct SerdeWithCell {
    #[serde(with = "Boc")]
    some_cell: Cell,
}

#[cfg(feature = "serde")]
#[test]
fn struct_with_cell() {
    let cell = CellBuilder::build_from(0xdeadbeefu32).unwrap();
    let boc = Boc::encode_base64(&cell);

    let test = format!(r#"{{"some_cell":"{boc}"}}"#);
    let SerdeWithCell { some_cell } = serde_json::from_str(&test).unwrap();
    assert_eq!(some_cell, cell);

    let serialized = serde_json::to_string(&SerdeWithCell { some_cell }).unwrap();
    assert_eq!(serialized, test);
}
