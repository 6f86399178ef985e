use std::str::FromStr;

use super::*;
use crate::cell::*;
use crate::num::Tokens;

fn test_addr() -> StdAddr {
    StdAddr::from_str("0:37c0120beed92563cc8194d904ad8d870c8f4e28fe536f1a0b56899848b5f526").unwrap()
}

#[test]
fn std_addr_from_str() {
    let addr = test_addr();
    assert_eq!(addr.workchain, 0);
    assert_eq!(
        addr.to_string(),
        "0:37c0120beed92563cc8194d904ad8d870c8f4e28fe536f1a0b56899848b5f526"
    );

    let addr = StdAddr::from_str(&format!("-1:{}", "00".repeat(32))).unwrap();
    assert!(addr.is_masterchain());

    assert!(StdAddr::from_str("").is_err());
    assert!(StdAddr::from_str("1000:00").is_err());
    assert!(StdAddr::from_str("0:zz").is_err());
    assert!(StdAddr::from_str(&format!("0:{}:1", "00".repeat(32))).is_err());
}

#[test]
fn std_addr_store_load() -> anyhow::Result<()> {
    let addr = test_addr();
    let cell = CellBuilder::build_from(&addr)?;
    assert_eq!(cell.bit_len(), StdAddr::BITS_WITHOUT_ANYCAST);
    assert_eq!(cell.parse::<StdAddr>()?, addr);

    // addr_none is not a standard address
    let none = CellBuilder::from_raw_data(&[0], 2)?.build()?;
    assert!(none.parse::<StdAddr>().is_err());
    Ok(())
}

#[cfg(feature = "serde")]
#[test]
fn std_addr_serde() -> anyhow::Result<()> {
    let addr = test_addr();
    let json = serde_json::to_string(&addr)?;
    assert_eq!(json, format!("\"{addr}\""));
    assert_eq!(serde_json::from_str::<StdAddr>(&json)?, addr);
    Ok(())
}

#[test]
fn state_init_layout() -> anyhow::Result<()> {
    let state_init = StateInit {
        code: Some(Cell::empty_cell()),
        data: Some(CellBuilder::build_from(123u32)?),
    };

    let cell = CellBuilder::build_from(&state_init)?;
    assert_eq!(cell.bit_len(), 5);
    assert_eq!(cell.reference_count(), 2);
    assert_eq!(cell.as_slice().load_small_uint(5)?, 0b00110);
    assert_eq!(cell.parse::<StateInit>()?, state_init);

    let addr = state_init.compute_address(-1)?;
    assert_eq!(addr.workchain, -1);
    assert_eq!(&addr.address, cell.repr_hash());
    Ok(())
}

#[test]
fn send_mode() -> anyhow::Result<()> {
    let mode = SendMode::PAY_FEE_SEPARATELY | SendMode::IGNORE_ERROR;
    let cell = CellBuilder::build_from(mode)?;
    assert_eq!(cell.as_slice().load_u8()?, 3);
    assert_eq!(cell.parse::<SendMode>()?, mode);
    Ok(())
}

#[test]
fn relaxed_message_inline_body() -> anyhow::Result<()> {
    let message = OutboundMessage {
        dst: test_addr(),
        value: Tokens::new(1_000_000_000),
        bounce: true,
        body: Some(comment_body("hello")?),
        init: None,
    };

    let cell = RelaxedMessageEncoder.encode(&message)?;
    assert_eq!(cell.reference_count(), 0);

    let parsed = cell.parse::<Message>()?;
    assert_eq!(parsed.layout, Some(MessageLayout::plain()));
    let MsgInfo::Int(info) = &parsed.info else {
        panic!("expected an internal message");
    };
    assert!(info.ihr_disabled);
    assert!(info.bounce);
    assert!(info.src.is_none());
    assert_eq!(info.created_lt, 0);

    let outbound = parsed.to_outbound()?;
    assert_eq!(outbound, message);
    assert_eq!(parse_comment(outbound.body.as_ref().unwrap())?, "hello");
    Ok(())
}

#[test]
fn relaxed_message_body_to_cell() -> anyhow::Result<()> {
    let body = {
        let mut builder = CellBuilder::new();
        builder.store_zeros(1000)?;
        builder.build()?
    };
    let init = StateInit {
        code: Some(Cell::empty_cell()),
        data: Some(Cell::empty_cell()),
    };

    let message = OutboundMessage {
        dst: test_addr(),
        value: Tokens::ZERO,
        bounce: false,
        body: Some(body.clone()),
        init: Some(init.clone()),
    };

    let cell = RelaxedMessageEncoder.encode(&message)?;
    // Inline init refs and the body ref
    assert_eq!(cell.reference_count(), 3);
    assert_eq!(cell.reference(2), Some(&body));

    let parsed = cell.parse::<Message>()?;
    assert_eq!(
        parsed.layout,
        Some(MessageLayout {
            init_to_cell: false,
            body_to_cell: true,
        })
    );
    assert_eq!(parsed.init, Some(init));
    assert_eq!(parsed.to_outbound()?, message);
    Ok(())
}

#[test]
fn custom_encoder() -> anyhow::Result<()> {
    let encoder = |message: &OutboundMessage| CellBuilder::build_from(&message.dst);

    let message = OutboundMessage {
        dst: test_addr(),
        value: Tokens::ZERO,
        bounce: false,
        body: None,
        init: None,
    };
    let cell = encoder.encode(&message)?;
    assert_eq!(cell.parse::<StdAddr>()?, message.dst);
    Ok(())
}

#[test]
fn long_comments() -> anyhow::Result<()> {
    let text = "highload ".repeat(40);
    let body = comment_body(&text)?;

    // 123 bytes in the root, 127 bytes in each child
    assert_eq!(body.bit_len(), 32 + 123 * 8);
    let child = body.reference(0).unwrap();
    assert_eq!(child.bit_len(), 127 * 8);
    let last = child.reference(0).unwrap();
    assert_eq!(last.bit_len(), (360 - 123 - 127) * 8);
    assert_eq!(last.reference_count(), 0);

    assert_eq!(parse_comment(&body)?, text);
    assert!(parse_comment(&CellBuilder::build_from(1u32)?).is_err());
    Ok(())
}

#[test]
fn external_message() -> anyhow::Result<()> {
    let body = comment_body("external")?;
    let init = StateInit {
        code: Some(Cell::empty_cell()),
        data: Some(CellBuilder::build_from(1u8)?),
    };

    let cell = build_external_message(&test_addr(), Some(&init), &body)?;
    let parsed = cell.parse::<Message>()?;
    assert_eq!(
        parsed.info,
        MsgInfo::ExtIn(ExtInMsgInfo {
            dst: test_addr(),
            import_fee: Tokens::ZERO,
        })
    );
    assert_eq!(parsed.init, Some(init));
    assert!(parsed.to_outbound().is_err());

    let mut parsed_body = CellBuilder::new();
    parsed_body.store_slice(&parsed.body.unwrap())?;
    assert_eq!(parsed_body.build()?, body);
    Ok(())
}
