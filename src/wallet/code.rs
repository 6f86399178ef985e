use std::sync::OnceLock;

use crate::boc::Boc;
use crate::cell::Cell;

/// Returns the code of the highload wallet V1 contract.
pub fn highload_v1_code() -> &'static Cell {
    static CODE: OnceLock<Cell> = OnceLock::new();
    CODE.get_or_init(|| Boc::decode_hex(HIGHLOAD_V1_CODE.concat()).expect("invalid embedded code"))
}

/// Returns the code of the highload wallet V2 contract.
pub fn highload_v2_code() -> &'static Cell {
    static CODE: OnceLock<Cell> = OnceLock::new();
    CODE.get_or_init(|| Boc::decode_hex(HIGHLOAD_V2_CODE.concat()).expect("invalid embedded code"))
}

const HIGHLOAD_V1_CODE: &[&str] = &[
    "B5EE9C72410108010097000114FF00F4A413F4BCF2C80B010201200203020148040500B8F28308D7",
    "1820D31FD31FD31F02F823BBF263ED44D0D31FD31FD3FFD15132BAF2A15144BAF2A204F901541055",
    "F910F2A3F404D1F8007F8E16218010F4786FA5209802D307D43001FB009132E201B3E65B01A4C8CB",
    "1FCB1FCBFFC9ED540004D03002014806070017BB39CED44D0D33F31D70BFF80011B8C97ED44D0D70",
    "B1F8BD6A0D31",
];

const HIGHLOAD_V2_CODE: &[&str] = &[
    "B5EE9C724101090100E5000114FF00F4A413F4BCF2C80B010201200203020148040501EAF28308D7",
    "1820D31FD33FF823AA1F5320B9F263ED44D0D31FD33FD3FFF404D153608040F40E6FA131F2605173",
    "BAF2A207F901541087F910F2A302F404D1F8007F8E16218010F4786FA5209802D307D43001FB0091",
    "32E201B3E65B8325A1C840348040F4438AE63101C8CB1F13CB3FCBFFF400C9ED54080004D0300201",
    "2006070017BD9CE76A26869AF98EB85FFC0041BE5F976A268698F98E99FE9FF98FA0268A91040207",
    "A0737D098C92DBFC95DD1F140034208040F4966FA56C122094305303B9DE2093333601926C21E2B3",
    "9F9E545A",
];
