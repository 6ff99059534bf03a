//! Minimal ABI codec for the SliceBattle contract
//!
//! Every value the contract exchanges is a static type, so calls are a
//! selector followed by 32-byte words and returns are consecutive words.

use anyhow::{Context, Result, anyhow, bail, ensure};
use glam::IVec2;

use crate::Address;
use crate::sim::{Slice, SliceMoved, Topping};

pub type Word = [u8; 32];

/// `move(int8,int8)`
pub const MOVE_SELECTOR: [u8; 4] = [0x6d, 0x5f, 0xd0, 0x93];
/// `respawn()`
pub const RESPAWN_SELECTOR: [u8; 4] = [0x0b, 0x1c, 0xdb, 0xc6];
/// `getSlice(address)`
pub const GET_SLICE_SELECTOR: [u8; 4] = [0xad, 0xe4, 0x89, 0xd7];
/// `getTopping(uint256)`
pub const GET_TOPPING_SELECTOR: [u8; 4] = [0x1a, 0xd4, 0xe5, 0xeb];
/// `getLeaderboard()`
pub const GET_LEADERBOARD_SELECTOR: [u8; 4] = [0x6d, 0x76, 0x3a, 0x6e];
/// keccak256("SliceMoved(address,int8,int8,uint24)")
pub const SLICE_MOVED_TOPIC: &str = "0xf6a8f18b69dd2eb4e1d895ca604448cccd8b001d337ded776252a08472c7ef7c";

/// Hex string with 0x prefix
pub fn to_hex(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Decode a 0x-prefixed (or bare) hex string
pub fn from_hex(s: &str) -> Result<Vec<u8>> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(s).with_context(|| format!("invalid hex: {s:.16}"))
}

/// Parse a JSON-RPC quantity ("0x1a")
pub fn parse_quantity(s: &str) -> Result<u64> {
    let digits = s.strip_prefix("0x").ok_or_else(|| anyhow!("quantity without 0x: {s}"))?;
    if digits.is_empty() {
        bail!("empty quantity");
    }
    u64::from_str_radix(digits, 16).with_context(|| format!("invalid quantity: {s}"))
}

/// Format a JSON-RPC quantity
pub fn quantity(n: u64) -> String {
    format!("0x{n:x}")
}

fn address_word(address: &Address) -> Result<Word> {
    let bytes = from_hex(address.as_str())?;
    ensure!(bytes.len() == 20, "address must be 20 bytes: {}", address);
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(&bytes);
    Ok(word)
}

fn uint_word(n: u64) -> Word {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&n.to_be_bytes());
    word
}

fn int8_word(n: i8) -> Word {
    let mut word = if n < 0 { [0xff; 32] } else { [0u8; 32] };
    word[31] = n as u8;
    word
}

fn call(selector: [u8; 4], args: &[Word]) -> String {
    let mut data = Vec::with_capacity(4 + 32 * args.len());
    data.extend_from_slice(&selector);
    for arg in args {
        data.extend_from_slice(arg);
    }
    to_hex(&data)
}

pub fn encode_move(dx: i8, dy: i8) -> String {
    call(MOVE_SELECTOR, &[int8_word(dx), int8_word(dy)])
}

pub fn encode_respawn() -> String {
    call(RESPAWN_SELECTOR, &[])
}

pub fn encode_get_slice(player: &Address) -> Result<String> {
    Ok(call(GET_SLICE_SELECTOR, &[address_word(player)?]))
}

pub fn encode_get_topping(id: u64) -> String {
    call(GET_TOPPING_SELECTOR, &[uint_word(id)])
}

pub fn encode_get_leaderboard() -> String {
    call(GET_LEADERBOARD_SELECTOR, &[])
}

/// Split return data into words, requiring at least `count`
pub fn words(data: &str, count: usize) -> Result<Vec<Word>> {
    let bytes = from_hex(data)?;
    ensure!(
        bytes.len() >= count * 32,
        "expected {} words, got {} bytes",
        count,
        bytes.len()
    );
    Ok(bytes
        .chunks_exact(32)
        .take(count)
        .map(|c| {
            let mut w = [0u8; 32];
            w.copy_from_slice(c);
            w
        })
        .collect())
}

/// Unsigned value of at most `bits` bits
fn decode_uint(word: &Word, bits: u32) -> Result<u64> {
    ensure!(word[..24].iter().all(|&b| b == 0), "uint{} out of range", bits);
    let n = u64::from_be_bytes(word[24..].try_into()?);
    ensure!(bits >= 64 || n >> bits == 0, "uint{} out of range: {}", bits, n);
    Ok(n)
}

fn decode_int8(word: &Word) -> Result<i8> {
    let n = word[31] as i8;
    let fill = if n < 0 { 0xff } else { 0 };
    ensure!(word[..31].iter().all(|&b| b == fill), "int8 out of range");
    Ok(n)
}

fn decode_address(word: &Word) -> Result<Address> {
    ensure!(word[..12].iter().all(|&b| b == 0), "dirty address word");
    Ok(Address::new(to_hex(&word[12..])))
}

/// `getSlice` return: (uint24 size, int8 x, int8 y, uint32 respawn, uint16 eats, uint16 toppingEats)
pub fn decode_slice(player: &Address, data: &str) -> Result<Slice> {
    let w = words(data, 6)?;
    Ok(Slice {
        address: player.clone(),
        size: decode_uint(&w[0], 24)? as u32,
        pos: IVec2::new(decode_int8(&w[1])? as i32, decode_int8(&w[2])? as i32),
        respawn_block: decode_uint(&w[3], 32)?,
        eats: decode_uint(&w[4], 16)? as u32,
        topping_eats: decode_uint(&w[5], 16)? as u32,
    })
}

/// `getTopping` return: (int8 x, int8 y, uint8 toppingId, uint32 eatenAt)
pub fn decode_topping(data: &str) -> Result<Topping> {
    let w = words(data, 4)?;
    Ok(Topping {
        pos: IVec2::new(decode_int8(&w[0])? as i32, decode_int8(&w[1])? as i32),
        topping_id: decode_uint(&w[2], 8)? as u8,
        eaten_at: decode_uint(&w[3], 32)?,
    })
}

/// `getLeaderboard` return: address[5]
pub fn decode_leaderboard(data: &str) -> Result<Vec<Address>> {
    words(data, 5)?.iter().map(decode_address).collect()
}

/// `SliceMoved` log: topic 1 is the player, data is (int8 x, int8 y, uint24 size)
pub fn decode_slice_moved(topics: &[String], data: &str) -> Result<SliceMoved> {
    ensure!(topics.len() >= 2, "SliceMoved log without player topic");
    ensure!(
        topics[0].eq_ignore_ascii_case(SLICE_MOVED_TOPIC),
        "not a SliceMoved log: {}",
        topics[0]
    );
    let player = words(&topics[1], 1)?;
    let w = words(data, 3)?;
    Ok(SliceMoved {
        player: decode_address(&player[0])?,
        pos: IVec2::new(decode_int8(&w[0])? as i32, decode_int8(&w[1])? as i32),
        size: decode_uint(&w[2], 24)? as u32,
    })
}
