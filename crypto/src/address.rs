//! Address codec for predicate references.
//!
//! Address format: `tok_` + base32(reference, 52 chars) + base32(checksum, 8 chars)
//!
//! The reference is the 32-byte hash of a predicate (see `tokenchain_chain::Predicate`).
//! Checksum: first 5 bytes of Blake2b-256(reference).
//! Base32 alphabet: `13456789abcdefghijkmnopqrstuwxyz` (avoids ambiguous chars).

use tokenchain_types::Address;

const BASE32_ALPHABET: &[u8; 32] = b"13456789abcdefghijkmnopqrstuwxyz";

/// Reverse lookup table: ASCII byte to 5-bit value (0xFF = invalid).
const BASE32_DECODE: [u8; 128] = {
    let mut table = [0xFFu8; 128];
    let mut i = 0;
    while i < 32 {
        table[BASE32_ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table
};

/// 256 bits of reference -> ceil(256/5) = 52 characters.
const REFERENCE_CHARS: usize = 52;
/// 40 bits of checksum -> 8 characters.
const CHECKSUM_CHARS: usize = 8;

fn encode_base32(bytes: &[u8]) -> String {
    let mut result = String::with_capacity((bytes.len() * 8).div_ceil(5));
    let mut buffer: u64 = 0;
    let mut bits = 0;

    for &byte in bytes {
        buffer = (buffer << 8) | byte as u64;
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            result.push(BASE32_ALPHABET[((buffer >> bits) & 0x1F) as usize] as char);
        }
    }
    if bits > 0 {
        result.push(BASE32_ALPHABET[((buffer << (5 - bits)) & 0x1F) as usize] as char);
    }
    result
}

fn decode_base32_fixed<const N: usize>(s: &str) -> Option<[u8; N]> {
    let mut buffer: u64 = 0;
    let mut bits = 0;
    let mut result = [0u8; N];
    let mut pos = 0;

    for c in s.bytes() {
        let val = *BASE32_DECODE.get(c as usize)?;
        if val == 0xFF {
            return None;
        }
        buffer = (buffer << 5) | val as u64;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            if pos < N {
                result[pos] = (buffer >> bits) as u8;
                pos += 1;
            }
        }
    }

    (pos == N).then_some(result)
}

/// Derive the `tok_` address for a predicate reference.
pub fn derive_address(reference: &[u8; 32]) -> Address {
    let checksum = crate::blake2b_256(reference);
    Address::from_encoded(&format!(
        "{}{}",
        encode_base32(reference),
        encode_base32(&checksum[..5])
    ))
}

/// Extract the predicate reference from an address.
///
/// Returns `None` if the address is malformed or has an invalid checksum.
pub fn decode_address(address: &str) -> Option<[u8; 32]> {
    let encoded = address.strip_prefix(Address::PREFIX)?;
    if encoded.len() != REFERENCE_CHARS + CHECKSUM_CHARS {
        return None;
    }
    let (reference_part, checksum_part) = encoded.split_at(REFERENCE_CHARS);
    let reference: [u8; 32] = decode_base32_fixed(reference_part)?;
    let checksum: [u8; 5] = decode_base32_fixed(checksum_part)?;

    (checksum == crate::blake2b_256(&reference)[..5]).then_some(reference)
}

/// Validate that an address string is well-formed and its checksum is correct.
pub fn validate_address(address: &str) -> bool {
    decode_address(address).is_some()
}
