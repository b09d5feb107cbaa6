//! Canonical CBOR encoding of audit headers.
//!
//! RFC 8949 core deterministic encoding:
//! - Map keys sorted by encoded byte comparison
//! - Integers use smallest valid encoding
//! - Definite lengths only
//! - No floats (timestamps are i64 milliseconds)
//!
//! Signatures and hash links are computed over these bytes, so the encoding
//! must never depend on platform or serde configuration.

use std::collections::BTreeMap;

use crate::audit::AuditHeader;

/// Domain separator prepended to every signed audit header.
pub const AUDIT_SIGNING_CONTEXT: &[u8] = b"vaultgate-audit-v1";

/// Header field keys. Keys 0-23 encode as a single byte.
mod keys {
    pub const SEQ: u64 = 0;
    pub const TIMESTAMP: u64 = 1;
    pub const ACTION: u64 = 2;
    pub const CONTENT_ID: u64 = 3;
    pub const PRINCIPAL_ID: u64 = 4;
    pub const METADATA: u64 = 5;
    pub const PREV_HASH: u64 = 6;
}

const NULL: u8 = 0xf6;

/// Encode an audit header to canonical CBOR bytes.
pub fn canonical_header_bytes(header: &AuditHeader) -> Vec<u8> {
    let mut buf = Vec::with_capacity(128);
    // 7 entries, integer keys already in ascending order
    encode_uint(&mut buf, 5, 7);

    encode_uint(&mut buf, 0, keys::SEQ);
    encode_uint(&mut buf, 0, header.seq);

    encode_uint(&mut buf, 0, keys::TIMESTAMP);
    encode_int(&mut buf, header.timestamp);

    encode_uint(&mut buf, 0, keys::ACTION);
    encode_uint(&mut buf, 0, u64::from(header.action.to_u16()));

    encode_uint(&mut buf, 0, keys::CONTENT_ID);
    encode_text(&mut buf, header.content_id.as_str());

    encode_uint(&mut buf, 0, keys::PRINCIPAL_ID);
    match &header.principal_id {
        Some(p) => encode_text(&mut buf, p.as_str()),
        None => buf.push(NULL),
    }

    encode_uint(&mut buf, 0, keys::METADATA);
    encode_text_map(&mut buf, &header.metadata);

    encode_uint(&mut buf, 0, keys::PREV_HASH);
    match &header.prev_hash {
        Some(h) => encode_bytes(&mut buf, h.as_bytes()),
        None => buf.push(NULL),
    }

    buf
}

/// The bytes the audit signing key signs: context || canonical header.
pub fn signed_message(header: &AuditHeader) -> Vec<u8> {
    let mut buf = AUDIT_SIGNING_CONTEXT.to_vec();
    buf.extend_from_slice(&canonical_header_bytes(header));
    buf
}

/// Encode a signed integer (major types 0 and 1).
fn encode_int(buf: &mut Vec<u8>, n: i64) {
    if n >= 0 {
        encode_uint(buf, 0, n as u64);
    } else {
        // CBOR encodes -1 as 0, -2 as 1, etc.
        encode_uint(buf, 1, (-1 - n) as u64);
    }
}

/// Encode an unsigned integer with the given major type.
fn encode_uint(buf: &mut Vec<u8>, major: u8, n: u64) {
    let mt = major << 5;
    if n < 24 {
        buf.push(mt | (n as u8));
    } else if n <= 0xff {
        buf.push(mt | 24);
        buf.push(n as u8);
    } else if n <= 0xffff {
        buf.push(mt | 25);
        buf.extend_from_slice(&(n as u16).to_be_bytes());
    } else if n <= 0xffff_ffff {
        buf.push(mt | 26);
        buf.extend_from_slice(&(n as u32).to_be_bytes());
    } else {
        buf.push(mt | 27);
        buf.extend_from_slice(&n.to_be_bytes());
    }
}

fn encode_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    encode_uint(buf, 2, bytes.len() as u64);
    buf.extend_from_slice(bytes);
}

fn encode_text(buf: &mut Vec<u8>, s: &str) {
    encode_uint(buf, 3, s.len() as u64);
    buf.extend_from_slice(s.as_bytes());
}

/// Encode a string map with keys sorted by their encoded bytes.
///
/// BTreeMap order is lexicographic by string, which differs from encoded
/// order when keys have different lengths, so sort explicitly.
fn encode_text_map(buf: &mut Vec<u8>, map: &BTreeMap<String, String>) {
    let mut pairs: Vec<(Vec<u8>, &str)> = map
        .iter()
        .map(|(k, v)| {
            let mut key_buf = Vec::with_capacity(k.len() + 1);
            encode_text(&mut key_buf, k);
            (key_buf, v.as_str())
        })
        .collect();
    pairs.sort_by(|a, b| a.0.cmp(&b.0));

    encode_uint(buf, 5, pairs.len() as u64);
    for (key_bytes, value) in pairs {
        buf.extend_from_slice(&key_bytes);
        encode_text(buf, value);
    }
}
