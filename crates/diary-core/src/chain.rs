//! Tamper-evident hash chain over the ledger.
//!
//! Each appended record is bound to a BLAKE3 digest
//! `h(n) = BLAKE3(h(n-1) || canonical_bytes(record_n))`, with `h(0)` a
//! fixed seed. The chain is a pure function of insertion order and the
//! canonical encoding, so verification replays the whole ledger and
//! recomputes every link.
//!
//! `synced_at` is the one field that is legally rewritten after
//! creation, so it is excluded from the canonical encoding: marking a
//! batch synced must not invalidate the chain.

use crate::record::DiaryRecord;

/// Digest width in bytes (BLAKE3 output).
pub const DIGEST_LEN: usize = 32;

/// One chain link digest.
pub type ChainDigest = [u8; DIGEST_LEN];

const CHAIN_DOMAIN: &[u8] = b"diary/integrity-chain/v1";

/// `h(0)`: the digest of an empty ledger.
pub fn seed() -> ChainDigest {
    *blake3::hash(CHAIN_DOMAIN).as_bytes()
}

/// Compute the next link from the previous digest and a record.
pub fn next_digest(prev: &ChainDigest, record: &DiaryRecord) -> ChainDigest {
    let mut hasher = blake3::Hasher::new();
    hasher.update(prev);
    hasher.update(&canonical_bytes(record));
    *hasher.finalize().as_bytes()
}

/// Canonical byte encoding of every immutable record field.
///
/// Fixed field order, length-prefixed strings, explicit present/absent
/// tags for optional fields, little-endian integers. Timestamps are
/// encoded as microseconds since the Unix epoch, matching the precision
/// the storage layer persists.
pub fn canonical_bytes(record: &DiaryRecord) -> Vec<u8> {
    let mut buf = Vec::with_capacity(128);

    buf.extend_from_slice(record.id.as_bytes());
    put_str(&mut buf, &record.occurs_on.to_string());
    put_opt_i64(&mut buf, record.start_time.map(|t| t.timestamp_micros()));
    put_opt_str(&mut buf, record.start_zone.as_deref());
    put_opt_i64(&mut buf, record.end_time.map(|t| t.timestamp_micros()));
    put_opt_str(&mut buf, record.end_zone.as_deref());
    put_opt_i64(&mut buf, record.severity.map(|s| s.code()));
    put_opt_str(&mut buf, record.notes.as_deref());
    put_bool(&mut buf, record.is_no_event);
    put_bool(&mut buf, record.is_unknown);
    put_bool(&mut buf, record.is_deleted);
    put_opt_str(&mut buf, record.delete_reason.as_deref());
    put_bool(&mut buf, record.is_incomplete);
    match record.parent_record_id {
        Some(parent) => {
            buf.push(1);
            buf.extend_from_slice(parent.as_bytes());
        }
        None => buf.push(0),
    }
    buf.extend_from_slice(record.device_id.as_bytes());
    buf.extend_from_slice(&record.created_at.timestamp_micros().to_le_bytes());

    buf
}

/// Hex encoding for persisting a digest in the meta table.
pub fn digest_to_hex(digest: &ChainDigest) -> String {
    hex::encode(digest)
}

/// Parse a digest persisted by [`digest_to_hex`].
pub fn digest_from_hex(value: &str) -> Option<ChainDigest> {
    let bytes = hex::decode(value).ok()?;
    bytes.try_into().ok()
}

fn put_str(buf: &mut Vec<u8>, value: &str) {
    buf.extend_from_slice(&(value.len() as u32).to_le_bytes());
    buf.extend_from_slice(value.as_bytes());
}

fn put_opt_str(buf: &mut Vec<u8>, value: Option<&str>) {
    match value {
        Some(s) => {
            buf.push(1);
            put_str(buf, s);
        }
        None => buf.push(0),
    }
}

fn put_opt_i64(buf: &mut Vec<u8>, value: Option<i64>) {
    match value {
        Some(v) => {
            buf.push(1);
            buf.extend_from_slice(&v.to_le_bytes());
        }
        None => buf.push(0),
    }
}

fn put_bool(buf: &mut Vec<u8>, value: bool) {
    buf.push(u8::from(value));
}
