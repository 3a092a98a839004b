//! Binary encoding of migrating particles.
//!
//! All integers are little-endian. A message is a fixed header followed
//! by `count` records:
//!
//! ```text
//! u32 count | u16 reals | u16 ints | u64 fingerprint | count × (reals × f64, ints × i64)
//! ```
//!
//! Values appear in field registration order, so sender and receiver must
//! have registered the same fields in the same order. The fingerprint is an
//! FNV-1a hash of every label and kind in that order; a receiver whose
//! fields differ rejects the message instead of writing values into the
//! wrong columns. No compression, no padding, no labels on the wire.

use std::io::Read;

use flock_core::{FieldDef, FieldKind, Real};
use flock_pool::ParticlePool;

use crate::error::MigrationError;

/// Header size in bytes.
pub const HEADER_LEN: usize = 16;

/// FNV-1a offset basis for 64-bit.
const FNV_OFFSET: u64 = 0xcbf29ce484222325;
/// FNV-1a prime for 64-bit.
const FNV_PRIME: u64 = 0x00000100000001B3;

#[inline]
fn fnv1a(hash: u64, bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(hash, |h, &b| (h ^ b as u64).wrapping_mul(FNV_PRIME))
}

/// Column counts and field fingerprint shared by every record of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RecordSchema {
    /// Number of real-valued fields per record.
    pub reals: u16,
    /// Number of integer fields per record.
    pub ints: u16,
    /// Hash of field labels and kinds in registration order.
    pub fingerprint: u64,
}

impl RecordSchema {
    /// Schema of `fields`, in the order given.
    pub fn from_fields<'a>(
        fields: impl IntoIterator<Item = &'a FieldDef>,
    ) -> Result<Self, MigrationError> {
        let (mut reals, mut ints) = (0usize, 0usize);
        let mut fingerprint = FNV_OFFSET;
        for def in fields {
            let tag = match def.kind {
                FieldKind::Real => {
                    reals += 1;
                    0u8
                }
                FieldKind::Int => {
                    ints += 1;
                    1u8
                }
            };
            fingerprint = fnv1a(fingerprint, &(def.label.len() as u64).to_le_bytes());
            fingerprint = fnv1a(fingerprint, def.label.as_bytes());
            fingerprint = fnv1a(fingerprint, &[tag]);
        }
        let narrow = |n: usize, kind: FieldKind| {
            u16::try_from(n).map_err(|_| MigrationError::Codec {
                detail: format!("more than {} {kind:?} fields", u16::MAX),
            })
        };
        Ok(Self {
            reals: narrow(reals, FieldKind::Real)?,
            ints: narrow(ints, FieldKind::Int)?,
            fingerprint,
        })
    }

    /// Schema of every field registered in `pool`.
    pub fn of(pool: &ParticlePool) -> Result<Self, MigrationError> {
        let defs: Vec<FieldDef> = pool.field_defs().collect();
        Self::from_fields(&defs)
    }

    /// Bytes per record.
    pub fn record_len(&self) -> usize {
        self.reals as usize * FieldKind::Real.wire_size()
            + self.ints as usize * FieldKind::Int.wire_size()
    }
}

/// Accumulates records into one message.
pub struct RecordEncoder {
    schema: RecordSchema,
    count: u32,
    buf: Vec<u8>,
}

impl RecordEncoder {
    /// Start an empty message.
    pub fn new(schema: RecordSchema) -> Self {
        let mut buf = Vec::with_capacity(HEADER_LEN);
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf.extend_from_slice(&schema.reals.to_le_bytes());
        buf.extend_from_slice(&schema.ints.to_le_bytes());
        buf.extend_from_slice(&schema.fingerprint.to_le_bytes());
        Self {
            schema,
            count: 0,
            buf,
        }
    }

    /// Number of records written so far.
    pub fn len(&self) -> usize {
        self.count as usize
    }

    /// Whether no records have been written.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Append one record.
    pub fn push(&mut self, reals: &[Real], ints: &[i64]) -> Result<(), MigrationError> {
        if reals.len() != self.schema.reals as usize || ints.len() != self.schema.ints as usize {
            return Err(MigrationError::Codec {
                detail: format!(
                    "record has {}/{} values, schema expects {}/{}",
                    reals.len(),
                    ints.len(),
                    self.schema.reals,
                    self.schema.ints
                ),
            });
        }
        self.count = self.count.checked_add(1).ok_or_else(|| MigrationError::Codec {
            detail: "more than u32::MAX records in one message".into(),
        })?;
        self.buf.reserve(self.schema.record_len());
        for v in reals {
            self.buf.extend_from_slice(&v.to_le_bytes());
        }
        for v in ints {
            self.buf.extend_from_slice(&v.to_le_bytes());
        }
        Ok(())
    }

    /// Finish the message, patching in the record count.
    pub fn finish(mut self) -> Vec<u8> {
        self.buf[..4].copy_from_slice(&self.count.to_le_bytes());
        self.buf
    }
}

/// A decoded message: flat value arrays plus the schema to slice them.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordBatch {
    schema: RecordSchema,
    reals: Vec<Real>,
    ints: Vec<i64>,
}

impl RecordBatch {
    /// Number of records.
    pub fn len(&self) -> usize {
        match (self.schema.reals, self.schema.ints) {
            (0, 0) => 0,
            (0, n) => self.ints.len() / n as usize,
            (n, _) => self.reals.len() / n as usize,
        }
    }

    /// Whether the batch holds no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Schema the batch was encoded with.
    pub fn schema(&self) -> RecordSchema {
        self.schema
    }

    /// Real and integer values of record `i`.
    pub fn record(&self, i: usize) -> (&[Real], &[i64]) {
        let (r, n) = (self.schema.reals as usize, self.schema.ints as usize);
        (&self.reals[i * r..(i + 1) * r], &self.ints[i * n..(i + 1) * n])
    }
}

fn malformed(detail: impl Into<String>) -> MigrationError {
    MigrationError::Codec {
        detail: detail.into(),
    }
}

fn read_array<const N: usize>(r: &mut &[u8]) -> Result<[u8; N], MigrationError> {
    let mut buf = [0u8; N];
    r.read_exact(&mut buf)
        .map_err(|e| malformed(format!("truncated message: {e}")))?;
    Ok(buf)
}

/// Decode a message, checking it against the receiver's `expected` schema.
///
/// A schema mismatch, truncation, or trailing bytes are all errors.
/// Schemas with no fields carry no records.
pub fn decode(bytes: &[u8], expected: RecordSchema) -> Result<RecordBatch, MigrationError> {
    let mut r = bytes;
    let count = u32::from_le_bytes(read_array(&mut r)?) as usize;
    let schema = RecordSchema {
        reals: u16::from_le_bytes(read_array(&mut r)?),
        ints: u16::from_le_bytes(read_array(&mut r)?),
        fingerprint: u64::from_le_bytes(read_array(&mut r)?),
    };
    if (schema.reals, schema.ints) != (expected.reals, expected.ints) {
        return Err(malformed(format!(
            "schema mismatch: message has {}/{} fields, receiver has {}/{}",
            schema.reals, schema.ints, expected.reals, expected.ints
        )));
    }
    if schema.fingerprint != expected.fingerprint {
        return Err(malformed(format!(
            "field fingerprint mismatch: message {:#018x}, receiver {:#018x}",
            schema.fingerprint, expected.fingerprint
        )));
    }
    let body = count
        .checked_mul(schema.record_len())
        .ok_or_else(|| malformed("record count overflows"))?;
    if r.len() != body {
        return Err(malformed(format!(
            "expected {body} body bytes for {count} records, found {}",
            r.len()
        )));
    }

    let mut reals = Vec::with_capacity(count * schema.reals as usize);
    let mut ints = Vec::with_capacity(count * schema.ints as usize);
    for _ in 0..count {
        for _ in 0..schema.reals {
            reals.push(f64::from_le_bytes(read_array(&mut r)?));
        }
        for _ in 0..schema.ints {
            ints.push(i64::from_le_bytes(read_array(&mut r)?));
        }
    }
    Ok(RecordBatch {
        schema,
        reals,
        ints,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> RecordSchema {
        RecordSchema::from_fields(&[
            FieldDef::real("x"),
            FieldDef::real("y"),
            FieldDef::real("z"),
            FieldDef::int("id"),
        ])
        .unwrap()
    }

    #[test]
    fn header_layout_is_little_endian() {
        let mut enc = RecordEncoder::new(schema());
        enc.push(&[1.0, 2.0, 3.0], &[-7]).unwrap();
        let bytes = enc.finish();
        assert_eq!(&bytes[..8], &[1, 0, 0, 0, 3, 0, 1, 0]);
        assert_eq!(&bytes[8..HEADER_LEN], &schema().fingerprint.to_le_bytes());
        assert_eq!(bytes.len(), HEADER_LEN + 32);
        assert_eq!(&bytes[16..24], &1.0f64.to_le_bytes());
        assert_eq!(&bytes[40..48], &(-7i64).to_le_bytes());
    }

    #[test]
    fn records_decode_in_order() {
        let mut enc = RecordEncoder::new(schema());
        enc.push(&[0.1, 0.2, 0.3], &[10]).unwrap();
        enc.push(&[0.4, 0.5, 0.6], &[i64::MIN]).unwrap();
        assert_eq!(enc.len(), 2);
        let batch = decode(&enc.finish(), schema()).unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch.record(1), (&[0.4, 0.5, 0.6][..], &[i64::MIN][..]));
    }

    #[test]
    fn empty_message_decodes() {
        let enc = RecordEncoder::new(schema());
        assert!(enc.is_empty());
        let batch = decode(&enc.finish(), schema()).unwrap();
        assert!(batch.is_empty());
    }

    #[test]
    fn wrong_record_width_rejected_on_push() {
        let mut enc = RecordEncoder::new(schema());
        assert!(enc.push(&[1.0], &[1]).is_err());
        assert!(enc.is_empty());
    }

    #[test]
    fn schema_mismatch_rejected() {
        let bytes = RecordEncoder::new(schema()).finish();
        let fewer = RecordSchema::from_fields(&[
            FieldDef::real("x"),
            FieldDef::real("y"),
            FieldDef::real("z"),
        ])
        .unwrap();
        let err = decode(&bytes, fewer).unwrap_err();
        assert!(matches!(err, MigrationError::Codec { .. }));
    }

    #[test]
    fn same_kinds_with_different_labels_rejected() {
        let mut enc = RecordEncoder::new(schema());
        enc.push(&[1.0, 2.0, 3.0], &[4]).unwrap();
        let bytes = enc.finish();

        let relabelled = RecordSchema::from_fields(&[
            FieldDef::real("x"),
            FieldDef::real("y"),
            FieldDef::real("z"),
            FieldDef::int("tag"),
        ])
        .unwrap();
        assert_eq!((relabelled.reals, relabelled.ints), (3, 1));
        let err = decode(&bytes, relabelled).unwrap_err();
        assert!(matches!(err, MigrationError::Codec { ref detail } if detail.contains("fingerprint")));
    }

    #[test]
    fn fingerprint_depends_on_registration_order() {
        let a = RecordSchema::from_fields(&[FieldDef::real("u"), FieldDef::real("v")]).unwrap();
        let b = RecordSchema::from_fields(&[FieldDef::real("v"), FieldDef::real("u")]).unwrap();
        let c = RecordSchema::from_fields(&[FieldDef::real("u"), FieldDef::real("v")]).unwrap();
        assert_ne!(a.fingerprint, b.fingerprint);
        assert_eq!(a, c);
    }

    #[test]
    fn truncated_and_trailing_bytes_rejected() {
        let mut enc = RecordEncoder::new(schema());
        enc.push(&[1.0, 2.0, 3.0], &[4]).unwrap();
        let bytes = enc.finish();

        assert!(decode(&bytes[..bytes.len() - 1], schema()).is_err());
        assert!(decode(&bytes[..5], schema()).is_err());

        let mut long = bytes.clone();
        long.push(0);
        assert!(decode(&long, schema()).is_err());
    }
}
