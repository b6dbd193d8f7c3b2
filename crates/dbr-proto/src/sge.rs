//! The scatter-gather (SGE) wire codec.
//!
//! Wire format (ASCII header, binary payload):
//!
//! ```text
//! <total_len>\n<count>\n<len_0>\n<len_1>\n...<len_{n-1}>\n<bytes_0>\n<bytes_1>\n...<bytes_{n-1}>\n\0
//! ```
//!
//! `total_len` is the sum of the element lengths. Every payload region is followed by a bare
//! `\n` (a parse aid, not counted in the element's length). The serialized form is always
//! terminated by a final `\0` byte.

use crate::constants::SGE_MAX;

/// Failure modes of the codec. `EAGAIN` ("need more bytes") is not modeled here — it is a
/// control-flow outcome, not an error, see [`ParseOutcome`]/[`ParseResult`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SgeError {
    #[error("invalid argument")]
    Invalid,
    #[error("malformed message")]
    BadMsg,
    #[error("buffer too small")]
    TooBig,
    #[error("allocation failure")]
    NoMem,
}

/// A single scatter-gather element borrowed out of the buffer it was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sge<'a> {
    base: &'a [u8],
}

impl<'a> Sge<'a> {
    pub fn as_slice(&self) -> &'a [u8] {
        self.base
    }

    pub fn len(&self) -> usize {
        self.base.len()
    }

    pub fn is_empty(&self) -> bool {
        self.base.is_empty()
    }
}

/// The result of a successful [`deserialize`]: the parsed elements plus bookkeeping the caller
/// needs to advance its arena cursors.
#[derive(Debug)]
pub struct SgeList<'a> {
    sges: Vec<Sge<'a>>,
    /// Sum of element lengths, i.e. the header's `total_len` field.
    pub total_len: usize,
    /// Total bytes of `data` consumed by header + payloads + trailing separators.
    pub consumed: usize,
}

impl<'a> SgeList<'a> {
    pub fn as_slice(&self) -> &[Sge<'a>] {
        &self.sges
    }

    pub fn len(&self) -> usize {
        self.sges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sges.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sge<'a>> {
        self.sges.iter()
    }
}

/// Outcome of header parsing: either the header is fully present, or more bytes are required.
/// Re-parsing the same prefix is always safe and deterministic (the operation is idempotent).
enum ParseOutcome {
    NeedMoreBytes,
    Complete { lens: Vec<usize>, header_len: usize, total_len: usize },
}

/// Outcome of [`deserialize`]: either the whole frame is assembled, or more bytes are required.
pub enum ParseResult<'a> {
    NeedMoreBytes,
    Complete(SgeList<'a>),
}

/// Parses one `\n`-terminated decimal integer starting at `*pos`, advancing `*pos` past the
/// separator. Returns `Ok(None)` if no newline is present yet (caller must wait for more bytes).
fn parse_line_number(data: &[u8], pos: &mut usize) -> Result<Option<i64>, SgeError> {
    let rest = &data[*pos..];
    let Some(nl) = rest.iter().position(|&b| b == b'\n') else {
        return Ok(None);
    };
    let line = &rest[..nl];
    let s = std::str::from_utf8(line).map_err(|_| SgeError::BadMsg)?;
    let n: i64 = s.trim().parse().map_err(|_| SgeError::BadMsg)?;
    *pos += nl + 1;
    Ok(Some(n))
}

/// Re-entrant header extraction. Parses from the start of `data` every time: callers retry with
/// a longer prefix after reading more bytes off the wire, and repeated calls on an unchanged
/// prefix return the same outcome.
///
/// Sanity floor: `data.len() >= 4` (minimum well-formed prefix is `"0\n0\n"`), and `total_len >=
/// 4` once parsed.
fn extract_header(data: &[u8]) -> Result<ParseOutcome, SgeError> {
    if data.len() < 4 {
        return Ok(ParseOutcome::NeedMoreBytes);
    }

    let mut pos = 0usize;

    let Some(total_len) = parse_line_number(data, &mut pos)? else {
        return Ok(ParseOutcome::NeedMoreBytes);
    };
    if total_len < 4 {
        return Err(SgeError::BadMsg);
    }

    let Some(count) = parse_line_number(data, &mut pos)? else {
        return Ok(ParseOutcome::NeedMoreBytes);
    };
    if count < 1 || count > SGE_MAX as i64 {
        return Err(SgeError::BadMsg);
    }
    let count = count as usize;

    let mut lens = Vec::with_capacity(count);
    let mut sum: i64 = 0;
    for _ in 0..count {
        let Some(len) = parse_line_number(data, &mut pos)? else {
            return Ok(ParseOutcome::NeedMoreBytes);
        };
        if len < 0 {
            return Err(SgeError::BadMsg);
        }
        sum += len;
        lens.push(len as usize);
    }

    if sum != total_len {
        return Err(SgeError::BadMsg);
    }

    Ok(ParseOutcome::Complete { lens, header_len: pos, total_len: total_len as usize })
}

/// Serializes `sges` into `out`, returning the number of bytes written (excluding the trailing
/// `\0`). Fails with [`SgeError::Invalid`] if `sges` is empty or exceeds [`SGE_MAX`], and
/// [`SgeError::TooBig`] if `out` is exhausted before the terminator.
pub fn serialize(sges: &[&[u8]], out: &mut [u8]) -> Result<usize, SgeError> {
    if sges.is_empty() || sges.len() > SGE_MAX {
        return Err(SgeError::Invalid);
    }

    let total_len: usize = sges.iter().map(|s| s.len()).sum();
    let mut cursor: &mut [u8] = out;
    let mut written = 0usize;

    macro_rules! put_line {
        ($n:expr) => {{
            let line = format!("{}\n", $n);
            if cursor.len() < line.len() {
                return Err(SgeError::TooBig);
            }
            cursor[..line.len()].copy_from_slice(line.as_bytes());
            cursor = &mut cursor[line.len()..];
            written += line.len();
        }};
    }

    put_line!(total_len);
    put_line!(sges.len());
    for s in sges {
        put_line!(s.len());
    }

    for s in sges {
        if cursor.len() < s.len() + 1 {
            return Err(SgeError::TooBig);
        }
        cursor[..s.len()].copy_from_slice(s);
        cursor[s.len()] = b'\n';
        cursor = &mut cursor[s.len() + 1..];
        written += s.len() + 1;
    }

    if cursor.is_empty() {
        return Err(SgeError::TooBig);
    }
    cursor[0] = 0;

    Ok(written)
}

/// Deserializes a frame out of `data` without copying payloads: each returned [`Sge`] borrows
/// directly into `data`, and a `\0` is written one byte past each element's declared length. A
/// complete frame always has that separator byte present (`end < data.len()`); if the header is
/// fully parsed but a payload is still arriving over the wire, `end >= data.len()` and this
/// reports [`ParseResult::NeedMoreBytes`] rather than an error, so a frame split across TCP
/// segments waits for the rest instead of being rejected.
pub fn deserialize(data: &mut [u8]) -> Result<ParseResult<'_>, SgeError> {
    let (lens, header_len, total_len) = match extract_header(data)? {
        ParseOutcome::NeedMoreBytes => return Ok(ParseResult::NeedMoreBytes),
        ParseOutcome::Complete { lens, header_len, total_len } => (lens, header_len, total_len),
    };

    let mut offset = header_len;
    let mut starts = Vec::with_capacity(lens.len());
    for len in lens {
        let end = offset + len;
        if end >= data.len() {
            return Ok(ParseResult::NeedMoreBytes);
        }
        data[end] = 0;
        starts.push((offset, len));
        offset = end + 1;
    }

    let frozen: &[u8] = &*data;
    let sges = starts.into_iter().map(|(s, l)| Sge { base: &frozen[s..s + l] }).collect();

    Ok(ParseResult::Complete(SgeList { sges, total_len, consumed: offset }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(parts: &[&[u8]]) -> Vec<Vec<u8>> {
        let mut buf = vec![0u8; 4096];
        let written = serialize(parts, &mut buf).expect("serialize");
        assert_eq!(buf[written], 0, "terminator byte must be \\0");
        match deserialize(&mut buf[..written + 1]).expect("deserialize") {
            ParseResult::Complete(list) => list.iter().map(|s| s.as_slice().to_vec()).collect(),
            ParseResult::NeedMoreBytes => panic!("expected complete parse"),
        }
    }

    #[test]
    fn sge_round_trip_single_element() {
        let data = b"hello world".as_slice();
        let out = roundtrip(&[data]);
        assert_eq!(out, vec![data.to_vec()]);
    }

    #[test]
    fn sge_round_trip_multi_element() {
        let a: &[u8] = b"first-chunk";
        let b: &[u8] = b"";
        let c: &[u8] = b"third one, longer payload here";
        let out = roundtrip(&[a, b, c]);
        assert_eq!(out, vec![a.to_vec(), b.to_vec(), c.to_vec()]);
    }

    #[test]
    fn serialize_rejects_empty_and_oversized() {
        let mut buf = vec![0u8; 64];
        assert_eq!(serialize(&[], &mut buf), Err(SgeError::Invalid));
        let many: Vec<&[u8]> = vec![b"x".as_slice(); SGE_MAX + 1];
        assert_eq!(serialize(&many, &mut buf), Err(SgeError::Invalid));
    }

    #[test]
    fn serialize_too_small_buffer() {
        let mut buf = vec![0u8; 2];
        assert_eq!(serialize(&[b"abc".as_slice()], &mut buf), Err(SgeError::TooBig));
    }

    #[test]
    fn extract_header_idempotent_on_partial_prefix() {
        let mut full = vec![0u8; 256];
        let written = serialize(&[b"payload-bytes-here".as_slice()], &mut full).unwrap();
        full.truncate(written + 1);

        // Feed the header byte by byte; every incomplete prefix must say NeedMoreBytes, and
        // retrying the same prefix must never change the answer.
        for cut in 0..full.len() {
            let prefix = &mut full[..cut].to_vec();
            let first = matches!(deserialize(prefix), Ok(ParseResult::NeedMoreBytes) | Err(_));
            let second = matches!(deserialize(prefix), Ok(ParseResult::NeedMoreBytes) | Err(_));
            if cut < full.len() - 1 {
                assert_eq!(first, second, "parse outcome changed across retries at cut {cut}");
            }
        }

        match deserialize(&mut full).unwrap() {
            ParseResult::Complete(list) => {
                assert_eq!(list.len(), 1);
                assert_eq!(list.as_slice()[0].as_slice(), b"payload-bytes-here");
            }
            ParseResult::NeedMoreBytes => panic!("full buffer must parse completely"),
        }
    }

    #[test]
    fn extract_header_rejects_bad_count() {
        let mut buf = b"10\n0\n".to_vec();
        buf.extend_from_slice(&[0u8; 16]);
        assert_eq!(deserialize(&mut buf).unwrap_err(), SgeError::BadMsg);
    }

    #[test]
    fn extract_header_needs_more_bytes_on_short_prefix() {
        let mut buf = b"12\n1\n".to_vec();
        assert!(matches!(deserialize(&mut buf), Ok(ParseResult::NeedMoreBytes)));
    }
}
