//! Primitive wire encoding shared by the session state codec.
//!
//! All integers are big-endian. Vectors are prefixed with a 1, 2 or 3 byte
//! length, as in the TLS presentation language.

use std::fmt::Debug;

use crate::TicketError;

/// Wrapper over a slice of bytes that allows reading chunks from
/// with the current position state held using a cursor.
///
/// A new reader for a sub section of the the buffer can be created
/// using the `sub` function or a section of a certain length can
/// be obtained using the `take` function
pub struct Reader<'a> {
    /// The underlying buffer storing the readers content
    buf: &'a [u8],
    /// Stores the current reading position for the buffer
    offs: usize,
}

impl<'a> Reader<'a> {
    /// Creates a new Reader of the provided `bytes` slice with
    /// the initial cursor position of zero.
    pub fn init(bytes: &'a [u8]) -> Self {
        Reader {
            buf: bytes,
            offs: 0,
        }
    }

    /// Attempts to create a new Reader on a sub section of this
    /// readers bytes by taking a slice of the provided `length`
    /// will return None if there is not enough bytes
    pub fn sub(&mut self, length: usize) -> Option<Reader<'a>> {
        self.take(length).map(Reader::init)
    }

    /// Borrows a slice of all the remaining bytes
    /// that appear after the cursor position.
    ///
    /// Moves the cursor to the end of the buffer length.
    pub fn rest(&mut self) -> &'a [u8] {
        let rest = &self.buf[self.offs..];
        self.offs = self.buf.len();
        rest
    }

    /// Attempts to borrow a slice of bytes from the current
    /// cursor position of `length` if there is not enough
    /// bytes remaining after the cursor to take the length
    /// then None is returned instead.
    pub fn take(&mut self, length: usize) -> Option<&'a [u8]> {
        if self.left() < length {
            return None;
        }
        let current = self.offs;
        self.offs += length;
        Some(&self.buf[current..current + length])
    }

    /// Used to check whether the reader has any content left
    /// after the cursor (cursor has not reached end of buffer)
    pub fn any_left(&self) -> bool {
        self.offs < self.buf.len()
    }

    /// Returns the cursor position which is also the number
    /// of bytes that have been read from the buffer.
    pub fn used(&self) -> usize {
        self.offs
    }

    /// Returns the number of bytes that are still able to be
    /// read (The number of remaining takes)
    pub fn left(&self) -> usize {
        self.buf.len() - self.offs
    }
}

/// Trait for implementing encoding and decoding functionality
/// on something.
pub trait Codec: Debug + Sized {
    /// Function for encoding itself by appending itself to
    /// the provided vec of bytes.
    fn encode(&self, bytes: &mut Vec<u8>);

    /// Function for decoding itself from the provided reader
    /// will return Some if the decoding was successful or
    /// None if it was not.
    fn read(r: &mut Reader) -> Option<Self>;
}

impl Codec for u8 {
    fn encode(&self, bytes: &mut Vec<u8>) {
        bytes.push(*self);
    }

    fn read(r: &mut Reader) -> Option<Self> {
        r.take(1).map(|b| b[0])
    }
}

impl Codec for u16 {
    fn encode(&self, bytes: &mut Vec<u8>) {
        bytes.extend_from_slice(&self.to_be_bytes());
    }

    fn read(r: &mut Reader) -> Option<Self> {
        r.take(2)
            .and_then(|b| b.try_into().ok())
            .map(u16::from_be_bytes)
    }
}

/// A 24-bit unsigned integer, as used by TLS vector lengths.
#[allow(non_camel_case_types)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct u24(pub u32);

impl u24 {
    /// The largest value representable in 24 bits.
    pub const MAX: usize = 0xff_ffff;
}

impl From<u24> for usize {
    #[inline]
    fn from(v: u24) -> Self {
        v.0 as Self
    }
}

impl Codec for u24 {
    fn encode(&self, bytes: &mut Vec<u8>) {
        let be = self.0.to_be_bytes();
        bytes.extend_from_slice(&be[1..]);
    }

    fn read(r: &mut Reader) -> Option<Self> {
        r.take(3)
            .map(|b| Self(u32::from_be_bytes([0, b[0], b[1], b[2]])))
    }
}

impl Codec for u32 {
    fn encode(&self, bytes: &mut Vec<u8>) {
        bytes.extend_from_slice(&self.to_be_bytes());
    }

    fn read(r: &mut Reader) -> Option<Self> {
        r.take(4)
            .and_then(|b| b.try_into().ok())
            .map(u32::from_be_bytes)
    }
}

/// Decodes a big-endian u32 from the start of `bytes`.
pub fn decode_u32(bytes: &[u8]) -> Option<u32> {
    u32::read(&mut Reader::init(bytes))
}

impl Codec for u64 {
    fn encode(&self, bytes: &mut Vec<u8>) {
        bytes.extend_from_slice(&self.to_be_bytes());
    }

    fn read(r: &mut Reader) -> Option<Self> {
        r.take(8)
            .and_then(|b| b.try_into().ok())
            .map(u64::from_be_bytes)
    }
}

/// The width of a vector length prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListLength {
    /// One byte, vectors up to 255 bytes.
    U8,
    /// Two bytes, vectors up to 65535 bytes.
    U16,
    /// Three bytes, vectors up to 2^24-1 bytes.
    U24,
}

impl ListLength {
    fn width(self) -> usize {
        match self {
            ListLength::U8 => 1,
            ListLength::U16 => 2,
            ListLength::U24 => 3,
        }
    }

    fn max(self) -> usize {
        match self {
            ListLength::U8 => 0xff,
            ListLength::U16 => 0xffff,
            ListLength::U24 => u24::MAX,
        }
    }

    fn read(self, r: &mut Reader) -> Option<usize> {
        match self {
            ListLength::U8 => u8::read(r).map(usize::from),
            ListLength::U16 => u16::read(r).map(usize::from),
            ListLength::U24 => u24::read(r).map(usize::from),
        }
    }
}

/// Appends a length-prefixed vector whose body is written by `body`.
///
/// The prefix is reserved up front and filled in once the body is known;
/// a body that does not fit the prefix width is an encode error.
pub fn encode_prefixed<F>(
    len: ListLength,
    bytes: &mut Vec<u8>,
    body: F,
) -> Result<(), TicketError>
where
    F: FnOnce(&mut Vec<u8>) -> Result<(), TicketError>,
{
    let len_offset = bytes.len();
    bytes.resize(len_offset + len.width(), 0);

    body(bytes)?;

    let body_len = bytes.len() - len_offset - len.width();
    if body_len > len.max() {
        return Err(TicketError::encode(format!(
            "vector of {} bytes exceeds {:?} length prefix",
            body_len, len
        )));
    }

    let be = (body_len as u32).to_be_bytes();
    bytes[len_offset..len_offset + len.width()].copy_from_slice(&be[4 - len.width()..]);

    Ok(())
}

/// Appends `data` prefixed with its length.
pub fn encode_bytes(
    len: ListLength,
    bytes: &mut Vec<u8>,
    data: &[u8],
) -> Result<(), TicketError> {
    encode_prefixed(len, bytes, |bytes| {
        bytes.extend_from_slice(data);
        Ok(())
    })
}

/// Reads a length prefix and returns a reader over the vector body.
pub fn read_prefixed<'a>(len: ListLength, r: &mut Reader<'a>) -> Option<Reader<'a>> {
    let body_len = len.read(r)?;
    r.sub(body_len)
}

/// Reads a length-prefixed vector and returns its body.
pub fn read_bytes<'a>(len: ListLength, r: &mut Reader<'a>) -> Option<&'a [u8]> {
    let body_len = len.read(r)?;
    r.take(body_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u24_roundtrip() {
        let mut buf = Vec::new();
        u24(0x01_02_03).encode(&mut buf);
        assert_eq!(buf, [1, 2, 3]);
        assert_eq!(u24::read(&mut Reader::init(&buf)), Some(u24(0x01_02_03)));
    }

    #[test]
    fn test_reader_underflow() {
        let mut r = Reader::init(&[0, 1, 2]);
        assert_eq!(u16::read(&mut r), Some(1));
        assert!(u16::read(&mut r).is_none());
        assert_eq!(r.left(), 1);
        assert_eq!(r.rest(), &[2]);
        assert!(!r.any_left());
    }

    #[test]
    fn test_encode_prefixed_fills_length() {
        let mut buf = vec![0xaa];
        encode_prefixed(ListLength::U24, &mut buf, |buf| {
            encode_bytes(ListLength::U8, buf, b"abc")?;
            encode_bytes(ListLength::U16, buf, b"de")
        })
        .unwrap();

        assert_eq!(buf, [0xaa, 0, 0, 8, 3, b'a', b'b', b'c', 0, 2, b'd', b'e']);

        let mut r = Reader::init(&buf[1..]);
        let mut body = read_prefixed(ListLength::U24, &mut r).unwrap();
        assert_eq!(read_bytes(ListLength::U8, &mut body), Some(&b"abc"[..]));
        assert_eq!(read_bytes(ListLength::U16, &mut body), Some(&b"de"[..]));
        assert!(!body.any_left());
    }

    #[test]
    fn test_encode_prefixed_overflow() {
        let mut buf = Vec::new();
        let err = encode_bytes(ListLength::U8, &mut buf, &[0u8; 256]).unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Encode);
    }

    #[test]
    fn test_read_prefixed_truncated() {
        let mut r = Reader::init(&[0, 0, 5, 1, 2]);
        assert!(read_prefixed(ListLength::U24, &mut r).is_none());
    }
}
