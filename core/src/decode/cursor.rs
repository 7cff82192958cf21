use crate::errors::{Error, Result};

/// Forward-only reader over a method body.
pub struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Cursor { bytes, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let b = *self
            .bytes
            .get(self.pos)
            .ok_or_else(|| Error::decode(self.pos, None, "unexpected end of stream"))?;
        self.pos += 1;
        Ok(b)
    }

    /// Reads one packed integer.
    ///
    /// Small values take a single byte; `100xxxxx` starts a 13-bit value
    /// spread over two bytes; `101nnnnn` is followed by `n + 1` big-endian
    /// bytes of a sign-extended value.
    pub fn read_packed(&mut self) -> Result<i64> {
        let start = self.pos;
        let b = self.read_u8()?;
        if b & 0xC0 != 0x80 {
            return Ok(b as i8 as i64);
        }
        if b & 0xE0 == 0x80 {
            let lo = self.read_u8()? as i32;
            let hi = (((b as u32) << 27) as i32) >> 19;
            return Ok((hi | lo) as i64);
        }
        let count = 1 + (b & 0x1F) as usize;
        if !(2..=8).contains(&count) {
            return Err(Error::decode(
                start,
                None,
                format!("unsupported packed integer of {} bytes", count),
            ));
        }
        let mut value = self.read_u8()? as i8 as i64;
        for _ in 1..count {
            value = (value << 8) | self.read_u8()? as i64;
        }
        Ok(value)
    }

    /// A packed integer that must be a non-negative count or index.
    pub fn read_magnitude(&mut self) -> Result<u32> {
        let start = self.pos;
        let value = self.read_packed()?;
        u32::try_from(value)
            .map_err(|_| Error::decode(start, None, format!("expected a magnitude, found {}", value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::writer::Writer;

    #[test]
    fn test_packed_forms() {
        let mut w = Writer::new();
        w.packed(-1).packed(200).packed(-4096).packed(70_000).packed(i64::MIN);
        let bytes = w.finish();
        assert_eq!(&bytes[..3], &[0xFF, 0x80, 0xC8]);

        let mut cur = Cursor::new(&bytes);
        assert_eq!(cur.read_packed().unwrap(), -1);
        assert_eq!(cur.read_packed().unwrap(), 200);
        assert_eq!(cur.read_packed().unwrap(), -4096);
        assert_eq!(cur.read_packed().unwrap(), 70_000);
        assert_eq!(cur.read_packed().unwrap(), i64::MIN);
        assert!(cur.at_end());
    }

    #[test]
    fn test_truncated_stream() {
        let mut cur = Cursor::new(&[0xA1, 0x01]);
        let err = cur.read_packed().unwrap_err();
        assert!(matches!(err, Error::Decode { offset: 2, .. }), "{err}");
    }

    #[test]
    fn test_negative_magnitude_is_rejected() {
        let mut cur = Cursor::new(&[0x7F, 0xFE]);
        assert_eq!(cur.read_magnitude().unwrap(), 127);
        assert!(cur.read_magnitude().is_err());
    }
}
