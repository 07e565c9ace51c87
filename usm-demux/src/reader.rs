use crate::{Error, Result};

/// Big-endian cursor over an in-memory byte slice.
///
/// Every read is bounds checked and reports a [`Error::TruncatedTable`]
/// naming the field that could not be read.
#[derive(Clone, Debug)]
pub struct Reader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    pub fn get_position(&self) -> u64 {
        self.position as u64
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// Borrow the next `len` bytes and advance past them.
    pub fn take(&mut self, len: usize, context: &'static str) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(Error::table_truncated(
                context,
                self.get_position(),
                len as u64,
                self.remaining() as u64,
            ));
        }

        let bytes = &self.data[self.position..self.position + len];
        self.position += len;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self, context: &'static str) -> Result<[u8; N]> {
        let mut buf = [0; N];
        buf.copy_from_slice(self.take(N, context)?);
        Ok(buf)
    }

    pub fn read_u8(&mut self, context: &'static str) -> Result<u8> {
        Ok(self.read_array::<1>(context)?[0])
    }

    pub fn read_i8(&mut self, context: &'static str) -> Result<i8> {
        Ok(i8::from_be_bytes(self.read_array(context)?))
    }

    pub fn read_u16(&mut self, context: &'static str) -> Result<u16> {
        Ok(u16::from_be_bytes(self.read_array(context)?))
    }

    pub fn read_i16(&mut self, context: &'static str) -> Result<i16> {
        Ok(i16::from_be_bytes(self.read_array(context)?))
    }

    pub fn read_u32(&mut self, context: &'static str) -> Result<u32> {
        Ok(u32::from_be_bytes(self.read_array(context)?))
    }

    pub fn read_i32(&mut self, context: &'static str) -> Result<i32> {
        Ok(i32::from_be_bytes(self.read_array(context)?))
    }

    pub fn read_u64(&mut self, context: &'static str) -> Result<u64> {
        Ok(u64::from_be_bytes(self.read_array(context)?))
    }

    pub fn read_i64(&mut self, context: &'static str) -> Result<i64> {
        Ok(i64::from_be_bytes(self.read_array(context)?))
    }

    pub fn read_f32(&mut self, context: &'static str) -> Result<f32> {
        Ok(f32::from_be_bytes(self.read_array(context)?))
    }
}

/// Slice `data` from `start` up to (not including) the next NUL byte, or to the end.
///
/// Returns `None` when `start` does not point inside `data`.
pub(crate) fn slice_until_nul(data: &[u8], start: usize) -> Option<&[u8]> {
    if start >= data.len() {
        return None;
    }

    let tail = &data[start..];
    let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
    Some(&tail[..end])
}
