use arch::ADDRESS_SPACE_SIZE;

use crate::error::Error;

/// What a written address holds, kept for the symbol and dump exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataKind {
    #[default]
    None,
    Instruction,
    Char,
    Int,
}

/// The fixed 8 KiB output image plus per-address bookkeeping: a "written"
/// bit and a content kind for every address. No address may be written
/// twice.
#[derive(Debug)]
pub struct MemoryImage {
    bytes: Vec<u8>,
    written: Vec<bool>,
    kinds: Vec<DataKind>,
}

impl MemoryImage {
    pub fn new() -> Self {
        Self {
            bytes: vec![0; ADDRESS_SPACE_SIZE],
            written: vec![false; ADDRESS_SPACE_SIZE],
            kinds: vec![DataKind::None; ADDRESS_SPACE_SIZE],
        }
    }

    /// Range- and collision-checks `address`, then marks it written. The
    /// check runs before the final byte value is known, so a later fix-up
    /// patch never retriggers it.
    pub fn claim(&mut self, address: i32, line: usize) -> Result<usize, Error> {
        if address < 0 || address as usize >= ADDRESS_SPACE_SIZE {
            return Err(Error::DeclaringValueOutOfMemoryRange { line });
        }
        let address = address as usize;
        if self.written[address] {
            return Err(Error::MemoryValueOverridden { line });
        }
        self.written[address] = true;
        Ok(address)
    }

    /// Claims `address` and stores a byte there.
    pub fn declare(
        &mut self,
        address: i32,
        value: u8,
        kind: DataKind,
        line: usize,
    ) -> Result<(), Error> {
        let address = self.claim(address, line)?;
        self.kinds[address] = kind;
        self.bytes[address] = value;
        Ok(())
    }

    /// Stores a byte at an already claimed address.
    pub fn store(&mut self, address: usize, value: u8) {
        self.bytes[address] = value;
    }

    /// OR-patches an already claimed address; the placeholder bits written by
    /// the encoder are zero, so the patch never clobbers the opcode.
    pub fn patch(&mut self, address: usize, value: u8) {
        self.bytes[address] |= value;
    }

    pub fn set_kind(&mut self, address: usize, kind: DataKind) {
        self.kinds[address] = kind;
    }

    pub fn byte(&self, address: usize) -> u8 {
        self.bytes[address]
    }

    pub fn kind(&self, address: usize) -> DataKind {
        self.kinds[address]
    }

    pub fn is_written(&self, address: usize) -> bool {
        self.written[address]
    }

    /// Highest address ever written, if any.
    pub fn highest_written(&self) -> Option<usize> {
        self.written.iter().rposition(|&written| written)
    }

    /// The image truncated past the last written address; `None` when nothing
    /// was written (the caller reports the empty-program condition).
    pub fn binary(&self) -> Option<&[u8]> {
        self.highest_written().map(|top| &self.bytes[..=top])
    }
}

impl Default for MemoryImage {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declare_marks_written_and_stores() {
        let mut image = MemoryImage::new();
        image.declare(3, 0xAB, DataKind::Int, 1).unwrap();
        assert!(image.is_written(3));
        assert!(!image.is_written(2));
        assert_eq!(image.byte(3), 0xAB);
        assert_eq!(image.kind(3), DataKind::Int);
    }

    #[test]
    fn double_write_is_fatal() {
        let mut image = MemoryImage::new();
        image.declare(3, 1, DataKind::Int, 1).unwrap();
        assert!(matches!(
            image.declare(3, 2, DataKind::Int, 2),
            Err(Error::MemoryValueOverridden { line: 2 })
        ));
    }

    #[test]
    fn out_of_range_write_is_fatal() {
        let mut image = MemoryImage::new();
        assert!(matches!(
            image.claim(ADDRESS_SPACE_SIZE as i32, 1),
            Err(Error::DeclaringValueOutOfMemoryRange { line: 1 })
        ));
        assert!(matches!(
            image.claim(-1, 1),
            Err(Error::DeclaringValueOutOfMemoryRange { line: 1 })
        ));
        image.claim(ADDRESS_SPACE_SIZE as i32 - 1, 1).unwrap();
    }

    #[test]
    fn patch_does_not_recheck_collision() {
        let mut image = MemoryImage::new();
        let address = image.claim(0, 1).unwrap();
        image.store(address, 0xA0);
        image.patch(address, 0x02);
        assert_eq!(image.byte(0), 0xA2);
    }

    #[test]
    fn binary_truncates_past_highest_written() {
        let mut image = MemoryImage::new();
        assert_eq!(image.binary(), None);
        image.declare(4, 9, DataKind::Int, 1).unwrap();
        assert_eq!(image.binary(), Some(&[0, 0, 0, 0, 9][..]));
        // A written zero still counts towards the length.
        image.declare(6, 0, DataKind::Int, 1).unwrap();
        assert_eq!(image.highest_written(), Some(6));
        assert_eq!(image.binary().unwrap().len(), 7);
    }
}
