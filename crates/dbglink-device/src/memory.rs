use crate::error::{DeviceError, Result};

/// Device memory as seen by the `sendfile`/`getfile` directives.
pub trait MemoryAccess: Send {
    /// Store `data` starting at `address`.
    fn write(&mut self, address: u32, data: &[u8]) -> Result<()>;

    /// Copy `len` bytes starting at `address`.
    fn read(&self, address: u32, len: usize) -> Result<Vec<u8>>;
}

/// A contiguous RAM region at a fixed base address.
#[derive(Debug, Clone)]
pub struct RamWindow {
    base: u32,
    bytes: Vec<u8>,
}

impl RamWindow {
    /// A zero-filled window of `size` bytes at `base`.
    pub fn new(base: u32, size: usize) -> Self {
        Self {
            base,
            bytes: vec![0; size],
        }
    }

    pub fn base(&self) -> u32 {
        self.base
    }

    /// Whole window contents.
    pub fn contents(&self) -> &[u8] {
        &self.bytes
    }

    fn range(&self, address: u32, len: usize) -> Result<std::ops::Range<usize>> {
        let out_of_range = || DeviceError::OutOfRange { address, len };
        let start = address
            .checked_sub(self.base)
            .ok_or_else(out_of_range)? as usize;
        let end = start.checked_add(len).ok_or_else(out_of_range)?;
        if end > self.bytes.len() {
            return Err(out_of_range());
        }
        Ok(start..end)
    }
}

impl MemoryAccess for RamWindow {
    fn write(&mut self, address: u32, data: &[u8]) -> Result<()> {
        let range = self.range(address, data.len())?;
        self.bytes[range].copy_from_slice(data);
        Ok(())
    }

    fn read(&self, address: u32, len: usize) -> Result<Vec<u8>> {
        let range = self.range(address, len)?;
        Ok(self.bytes[range].to_vec())
    }
}
