use std::borrow::Borrow;
use std::ops::{Drop, Index};
use std::ptr;

use errno::errno;
use libc::{c_void, size_t};
use log::trace;

/// A private, anonymous mapping obtained from `mmap(2)`.
///
/// Freshly allocated regions are read-only; convert to a
/// [crate::WritableRegion] to put anything in them. The mapping is
/// released when the region is dropped.
pub struct MappedRegion {
    addr: *mut c_void,
    len: size_t,
}

impl MappedRegion {
    /// Maps `size` bytes of zeroed memory, not backed by any file.
    pub fn allocate(size: usize) -> crate::Result<Self> {
        use libc::{MAP_ANONYMOUS, MAP_FAILED, MAP_PRIVATE, PROT_READ};

        let memory = unsafe {
            libc::mmap(
                ptr::null_mut(),
                size,
                PROT_READ,
                MAP_PRIVATE | MAP_ANONYMOUS,
                -1,
                0,
            )
        };

        if memory == MAP_FAILED {
            return Err(errno().into());
        }

        trace!("mapped {} bytes at {:p}", size, memory);

        Ok(MappedRegion {
            addr: memory,
            len: size,
        })
    }

    pub fn addr(&self) -> *const u8 {
        self.addr as *const u8
    }

    pub(crate) fn addr_mut(&self) -> *mut c_void {
        self.addr
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl<I> Index<I> for MappedRegion
where
    I: std::slice::SliceIndex<[u8]>,
{
    type Output = I::Output;

    fn index(&self, index: I) -> &Self::Output {
        unsafe { &std::slice::from_raw_parts(self.addr as *const u8, self.len)[index] }
    }
}

impl Borrow<[u8]> for MappedRegion {
    fn borrow(&self) -> &[u8] {
        &self[..]
    }
}

impl Drop for MappedRegion {
    fn drop(&mut self) {
        trace!("unmapping {} bytes at {:p}", self.len, self.addr);
        unsafe {
            libc::munmap(self.addr, self.len);
        }
        self.addr = ptr::null_mut();
        self.len = 0;
    }
}
