//! Anonymous memory mappings for code that is generated at runtime.
//!
//! The types here walk a mapping through its lifecycle: a fresh
//! [MappedRegion] is read-only; [WritableRegion] makes it writable so
//! machine code can be copied in; [ExecutableRegion] seals it read+execute.
//! Use [as_function!] to call into a sealed region.
//!
//! Linux-only: the allocation is a private anonymous `mmap(2)` and the
//! protection changes are `mprotect(2)`.

mod error;
mod examples;
mod executable_region;
mod mapped_region;
mod writable_region;

pub use crate::error::{MappingError, Result};
pub use crate::examples::{generate_square_program, write_square_function};
pub use crate::executable_region::ExecutableRegion;
pub use crate::mapped_region::MappedRegion;
pub use crate::writable_region::WritableRegion;

/// Treats the start of an [ExecutableRegion] as a function pointer.
///
/// The cast itself is wildly unsafe: nothing checks that the region holds
/// valid machine code for the given signature.
#[macro_export]
macro_rules! as_function {
    ($region: expr, $fn_type: ty) => {
        std::mem::transmute::<*const u8, $fn_type>($region.addr())
    };
}

#[cfg(all(test, target_arch = "x86_64"))]
mod tests {
    use super::*;

    #[test]
    fn run_code_from_an_executable_region() {
        let region = generate_square_program();
        let square = unsafe { as_function!(region, extern "C" fn(u64) -> u64) };

        assert_eq!(16, square(4));
        assert_eq!(144, square(12));
    }

    #[test]
    fn regions_are_zero_filled() {
        let w = WritableRegion::allocate(64).unwrap();
        assert!(w[0..64].iter().all(|&b| b == 0));
    }

    #[test]
    fn allocation_of_nothing_fails() {
        assert!(MappedRegion::allocate(0).is_err());
    }
}
