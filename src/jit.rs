//! Loads generated code into executable memory and runs it.

use jitmem::{as_function, ExecutableRegion, WritableRegion};
use log::debug;

use crate::tape::Tape;

/// A program that has been compiled to native code and is ready to run.
///
/// The mapping holding the code is released when this is dropped.
pub struct CompiledProgram {
    code: ExecutableRegion,
    tape_addr: u64,
}

/// The emitted buffer takes no arguments and returns nothing: the tape
/// address is an immediate inside it and I/O goes through syscalls.
type Program = extern "C" fn();

impl CompiledProgram {
    /// Copies the binary into a fresh mapping of exactly its length and
    /// seals it executable.
    pub fn from_binary(binary: &[u8], tape_addr: u64) -> jitmem::Result<CompiledProgram> {
        let mut mem = WritableRegion::allocate(binary.len())?;
        mem[0..binary.len()].copy_from_slice(binary);

        Ok(CompiledProgram {
            code: mem.into_executable()?,
            tape_addr,
        })
    }

    /// Jumps into the generated code. Returns when the program's final
    /// `ret` fires.
    ///
    /// Takes the tape mutably: the emitted code writes to it for the whole
    /// call, through the address that was baked in at compile time. It
    /// must be the same tape this program was compiled against.
    pub fn run(&self, tape: &mut Tape) {
        debug_assert_eq!(self.tape_addr, tape.start_addr());

        debug!("transferring control to {:p}", self.code.addr());
        let program = unsafe { as_function!(self.code, Program) };
        program();
        debug!("control returned from generated code");
    }
}
