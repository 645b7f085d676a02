//! Generates machine code for a folded program.

use log::debug;

use crate::asm::x86_64::X64Assembly;
use crate::errors::CompilationError;
use crate::folding::{FoldedProgram, Instruction, Kind, MAX_RUN};

// REGISTERS:
//
// rdx                - the data pointer; always the address of the current
//                      cell. Also the count argument of the emitted
//                      syscalls, hence the push/pop around them.
// rax, rdi, rsi      - syscall number and arguments; clobbered freely
// rcx, r11           - clobbered by the syscall instruction itself
//
// The buffer obeys the System V calling convention only at entry and exit:
// no callee-saved register is touched, and a single `ret` hands control
// back. See: https://en.wikipedia.org/wiki/X86_calling_conventions#System_V_AMD64_ABI

/// Takes a folded program and compiles it to executable bytes.
pub struct CodeGenerator {
    asm: X64Assembly,
    patch_stack: Vec<usize>,
}

impl CodeGenerator {
    pub fn new() -> Self {
        CodeGenerator {
            asm: X64Assembly::new(),
            patch_stack: Vec::new(),
        }
    }

    /// Compiles the program against a tape whose cell 0 lives at
    /// `tape_addr`. The address is baked into the buffer as an immediate,
    /// so the result runs against that one tape and no other.
    ///
    /// Fails, producing no buffer at all, when the brackets don't pair up.
    pub fn compile(
        &mut self,
        program: &FoldedProgram,
        tape_addr: u64,
    ) -> Result<&[u8], CompilationError> {
        self.asm.mov_dp_imm64(tape_addr);

        for &instr in program.instructions() {
            self.generate_instruction(instr)?;
        }

        if !self.patch_stack.is_empty() {
            return Err(CompilationError::NotEnoughCloseBrackets);
        }

        self.asm.ret();

        Ok(self.asm.machine_code())
    }

    fn generate_instruction(&mut self, instr: Instruction) -> Result<(), CompilationError> {
        debug!("generating code for: {}", instr);

        match instr.kind {
            Kind::DataInc => {
                debug_assert!((1..=MAX_RUN).contains(&instr.count));
                self.asm.add_cell_imm8(instr.count);
            }
            Kind::DataDec => {
                debug_assert!((1..=MAX_RUN).contains(&instr.count));
                self.asm.sub_cell_imm8(instr.count);
            }
            Kind::DpInc => {
                debug_assert!((1..=MAX_RUN).contains(&instr.count));
                self.asm.add_dp_imm8(instr.count);
            }
            Kind::DpDec => {
                debug_assert!((1..=MAX_RUN).contains(&instr.count));
                self.asm.sub_dp_imm8(instr.count);
            }
            Kind::Input => self.asm.read_byte(),
            Kind::Output => self.asm.write_byte(),
            Kind::LoopStart => {
                self.asm.cmp_cell_zero();
                let at = self.asm.je_placeholder();
                self.patch_stack.push(at);
            }
            Kind::LoopEnd => {
                let here = self.asm.offset();
                let at = self
                    .patch_stack
                    .pop()
                    .ok_or(CompilationError::TooManyCloseBrackets)?;

                // Both bracket sequences are cmp (3 bytes) + jcc (6 bytes).
                // `at` is the displacement inside the matching `[`, whose
                // cmp starts 5 bytes earlier. Displacements count from the
                // end of their jcc, so the distance between the two cmp
                // instructions serves both directions: forward it lands
                // just past this `]`, backward just past the `[`.
                let distance = (here - (at - 5)) as i32;

                self.asm.cmp_cell_zero();
                self.asm.jne_rel32(-distance);
                self.asm.patch_rel32(at, distance);
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::folding::fold;

    const TAPE_ADDR: u64 = 0x0000_7fff_dead_0000;

    fn compile(source: &[u8]) -> Result<Vec<u8>, CompilationError> {
        let program = fold(source);
        let mut gen = CodeGenerator::new();
        gen.compile(&program, TAPE_ADDR).map(<[u8]>::to_vec)
    }

    #[test]
    fn empty_program_is_prologue_and_ret() {
        let code = compile(b"").unwrap();

        assert_eq!([0x48, 0xba], code[0..2]);
        assert_eq!(TAPE_ADDR.to_le_bytes(), code[2..10]);
        assert_eq!(&[0xc3], &code[10..]);
    }

    #[test]
    fn arithmetic_uses_the_folded_count() {
        let code = compile(b"+++").unwrap();
        assert_eq!([0x80, 0x02, 3], code[10..13]);

        let code = compile(b"--").unwrap();
        assert_eq!([0x80, 0x2a, 2], code[10..13]);

        let code = compile(b">>>>").unwrap();
        assert_eq!([0x48, 0x83, 0xc2, 4], code[10..14]);

        let code = compile(b"<").unwrap();
        assert_eq!([0x48, 0x83, 0xea, 1], code[10..14]);
    }

    #[test]
    fn io_emits_raw_syscalls() {
        let read = compile(b",").unwrap();
        assert_eq!([0xb8, 0x00, 0x00, 0x00, 0x00], read[10..15]);

        let write = compile(b".").unwrap();
        assert_eq!([0xb8, 0x01, 0x00, 0x00, 0x00], write[10..15]);

        // Both end with syscall; pop rdx; ret.
        for code in [read, write].iter() {
            let n = code.len();
            assert_eq!([0x0f, 0x05, 0x5a, 0xc3], code[n - 4..]);
        }
    }

    #[test]
    fn empty_loop_branches_are_symmetric() {
        // Layout: prologue [0, 10), `[` cmp+je [10, 19), `]` cmp+jne
        // [19, 28), ret at 28.
        let code = compile(b"[]").unwrap();

        assert_eq!([0x80, 0x3a, 0x00, 0x0f, 0x84], code[10..15]);
        assert_eq!(9i32.to_le_bytes(), code[15..19]);
        assert_eq!([0x80, 0x3a, 0x00, 0x0f, 0x85], code[19..24]);
        assert_eq!((-9i32).to_le_bytes(), code[24..28]);
        assert_eq!(0xc3, code[28]);
    }

    #[test]
    fn nested_loops_patch_their_own_brackets() {
        // Prologue [0, 10), outer `[` [10, 19), inner `[` [19, 28),
        // inner `]` [28, 37), outer `]` [37, 46), ret at 46.
        let code = compile(b"[[]]").unwrap();

        // Inner pair: distance 9, same as an empty loop.
        assert_eq!(9i32.to_le_bytes(), code[24..28]);
        assert_eq!((-9i32).to_le_bytes(), code[33..37]);

        // Outer pair: distance 27. The forward jump ends at 19 and lands
        // at 46, just past the outer `]`; the backward jump ends at 46 and
        // lands back at 19, just past the outer `[`.
        assert_eq!(27i32.to_le_bytes(), code[15..19]);
        assert_eq!((-27i32).to_le_bytes(), code[42..46]);
        assert_eq!(0xc3, code[46]);
    }

    #[test]
    fn loop_bodies_sit_between_the_jumps() {
        let code = compile(b"[-]").unwrap();

        // cmp+je, then the 3-byte body, then cmp+jne: distance 12.
        assert_eq!([0x80, 0x2a, 1], code[19..22]);
        assert_eq!(12i32.to_le_bytes(), code[15..19]);
        assert_eq!((-12i32).to_le_bytes(), code[27..31]);
    }

    #[test]
    fn no_placeholder_survives_successful_compilation() {
        use crate::asm::x86_64::PLACEHOLDER;

        let code = compile(b"[+[>]<-]").unwrap();
        assert!(!code.windows(4).any(|window| window == &PLACEHOLDER[..]));
    }

    #[test]
    fn unmatched_close_bracket_is_refused() {
        assert_eq!(Err(CompilationError::TooManyCloseBrackets), compile(b"]"));
        assert_eq!(Err(CompilationError::TooManyCloseBrackets), compile(b"[]]"));
    }

    #[test]
    fn unmatched_open_bracket_is_refused() {
        assert_eq!(Err(CompilationError::NotEnoughCloseBrackets), compile(b"["));
        assert_eq!(Err(CompilationError::NotEnoughCloseBrackets), compile(b"[[]"));
    }
}
