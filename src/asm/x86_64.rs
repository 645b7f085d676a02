//! Assembler for x86-64 (System V, Linux syscalls).
//!
//! Only the handful of encodings the code generator needs, each one the
//! byte-for-byte output of nasm for the mnemonic in its doc comment. The
//! data pointer lives in rdx throughout.

use log::trace;

/// The bytes written where a forward branch displacement belongs, before
/// the matching `]` is reached. Recognisable on purpose: patching checks
/// these bytes are still in place before overwriting them.
pub const PLACEHOLDER: [u8; 4] = [0x12, 0x34, 0x56, 0x78];

macro_rules! asm {
    ($($fmt: expr),+) => {{
        trace!($($fmt),+);
    }};
}

/// Generates x86-64 machine code.
pub struct X64Assembly {
    instr: Vec<u8>,
}

impl X64Assembly {
    pub fn new() -> Self {
        X64Assembly { instr: Vec::new() }
    }

    pub fn machine_code(&self) -> &[u8] {
        &self.instr
    }

    /// Offset of the next byte to be emitted.
    pub fn offset(&self) -> usize {
        self.instr.len()
    }

    fn emit(&mut self, bytes: &[u8]) {
        self.instr.extend_from_slice(bytes);
    }

    // Prologue /////////////////////////////////////////////////////////////

    /// `mov rdx, imm64`: loads the tape's base address into the data
    /// pointer. The immediate is little-endian, like everything here.
    pub fn mov_dp_imm64(&mut self, addr: u64) {
        asm!("mov rdx, {:#x}", addr);
        self.emit(&[0x48, 0xba]);
        self.emit(&addr.to_le_bytes());
    }

    // Arithmetic on the cell and the pointer ///////////////////////////////

    /// `add byte [rdx], n`
    pub fn add_cell_imm8(&mut self, n: u8) {
        asm!("add byte [rdx], {}", n);
        self.emit(&[0x80, 0x02, n]);
    }

    /// `sub byte [rdx], n`
    pub fn sub_cell_imm8(&mut self, n: u8) {
        asm!("sub byte [rdx], {}", n);
        self.emit(&[0x80, 0x2a, n]);
    }

    /// `add rdx, n` (8-bit immediate form)
    pub fn add_dp_imm8(&mut self, n: u8) {
        asm!("add rdx, {}", n);
        self.emit(&[0x48, 0x83, 0xc2, n]);
    }

    /// `sub rdx, n` (8-bit immediate form)
    pub fn sub_dp_imm8(&mut self, n: u8) {
        asm!("sub rdx, {}", n);
        self.emit(&[0x48, 0x83, 0xea, n]);
    }

    // Branches /////////////////////////////////////////////////////////////

    /// `cmp byte [rdx], 0`
    pub fn cmp_cell_zero(&mut self) {
        asm!("cmp byte [rdx], 0");
        self.emit(&[0x80, 0x3a, 0x00]);
    }

    /// `je rel32` with a [PLACEHOLDER] displacement, to be patched once the
    /// branch target is known. Returns the offset of the displacement.
    pub fn je_placeholder(&mut self) -> usize {
        asm!("je <placeholder>");
        self.emit(&[0x0f, 0x84]);

        let at = self.offset();
        self.emit(&PLACEHOLDER);
        at
    }

    /// `jne rel32`. Displacements are relative to the end of the
    /// instruction; a backward branch is negative.
    pub fn jne_rel32(&mut self, displacement: i32) {
        asm!("jne {}", displacement);
        self.emit(&[0x0f, 0x85]);
        self.emit(&displacement.to_le_bytes());
    }

    /// Fills in a forward branch emitted by [Self::je_placeholder].
    ///
    /// # Panics
    ///
    /// If the bytes at `at` are not the placeholder, which would mean the
    /// offset never came from [Self::je_placeholder].
    pub fn patch_rel32(&mut self, at: usize, displacement: i32) {
        assert_eq!(
            PLACEHOLDER,
            self.instr[at..at + 4],
            "patch target does not hold a placeholder displacement"
        );
        self.instr[at..at + 4].copy_from_slice(&displacement.to_le_bytes());
    }

    // I/O //////////////////////////////////////////////////////////////////

    /// `read(fd: 0, buf: rdx, count: 1)` through a raw Linux syscall.
    ///
    /// rdx doubles as the syscall's count argument, so it is saved and
    /// restored around the call. The syscall's return value is ignored:
    /// at end of input the cell is simply left unchanged.
    pub fn read_byte(&mut self) {
        asm!("syscall read(0, rdx, 1)");
        self.emit(&[
            0xb8, 0x00, 0x00, 0x00, 0x00, // mov eax, 0 (read)
            0xbf, 0x00, 0x00, 0x00, 0x00, // mov edi, 0 (stdin)
            0x48, 0x89, 0xd6, // mov rsi, rdx
            0x52, // push rdx
            0xba, 0x01, 0x00, 0x00, 0x00, // mov edx, 1
            0x0f, 0x05, // syscall
            0x5a, // pop rdx
        ]);
    }

    /// `write(fd: 1, buf: rdx, count: 1)` through a raw Linux syscall,
    /// with the same rdx save/restore as [Self::read_byte].
    pub fn write_byte(&mut self) {
        asm!("syscall write(1, rdx, 1)");
        self.emit(&[
            0xb8, 0x01, 0x00, 0x00, 0x00, // mov eax, 1 (write)
            0xbf, 0x01, 0x00, 0x00, 0x00, // mov edi, 1 (stdout)
            0x48, 0x89, 0xd6, // mov rsi, rdx
            0x52, // push rdx
            0xba, 0x01, 0x00, 0x00, 0x00, // mov edx, 1
            0x0f, 0x05, // syscall
            0x5a, // pop rdx
        ]);
    }

    // Epilogue /////////////////////////////////////////////////////////////

    /// `ret`: hands control back to the caller.
    pub fn ret(&mut self) {
        asm!("ret");
        self.emit(&[0xc3]);
    }
}
