//! Turns source text into run-length folded instructions.

use std::fmt;

/// Longest run a single folded instruction may carry. The arithmetic forms
/// emitted for these instructions take an 8-bit signed immediate, so a run
/// must fit in `i8`; longer runs become several max-count instructions.
pub const MAX_RUN: u8 = 0x7f;

/// The eight operations of the language, one per recognised source byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    DpInc,
    DpDec,
    DataInc,
    DataDec,
    Input,
    Output,
    LoopStart,
    LoopEnd,
}

/// A folded instruction: an operation and how many times to apply it.
///
/// `count` is meaningful only for the pointer/arithmetic kinds; for the
/// other four it is always 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub kind: Kind,
    pub count: u8,
}

/// A program that has been folded and is ready for code generation.
pub struct FoldedProgram {
    instructions: Vec<Instruction>,
}

impl FoldedProgram {
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions[..]
    }
}

impl Kind {
    fn from_byte(byte: u8) -> Option<Kind> {
        use Kind::*;

        match byte {
            b'>' => Some(DpInc),
            b'<' => Some(DpDec),
            b'+' => Some(DataInc),
            b'-' => Some(DataDec),
            b',' => Some(Input),
            b'.' => Some(Output),
            b'[' => Some(LoopStart),
            b']' => Some(LoopEnd),
            _ => None,
        }
    }

    /// The source character this operation was read from.
    pub fn symbol(self) -> char {
        use Kind::*;

        match self {
            DpInc => '>',
            DpDec => '<',
            DataInc => '+',
            DataDec => '-',
            Input => ',',
            Output => '.',
            LoopStart => '[',
            LoopEnd => ']',
        }
    }

    /// Whether adjacent occurrences collapse into one counted instruction.
    /// I/O and brackets never fold.
    fn is_foldable(self) -> bool {
        use Kind::*;

        matches!(self, DpInc | DpDec | DataInc | DataDec)
    }
}

/// Folds source text (really, just a bunch of bytes) into an instruction
/// list. Runs of `>`, `<`, `+`, `-` collapse into counted instructions,
/// capped at [MAX_RUN]; every unrecognised byte is a comment.
///
/// Bracket structure is not checked here; the code generator rejects
/// unbalanced programs.
pub fn fold(source_text: &[u8]) -> FoldedProgram {
    let mut instructions: Vec<Instruction> = Vec::new();

    for &byte in source_text {
        let kind = match Kind::from_byte(byte) {
            Some(kind) => kind,
            None => continue,
        };

        match instructions.last_mut() {
            Some(last) if last.kind == kind && kind.is_foldable() && last.count < MAX_RUN => {
                last.count += 1;
            }
            _ => instructions.push(Instruction { kind, count: 1 }),
        }
    }

    FoldedProgram { instructions }
}

/// Prints the folded instructions in a pseudo-assembly format.
pub fn disassemble(program: &FoldedProgram) {
    for (i, instr) in program.instructions().iter().enumerate() {
        println!("{:4}: {}", i, instr);
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        use Kind::*;

        match self.kind {
            DataInc => write!(f, "[dp] <- [dp] + #{}", self.count),
            DataDec => write!(f, "[dp] <- [dp] - #{}", self.count),
            DpInc => write!(f, "dp <- dp + #{}", self.count),
            DpDec => write!(f, "dp <- dp - #{}", self.count),
            Input => write!(f, "getchar [dp]"),
            Output => write!(f, "putchar [dp]"),
            LoopStart => write!(f, "jz matching ]"),
            LoopEnd => write!(f, "jnz matching ["),
        }
    }
}
