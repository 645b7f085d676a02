//! An x86-64 JIT compiler for the brainfuck tape language.
//!
//! The pipeline is deliberately short:
//!
//!  - source text is [folded][folding::fold] into run-length instructions;
//!  - the folded program is compiled to x86-64 machine code with the
//!    tape's address baked in as an immediate ([codegen]);
//!  - the bytes are copied into an executable mapping and jumped into
//!    ([jit], backed by the `jitmem` crate).
//!
//! The generated code does its own I/O with raw Linux `read`/`write`
//! syscalls, one byte at a time, against the process's standard streams.

use std::error::Error;
use std::fs;
use std::path::PathBuf;

use libc::c_void;
use log::warn;
use structopt::StructOpt;

pub mod errors;
pub mod folding;
pub mod tape;

mod asm;
mod codegen;
mod jit;

pub use crate::codegen::CodeGenerator;
pub use crate::errors::CompilationError;
pub use crate::folding::{fold, FoldedProgram};
pub use crate::jit::CompiledProgram;
pub use crate::tape::{Tape, TAPE_LEN};

#[derive(Debug, StructOpt)]
#[structopt(name = "bfjit", about = "JIT-compiles and runs a brainfuck program.")]
pub struct Opt {
    /// Program file. With no file, the first line of standard input is
    /// used as the program.
    #[structopt(parse(from_os_str))]
    pub file: Option<PathBuf>,

    /// Print the folded instruction listing instead of running.
    #[structopt(long)]
    pub dump: bool,

    /// More logging on standard error (-v: debug, -vv: trace).
    #[structopt(short, long, parse(from_occurrences))]
    pub verbose: u8,
}

/// Obtains the source, compiles it, and runs it. The whole driver.
pub fn run(opt: Opt) -> Result<(), Box<dyn Error>> {
    let source = read_source(&opt);
    let program = fold(&source);

    if opt.dump {
        folding::disassemble(&program);
        return Ok(());
    }

    let mut tape = Tape::new();
    let compiled = jit_compile(&program, &tape)?;
    compiled.run(&mut tape);

    Ok(())
}

/// Compiles the folded program to native code, injected into the current
/// process's image, targeting the given tape.
///
/// Unbalanced brackets are reported before any memory is mapped.
pub fn jit_compile(program: &FoldedProgram, tape: &Tape) -> Result<CompiledProgram, Box<dyn Error>> {
    let mut gen = CodeGenerator::new();
    let code = gen.compile(program, tape.start_addr())?;

    Ok(CompiledProgram::from_binary(code, tape.start_addr())?)
}

fn read_source(opt: &Opt) -> Vec<u8> {
    match &opt.file {
        Some(path) => match fs::read(path) {
            Ok(bytes) => bytes,
            Err(err) => {
                // Same behaviour as running an empty program, but say why.
                warn!("could not read {}: {}", path.display(), err);
                Vec::new()
            }
        },
        None => {
            warn!("no program file specified; using the first line of standard input as the program");
            read_program_line()
        }
    }
}

/// Reads one line from file descriptor 0 through the raw `read` syscall.
///
/// This must not go through a buffered stream: a userspace read buffer
/// would swallow bytes past the newline that the compiled program's `,`
/// instructions expect to find on the descriptor.
fn read_program_line() -> Vec<u8> {
    let mut line = Vec::new();
    let mut byte = 0u8;

    loop {
        let n = unsafe { libc::read(0, &mut byte as *mut u8 as *mut c_void, 1) };
        if n <= 0 {
            break;
        }

        line.push(byte);
        if byte == b'\n' {
            break;
        }
    }

    line
}
