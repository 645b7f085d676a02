//! Runs generated code for real and observes the tape afterwards.
//!
//! The emitted code writes to the actual stdout with a raw syscall, so
//! these tests assert on tape state rather than captured output, and none
//! of them executes a `,` (that would block the suite on stdin).

#![cfg(all(target_arch = "x86_64", target_os = "linux"))]

use bfjit::{fold, jit_compile, Tape};

fn run_program(source: &[u8]) -> Tape {
    let program = fold(source);
    let mut tape = Tape::new();

    let compiled = jit_compile(&program, &tape).expect("program should compile");
    compiled.run(&mut tape);

    tape
}

#[test]
fn empty_program_returns_immediately() {
    let tape = run_program(b"");
    assert!(tape.cells().iter().all(|&cell| cell == 0));
}

#[test]
fn comments_only_is_the_empty_program() {
    let tape = run_program(b"just some prose; no opcodes at all");
    assert!(tape.cells().iter().all(|&cell| cell == 0));
}

#[test]
fn increments_accumulate() {
    let tape = run_program(&vec![b'+'; 300]);
    assert_eq!(300 % 256, tape.cells()[0] as usize);
    assert_eq!(0, tape.cells()[1]);
}

#[test]
fn cell_arithmetic_wraps_mod_256() {
    let tape = run_program(&vec![b'+'; 256]);
    assert_eq!(0, tape.cells()[0]);
}

#[test]
fn pointer_motion_round_trips() {
    // `><` is a no-op; `+-` is a no-op.
    let tape = run_program(b"><+-");
    assert!(tape.cells().iter().all(|&cell| cell == 0));
}

#[test]
fn pointer_lands_where_it_should() {
    let tape = run_program(b">>>++<+");
    assert_eq!(0, tape.cells()[0]);
    assert_eq!(1, tape.cells()[2]);
    assert_eq!(2, tape.cells()[3]);
}

#[test]
fn loop_at_zero_is_skipped_and_terminates() {
    let tape = run_program(b"[]");
    assert!(tape.cells().iter().all(|&cell| cell == 0));

    // The skipped body must not run.
    let tape = run_program(b"[>+<]>");
    assert_eq!(0, tape.cells()[1]);
}

#[test]
fn multiplication_loop() {
    // 8 * 9 = 72: the classic way to spell 'H'.
    let tape = run_program(b"++++++++[>+++++++++<-]>");
    assert_eq!(0, tape.cells()[0]);
    assert_eq!(72, tape.cells()[1]);
}

#[test]
fn nested_loops() {
    let tape = run_program(b"+++[>+++[>+<-]<-]>>");
    assert_eq!(0, tape.cells()[0]);
    assert_eq!(0, tape.cells()[1]);
    assert_eq!(9, tape.cells()[2]);
}

#[test]
fn long_runs_split_and_still_execute() {
    // 130 `>` then 130 `+`: folds into multiple max-count instructions.
    let mut source = vec![b'>'; 130];
    source.extend(vec![b'+'; 130]);

    let tape = run_program(&source);
    assert_eq!(130, tape.cells()[130]);
}

#[test]
fn output_runs_to_completion() {
    // Writes 'H' to the real stdout; what matters here is that the
    // syscall sequence preserves the data pointer and control returns.
    let tape = run_program(b"++++++++[>+++++++++<-]>.+");
    assert_eq!(73, tape.cells()[1]);
}

#[test]
fn hello_world_runs_to_completion() {
    // Deeply nested loops, long folded runs, and a dozen writes to the
    // real stdout. The check is that compilation succeeds and control
    // comes back through the final ret.
    run_program(
        b"++++++++[>++++[>++>+++>+++>+<<<<-]>+>+>->>+[<]<-]>>.>---.+++++++..+++.>>.\
          <-.<.+++.------.--------.>>+.>++.",
    );
}

#[test]
fn unmatched_bracket_is_refused_before_any_mapping() {
    let program = fold(b"[");
    let tape = Tape::new();

    assert!(jit_compile(&program, &tape).is_err());
}

#[test]
fn close_bracket_alone_is_refused() {
    let program = fold(b"]");
    let tape = Tape::new();

    assert!(jit_compile(&program, &tape).is_err());
}
