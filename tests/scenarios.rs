//! End-to-end language scenarios run through the full [`Session`] /
//! [`Evaluator`] stack, one program at a time: recursion, higher-order
//! calls, dynamic scope, tail calls, and a few boundary cases around
//! `catch`/`throw` and empty lists.
//!
//! Black-box assertions against a persistent session's observable output
//! and variables, not against internal evaluator state.

use logo_core::{Console, LogoErrorKind, NoLimitTracker, NoopTracer, Session, SessionError, SessionProgress};

/// Feeds every line of `program` to a fresh session, panicking with the
/// offending line on the first error.
fn run_program(session: &mut Session<NoLimitTracker, NoopTracer>, program: &str, console: &mut Console) {
    for line in program.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        session.execute(line, console).unwrap_or_else(|err| panic!("{err} while running {line:?}"));
    }
}

fn fresh() -> Session<NoLimitTracker, NoopTracer> {
    Session::new(NoLimitTracker::new(), NoopTracer)
}

#[test]
fn recursion_with_output_computes_factorial() {
    let mut session = fresh();
    let mut out = logo_core::CollectStringOutput::new();
    let mut console = Console::new(&mut out);
    run_program(
        &mut session,
        "to fact :n
         if :n < 2 [output 1]
         output :n * fact :n - 1
         end
         make \"result fact 6",
        &mut console,
    );
    let result = session.evaluator.interns.find_ci("result").unwrap();
    let value = session.evaluator.vars.get(&session.evaluator.frames, result).unwrap();
    assert_eq!(value.as_number(&session.evaluator.heap, &session.evaluator.interns).unwrap(), 720.0);
}

#[test]
fn higher_order_map_squares_every_element() {
    let mut session = fresh();
    let mut out = logo_core::CollectStringOutput::new();
    let mut console = Console::new(&mut out);
    run_program(&mut session, "make \"result map [[x] :x * :x] [1 2 3 4]", &mut console);
    let result = session.evaluator.interns.find_ci("result").unwrap();
    let value = session.evaluator.vars.get(&session.evaluator.frames, result).unwrap();
    assert_eq!(value.display(&session.evaluator.heap, &session.evaluator.interns), "[1 4 9 16]");
}

#[test]
fn dynamic_scope_sees_the_caller_local() {
    let mut session = fresh();
    let mut out = logo_core::CollectStringOutput::new();
    let mut console = Console::new(&mut out);
    run_program(
        &mut session,
        "make \"a 1
         to g
         output :a
         end
         to f
         local \"a
         make \"a 99
         output g
         end
         make \"result f",
        &mut console,
    );
    let result = session.evaluator.interns.find_ci("result").unwrap();
    let value = session.evaluator.vars.get(&session.evaluator.frames, result).unwrap();
    assert_eq!(value.as_number(&session.evaluator.heap, &session.evaluator.interns).unwrap(), 99.0);
}

#[test]
fn catch_by_tag_stops_after_the_matching_throw() {
    let mut session = fresh();
    let mut out = logo_core::CollectStringOutput::new();
    let mut console = Console::new(&mut out);
    let progress = session.execute("catch \"oops [print 1 throw \"oops print 2]", &mut console).unwrap();
    assert_eq!(progress, SessionProgress::Complete);
    assert_eq!(out.output(), "1\n");
}

#[test]
fn tail_recursion_reaches_a_hundred_thousand_without_overflowing() {
    let mut session = fresh();
    let mut out = logo_core::CollectStringOutput::new();
    let mut console = Console::new(&mut out);
    run_program(
        &mut session,
        "to loop :n
         if :n = 0 [stop]
         loop :n - 1
         end",
        &mut console,
    );
    let progress = session.execute("loop 100000", &mut console).unwrap();
    assert_eq!(progress, SessionProgress::Complete);
    assert_eq!(session.evaluator.frames.depth(), 0, "frame stack should unwind back to empty");
}

#[test]
fn repcount_tracks_the_innermost_active_loop() {
    let mut session = fresh();
    let mut out = logo_core::CollectStringOutput::new();
    let mut console = Console::new(&mut out);
    session.execute("repeat 3 [repeat 2 [print repcount]]", &mut console).unwrap();
    assert_eq!(out.output(), "1\n2\n1\n2\n1\n2\n");
}

#[test]
fn throw_toplevel_inside_catch_toplevel_still_reaches_the_session() {
    let mut session = fresh();
    let mut out = logo_core::CollectStringOutput::new();
    let mut console = Console::new(&mut out);
    let progress = session.execute("catch \"toplevel [throw \"toplevel]", &mut console).unwrap();
    assert_eq!(progress, SessionProgress::Complete, "toplevel throw unwinds past every catch, including one tagged toplevel");
}

#[test]
fn item_on_an_empty_list_reports_too_few_items() {
    let mut session = fresh();
    let mut out = logo_core::CollectStringOutput::new();
    let mut console = Console::new(&mut out);
    let err = session.execute("print item 1 []", &mut console).unwrap_err();
    match err {
        SessionError::Logo(e) => assert_eq!(e.kind, LogoErrorKind::TooFewItemsList),
        SessionError::Resource(_) => panic!("expected a Logo error, not a resource error"),
    }
}

#[test]
fn repeat_zero_runs_the_body_no_times() {
    let mut session = fresh();
    let mut out = logo_core::CollectStringOutput::new();
    let mut console = Console::new(&mut out);
    session.execute("repeat 0 [print 1]", &mut console).unwrap();
    assert_eq!(out.output(), "", "repeat 0 must not run its body at all");
}

#[test]
fn a_procedure_defined_across_multiple_lines_reports_paused_until_end() {
    let mut session = fresh();
    let mut out = logo_core::CollectStringOutput::new();
    let mut console = Console::new(&mut out);
    assert_eq!(session.execute("to square :x", &mut console).unwrap(), SessionProgress::Paused);
    assert!(session.is_paused());
    assert_eq!(session.execute("output :x * :x", &mut console).unwrap(), SessionProgress::Paused);
    assert_eq!(session.execute("end", &mut console).unwrap(), SessionProgress::Complete);
    assert!(!session.is_paused());
}
