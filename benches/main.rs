//! Lexer/evaluator micro-benchmarks: criterion, `black_box`ed results, a
//! handful of named benchmark functions rather than one parametrised loop.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use logo_core::{Console, NoLimitTracker, NoopTracer, NullOutput, Session};

/// Runs `source` to completion against a fresh session, panicking on error
/// so a benchmark silently regressing into an error path is caught.
fn run(session: &mut Session<NoLimitTracker, NoopTracer>, source: &str, output: &mut NullOutput) {
    let mut console = Console::new(output);
    for line in source.lines().filter(|l| !l.trim().is_empty()) {
        session.execute(line, &mut console).unwrap_or_else(|err| panic!("{err} while running {line:?}"));
    }
}

fn bench_lexer_arithmetic_expression(c: &mut Criterion) {
    let mut session = Session::new(NoLimitTracker::new(), NoopTracer);
    c.bench_function("lex_arithmetic_expression", |b| {
        b.iter(|| {
            let src = session.evaluator.lex_line(black_box("1 + 2 * 3 - 4 / 2 = 5 and 6 > 1")).unwrap();
            black_box(src);
        });
    });
}

fn bench_repeat_loop(c: &mut Criterion) {
    let mut session = Session::new(NoLimitTracker::new(), NoopTracer);
    let mut output = NullOutput;
    let mut console = Console::new(&mut output);
    session.execute("make \"total 0", &mut console).unwrap();

    c.bench_function("repeat_1000_accumulate", |b| {
        b.iter(|| {
            session.execute("repeat 1000 [make \"total :total + 1]", &mut console).unwrap();
        });
    });
}

fn bench_tail_recursive_countdown(c: &mut Criterion) {
    let mut session = Session::new(NoLimitTracker::new(), NoopTracer);
    let mut output = NullOutput;
    run(
        &mut session,
        "to countdown :n
if :n = 0 [stop]
countdown :n - 1
end",
        &mut output,
    );

    c.bench_function("tail_recursive_countdown_10000", |b| {
        let mut console = Console::new(&mut output);
        b.iter(|| {
            session.execute("countdown 10000", &mut console).unwrap();
        });
    });
}

fn bench_fact(c: &mut Criterion) {
    let mut session = Session::new(NoLimitTracker::new(), NoopTracer);
    let mut output = NullOutput;
    run(
        &mut session,
        "to fact :n
if :n < 2 [output 1]
output :n * fact :n - 1
end",
        &mut output,
    );

    c.bench_function("fact_12", |b| {
        let mut console = Console::new(&mut output);
        b.iter(|| {
            session.execute("make \"result fact 12", &mut console).unwrap();
        });
    });
}

criterion_group!(benches, bench_lexer_arithmetic_expression, bench_repeat_loop, bench_tail_recursive_countdown, bench_fact);
criterion_main!(benches);
