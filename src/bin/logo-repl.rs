use std::{
    io::{self, Write},
    process::ExitCode,
};

use logo_core::{Console, NoLimitTracker, NoopTracer, Session, SessionError, SessionProgress, StdOutput};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    let mut session = Session::new(NoLimitTracker::new(), NoopTracer);
    let mut output = StdOutput;

    if args.len() > 1 {
        let path = &args[1];
        let source = match std::fs::read_to_string(path) {
            Ok(s) => s,
            Err(err) => {
                eprintln!("Error reading {path}: {err}");
                return ExitCode::FAILURE;
            }
        };
        for line in source.lines() {
            if let Err(err) = run_line(&mut session, line, &mut output) {
                eprintln!("{err}");
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    loop {
        let prompt = if session.is_paused() { "~ " } else { "? " };
        let Some(line) = read_line(prompt) else {
            println!();
            break;
        };
        if let Err(err) = run_line(&mut session, &line, &mut output) {
            eprintln!("{err}");
        }
    }

    ExitCode::SUCCESS
}

/// Feeds one line to the session, discarding the `Paused`/`Complete`
/// distinction beyond what the caller already uses to pick a prompt.
fn run_line(session: &mut Session<NoLimitTracker, NoopTracer>, line: &str, output: &mut StdOutput) -> Result<(), SessionError> {
    let mut console = Console::new(output);
    match session.execute(line, &mut console)? {
        SessionProgress::Complete | SessionProgress::Paused => Ok(()),
    }
}

/// Reads one line from stdin after printing a prompt.
///
/// Returns `None` on EOF (Ctrl+D).
fn read_line(prompt: &str) -> Option<String> {
    print!("{prompt}");
    if io::stdout().flush().is_err() {
        return None;
    }
    let mut input = String::new();
    let read = io::stdin().read_line(&mut input).ok()?;
    if read == 0 {
        return None;
    }
    Some(input.trim_end_matches(['\r', '\n']).to_owned())
}
