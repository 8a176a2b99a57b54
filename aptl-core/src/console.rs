use std::env;
use std::io::{self, IsTerminal, Write};
use std::sync::OnceLock;

// Everything here writes to stderr: stdout carries install lists and
// records that callers pipe into other tools.

fn use_color() -> bool {
    static USE_COLOR: OnceLock<bool> = OnceLock::new();
    *USE_COLOR.get_or_init(|| env::var_os("NO_COLOR").is_none() && is_tty())
}

fn is_tty() -> bool {
    static IS_TTY: OnceLock<bool> = OnceLock::new();
    *IS_TTY.get_or_init(|| io::stderr().is_terminal())
}

fn paint(code: &str, text: &str) -> String {
    if use_color() {
        format!("\u{1b}[{}m{}\u{1b}[0m", code, text)
    } else {
        text.to_string()
    }
}

fn dim(text: &str) -> String {
    paint("2", text)
}

fn green(text: &str) -> String {
    paint("32", text)
}

fn cyan(text: &str) -> String {
    paint("36", text)
}

fn yellow(text: &str) -> String {
    paint("33", text)
}

fn red(text: &str) -> String {
    paint("31", text)
}

pub fn header(command: &str, version: &str) {
    eprintln!("{}", dim(&format!("apt-local {} v{}", command, version)));
}

pub fn step(message: &str) {
    if is_tty() {
        eprint!("\r\u{1b}[K{}\n", dim(message));
        let _ = io::stderr().flush();
    } else {
        eprintln!("{}", dim(message));
    }
}

pub fn progress(message: &str, current: usize, total: usize) {
    if is_tty() {
        eprint!(
            "\r\u{1b}[K{} {}",
            dim(message),
            cyan(&format!("[{}/{}]", current, total))
        );
        let _ = io::stderr().flush();
    }
}

pub fn clear_line() {
    if is_tty() {
        eprint!("\r\u{1b}[K");
        let _ = io::stderr().flush();
    }
}

pub fn fetched(name: &str, version: &str, reused: bool) {
    let mark = green("+");
    let label = if reused { dim(" (cached)") } else { String::new() };
    clear_line();
    eprintln!("{} {}_{}{}", mark, name, version, label);
}

pub fn summary(count: usize, noun: (&str, &str), verb: &str, seconds: f32) {
    let time_str = if seconds < 1.0 {
        format!("{:.0}ms", seconds * 1000.0)
    } else {
        format!("{:.2}s", seconds)
    };
    let noun = if count == 1 { noun.0 } else { noun.1 };
    eprintln!(
        "{} {} {} {}",
        count,
        noun,
        verb,
        dim(&format!("[{}]", time_str))
    );
}

pub fn warn(message: &str) {
    let tag = yellow("warn");
    eprintln!("{} {}", tag, message);
}

pub fn error(message: &str) {
    let tag = red("error");
    eprintln!("{} {}", tag, message);
}

pub fn info(message: &str) {
    eprintln!("{}", message);
}

pub fn is_logging_enabled() -> bool {
    tracing::enabled!(tracing::Level::DEBUG)
}

pub fn verbose(message: &str) {
    tracing::debug!("{}", message);
}
