use colored::Colorize;
use serde::Serialize;

/// Pretty JSON on stdout
pub fn json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn status(message: &str) {
    eprintln!("{} {}", "→".blue(), message);
}

pub fn success(message: &str) {
    eprintln!("{} {}", "✓".green(), message.green());
}

pub fn warn(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message.yellow());
}
