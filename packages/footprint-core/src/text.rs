//! Styled console text for the footprint-tools binaries.

use console::{style, Emoji};

pub static CHECK: Emoji<'static, 'static> = Emoji("✓", "+");
pub static CROSS: Emoji<'static, 'static> = Emoji("✗", "x");

pub fn check_icon() -> String {
    style(format!("{}", CHECK)).green().to_string()
}

pub fn cross_icon() -> String {
    style(format!("{}", CROSS)).red().to_string()
}

pub fn bold<T: AsRef<str>>(text: T) -> String {
    style(text.as_ref()).bold().to_string()
}

pub fn error<T: AsRef<str>>(text: T) -> String {
    style(text.as_ref()).red().to_string()
}

pub fn success<T: AsRef<str>>(text: T) -> String {
    style(text.as_ref()).green().to_string()
}

pub fn highlight<T: AsRef<str>>(text: T) -> String {
    style(text.as_ref()).blue().bold().to_string()
}

/// Single and double horizontal rules used to frame tool output.
pub fn rules() -> (String, String) {
    ("-".repeat(72), "=".repeat(72))
}

/// Tool header: name and version, a one-line description and the authors.
pub fn banner(tool: &str, version: &str, about: &str, authors: &str) -> String {
    let (line, dline) = rules();
    format!(
        "\n{} {}\n{}\n{}\nPart of the {} toolkit.\n\nAuthors:\n{}\n{}\n",
        highlight(tool),
        version,
        line,
        about,
        highlight("footprint-tools"),
        authors,
        dline
    )
}

/// `label` padded to the configuration column width, followed by `value`.
pub fn setting<V: std::fmt::Display>(label: &str, value: V) -> String {
    format!("  {:<22} {}", label, value)
}
