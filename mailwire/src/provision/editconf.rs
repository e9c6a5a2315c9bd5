//! In-place `key = value` configuration editing.
//!
//! Each managed key ends up on exactly one active line. The first occurrence
//! of the key, active or commented out, is rewritten in place so the file
//! keeps its layout; later active occurrences are dropped; keys that never
//! appear are appended. Everything else is left untouched.

/// Line syntax of the file being edited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    /// Postfix `main.cf`: an indented line continues the previous setting.
    Postfix,
    /// Dovecot `conf.d` files: indentation carries no meaning.
    Dovecot,
}

/// Apply `settings` to `original` and return the edited text.
///
/// # Examples
///
/// ```
/// use mailwire::provision::editconf::{Dialect, apply_settings};
///
/// let edited = apply_settings("#myhostname = old\n", &[("myhostname", "box.example.com")], Dialect::Postfix);
/// assert_eq!(edited, "myhostname = box.example.com\n");
/// ```
pub fn apply_settings(original: &str, settings: &[(&str, &str)], dialect: Dialect) -> String {
    let mut written = vec![false; settings.len()];
    let mut out = Vec::new();
    let mut dropping_continuation = false;

    for line in original.lines() {
        if dropping_continuation && is_continuation(line, dialect) {
            continue;
        }
        dropping_continuation = false;

        let Some((key, commented)) = setting_key(line) else {
            out.push(line.to_owned());
            continue;
        };
        let Some(((name, value), done)) = settings
            .iter()
            .zip(written.iter_mut())
            .find(|((name, _), _)| *name == key)
        else {
            out.push(line.to_owned());
            continue;
        };

        if !*done {
            out.push(format!("{name} = {value}"));
            *done = true;
            dropping_continuation = !commented;
        } else if commented {
            out.push(line.to_owned());
        } else {
            dropping_continuation = true;
        }
    }

    for ((name, value), done) in settings.iter().zip(&written) {
        if !done {
            out.push(format!("{name} = {value}"));
        }
    }

    join_lines(out)
}

/// Enable or disable a literal directive line such as
/// `!include auth-system.conf.ext`.
///
/// Disabling comments out every active copy. Enabling uncomments the first
/// commented copy, or appends the line when it is absent.
pub fn set_line_enabled(original: &str, directive: &str, enabled: bool) -> String {
    let mut out = Vec::new();
    let mut present = false;

    for line in original.lines() {
        let trimmed = line.trim();
        let bare = trimmed.trim_start_matches('#').trim_start();
        if bare != directive {
            out.push(line.to_owned());
            continue;
        }
        let active = !trimmed.starts_with('#');
        match (enabled, active) {
            (true, true) => {
                present = true;
                out.push(line.to_owned());
            }
            (true, false) if !present => {
                present = true;
                out.push(directive.to_owned());
            }
            (false, true) => out.push(format!("#{directive}")),
            _ => out.push(line.to_owned()),
        }
    }

    if enabled && !present {
        out.push(directive.to_owned());
    }

    join_lines(out)
}

/// Extract the key of a `key = value` line and whether it is commented out.
fn setting_key(line: &str) -> Option<(&str, bool)> {
    let trimmed = line.trim_start();
    let (body, commented) = match trimmed.strip_prefix('#') {
        Some(rest) => (rest.trim_start(), true),
        None => (trimmed, false),
    };
    let (key, _) = body.split_once('=')?;
    let key = key.trim_end();
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '-');
    valid.then_some((key, commented))
}

fn is_continuation(line: &str, dialect: Dialect) -> bool {
    dialect == Dialect::Postfix
        && line.starts_with([' ', '\t'])
        && !line.trim().is_empty()
}

fn join_lines(lines: Vec<String>) -> String {
    let mut text = lines.join("\n");
    text.push('\n');
    text
}
