//! Filename templates.
//!
//! Transfer logs, file lists and request lists are named from templates such
//! as `{timestamp}_{username}_{transfertype}_{source}-{destination}_FileList.csv`.
//! Token names are case-insensitive; unknown tokens are left in place.
//! Substituted values are made filename-safe, literal template text is not
//! touched.
//!
//! Date and time formats use the `yyyy`/`MM`/`dd`/`HH`/`mm`/`ss` notation
//! found in existing configuration files and are translated to `chrono`
//! format strings.

use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};

/// Highest value of the `{counter}` token
pub const MAX_COUNTER: u32 = 999;

/// Characters replaced with `_` in substituted values
const ILLEGAL_CHARS: [char; 9] = ['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Date/time patterns, longest first
const DATE_PATTERNS: [(&str, &str); 9] = [
    ("yyyy", "%Y"),
    ("yy", "%y"),
    ("MM", "%m"),
    ("dd", "%d"),
    ("HH", "%H"),
    ("hh", "%I"),
    ("mm", "%M"),
    ("ss", "%S"),
    ("tt", "%p"),
];

/// Transfer details substituted into templates
#[derive(Debug, Clone, Default)]
pub struct TokenValues {
    pub username: String,
    pub computername: String,
    pub transfertype: String,
    pub source: String,
    pub destination: String,
    pub mediatype: String,
    pub mediaid: String,
    /// Local network from `ui.local_network`, for `{direction}`
    pub local_network: Option<String>,
}

impl TokenValues {
    /// `Incoming` when the destination is the local network, `Outgoing` when
    /// the source is, `Transfer` otherwise.
    pub fn direction(&self) -> &'static str {
        match &self.local_network {
            Some(local) if self.destination.eq_ignore_ascii_case(local) => "Incoming",
            Some(local) if self.source.eq_ignore_ascii_case(local) => "Outgoing",
            _ => "Transfer",
        }
    }
}

/// Template renderer bound to one moment in time
pub struct Naming<'a> {
    now: NaiveDateTime,
    date_format: &'a str,
    time_format: &'a str,
    values: &'a TokenValues,
}

impl<'a> Naming<'a> {
    pub fn new(now: NaiveDateTime, date_format: &'a str, time_format: &'a str, values: &'a TokenValues) -> Self {
        Self {
            now,
            date_format,
            time_format,
            values,
        }
    }

    /// Render `template` with `counter` for the `{counter}` token
    pub fn render(&self, template: &str, counter: u32) -> String {
        let mut out = String::with_capacity(template.len() + 32);
        let mut rest = template;

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let Some(close) = after.find('}') else {
                out.push_str(&rest[open..]);
                return out;
            };

            let token = &after[..close];
            match self.resolve(token, counter) {
                Some(value) => out.push_str(&sanitize(&value)),
                None => {
                    out.push('{');
                    out.push_str(token);
                    out.push('}');
                }
            }
            rest = &after[close + 1..];
        }

        out.push_str(rest);
        out
    }

    /// First path in `dir` rendered from `template` that does not exist yet.
    ///
    /// Templates with a `{counter}` token try 1 through [`MAX_COUNTER`];
    /// others get `_001`, `_002`, ... inserted before the extension when the
    /// plain name is taken. Once every counter is taken the last candidate is
    /// returned.
    pub fn unique_path(&self, dir: &Path, template: &str) -> PathBuf {
        let has_counter = template.to_ascii_lowercase().contains("{counter}");
        if !has_counter {
            let plain = dir.join(self.render(template, 1));
            if !plain.exists() {
                return plain;
            }
        }

        let mut candidate = PathBuf::new();
        for counter in 1..=MAX_COUNTER {
            candidate = if has_counter {
                dir.join(self.render(template, counter))
            } else {
                dir.join(with_suffix(&self.render(template, counter), counter))
            };
            if !candidate.exists() {
                return candidate;
            }
        }

        tracing::warn!("All {} counter values taken for {}", MAX_COUNTER, template);
        candidate
    }

    fn resolve(&self, token: &str, counter: u32) -> Option<String> {
        let (name, format) = match token.split_once(':') {
            Some((name, format)) => (name, Some(format)),
            None => (token, None),
        };
        let values = self.values;

        let value = match (name.to_ascii_lowercase().as_str(), format) {
            ("date", None) => self.format_now(self.date_format),
            ("time", None) => self.format_now(self.time_format),
            ("date" | "time", Some(format)) => self.format_now(format),
            ("timestamp", None) => self.now.format("%Y%m%d-%H%M%S").to_string(),
            ("year", None) => self.now.format("%Y").to_string(),
            ("counter", None) => format!("{counter:03}"),
            ("username", None) => values.username.clone(),
            ("computername", None) => values.computername.clone(),
            ("transfertype", None) => values.transfertype.clone(),
            ("source", None) => values.source.clone(),
            ("destination", None) => values.destination.clone(),
            ("direction", None) => values.direction().to_string(),
            ("mediatype", None) => values.mediatype.clone(),
            ("mediaid", None) => values.mediaid.clone(),
            _ => return None,
        };
        Some(value)
    }

    fn format_now(&self, pattern: &str) -> String {
        self.now.format(&to_strftime(pattern)).to_string()
    }
}

/// Translate a `yyyyMMdd`-style pattern into a `chrono` format string.
///
/// Unrecognized characters are copied literally; `%` is escaped.
pub fn to_strftime(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() * 2);
    let mut rest = pattern;

    'outer: while let Some(c) = rest.chars().next() {
        for (from, to) in DATE_PATTERNS {
            if let Some(tail) = rest.strip_prefix(from) {
                out.push_str(to);
                rest = tail;
                continue 'outer;
            }
        }
        if c == '%' {
            out.push_str("%%");
        } else {
            out.push(c);
        }
        rest = &rest[c.len_utf8()..];
    }

    out
}

/// Replace characters that are not allowed in filenames with `_`
pub fn sanitize(value: &str) -> String {
    value
        .chars()
        .map(|c| if ILLEGAL_CHARS.contains(&c) || c.is_control() { '_' } else { c })
        .collect()
}

/// Insert `_NNN` before the extension of `name`
fn with_suffix(name: &str, counter: u32) -> String {
    match name.rfind('.') {
        Some(dot) if dot > 0 => format!("{}_{counter:03}{}", &name[..dot], &name[dot..]),
        _ => format!("{name}_{counter:03}"),
    }
}
