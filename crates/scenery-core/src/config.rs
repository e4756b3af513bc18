//! Line-oriented table reader.
//!
//! Table files are plain text: one record per line, whitespace-separated
//! tokens, `#` starts a comment. The first token names the record kind.
//! `INCLUDE <path>` splices another file, resolved relative to the file
//! that contains the directive. Consumers iterate the parsed lines and
//! match on [`ConfigLine::key`].

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::constants::MAX_INCLUDE_DEPTH;
use crate::error::{read_file, Result, SceneryError};
use crate::tokens::{TokenId, TokenTable, NO_VALUE};

/// One non-empty line of a table file, already split into tokens.
#[derive(Debug, Clone)]
pub struct ConfigLine {
    pub file: PathBuf,
    /// 1-based line number within `file`.
    pub line: usize,
    pub tokens: Vec<String>,
}

impl ConfigLine {
    /// The record kind (first token).
    pub fn key(&self) -> &str {
        &self.tokens[0]
    }

    /// Build a config error pointing at this line.
    pub fn error(&self, reason: impl Into<String>) -> SceneryError {
        SceneryError::Config {
            file: self.file.clone(),
            line: self.line,
            reason: reason.into(),
        }
    }

    /// Require exactly `n` tokens including the key.
    pub fn expect_len(&self, n: usize) -> Result<()> {
        if self.tokens.len() != n {
            return Err(self.error(format!(
                "{} expects {} fields, got {}",
                self.key(),
                n - 1,
                self.tokens.len() - 1
            )));
        }
        Ok(())
    }

    fn field(&self, i: usize) -> Result<&str> {
        self.tokens
            .get(i)
            .map(String::as_str)
            .ok_or_else(|| self.error(format!("missing field {i}")))
    }

    pub fn str(&self, i: usize) -> Result<&str> {
        self.field(i)
    }

    pub fn float(&self, i: usize) -> Result<f64> {
        let s = self.field(i)?;
        parse_float(s).ok_or_else(|| self.error(format!("bad number '{s}'")))
    }

    pub fn int(&self, i: usize) -> Result<i64> {
        let s = self.field(i)?;
        parse_int(s).ok_or_else(|| self.error(format!("bad integer '{s}'")))
    }

    pub fn color(&self, i: usize) -> Result<[f32; 3]> {
        let s = self.field(i)?;
        parse_color(s).ok_or_else(|| self.error(format!("bad color '{s}'")))
    }

    pub fn enumeration(&self, i: usize, tokens: &mut TokenTable) -> Result<TokenId> {
        let s = self.field(i)?;
        parse_enum(s, tokens).ok_or_else(|| self.error(format!("bad enum token '{s}'")))
    }

    pub fn enum_set(&self, i: usize, tokens: &mut TokenTable) -> Result<Vec<TokenId>> {
        let s = self.field(i)?;
        parse_enum_set(s, tokens).ok_or_else(|| self.error(format!("bad enum set '{s}'")))
    }
}

/// Parse a float; a trailing `%` divides by 100.
pub fn parse_float(s: &str) -> Option<f64> {
    match s.strip_suffix('%') {
        Some(pct) => pct.parse::<f64>().ok().map(|v| v / 100.0),
        None => s.parse().ok(),
    }
}

pub fn parse_int(s: &str) -> Option<i64> {
    s.parse().ok()
}

/// Parse `RRGGBB` hex or `r,g,b` with 0..255 channels.
pub fn parse_color(s: &str) -> Option<[f32; 3]> {
    if s.contains(',') {
        let parts: Vec<f32> = s
            .split(',')
            .map(|p| p.trim().parse::<f32>())
            .collect::<std::result::Result<_, _>>()
            .ok()?;
        if parts.len() != 3 {
            return None;
        }
        return Some([parts[0] / 255.0, parts[1] / 255.0, parts[2] / 255.0]);
    }
    if s.len() != 6 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&s[i..i + 2], 16).ok();
    Some([
        channel(0)? as f32 / 255.0,
        channel(2)? as f32 / 255.0,
        channel(4)? as f32 / 255.0,
    ])
}

/// Parse an enumeration token; `NO_VALUE` and `-` mean "none".
pub fn parse_enum(s: &str, tokens: &mut TokenTable) -> Option<TokenId> {
    match s {
        "" => None,
        "NO_VALUE" | "-" => Some(NO_VALUE),
        _ => Some(tokens.intern(s)),
    }
}

/// Parse a comma-separated token set. `NO_VALUE` or `-` is the empty set.
pub fn parse_enum_set(s: &str, tokens: &mut TokenTable) -> Option<Vec<TokenId>> {
    if s == "NO_VALUE" || s == "-" {
        return Some(Vec::new());
    }
    let mut out = Vec::new();
    for part in s.split(',') {
        let id = parse_enum(part, tokens)?;
        if id != NO_VALUE && !out.contains(&id) {
            out.push(id);
        }
    }
    Some(out)
}

/// Split one raw line into tokens, dropping comments.
fn tokenize(raw: &str) -> Vec<String> {
    let body = raw.split('#').next().unwrap_or("");
    body.split_whitespace().map(str::to_string).collect()
}

/// Parse table text that notionally lives at `origin` (used to resolve includes).
pub fn parse_config_str(text: &str, origin: &Path) -> Result<Vec<ConfigLine>> {
    let mut out = Vec::new();
    parse_into(text, origin, 0, &mut out)?;
    Ok(out)
}

/// Read a table file and every file it includes.
pub fn read_config_file(path: &Path) -> Result<Vec<ConfigLine>> {
    let mut out = Vec::new();
    read_into(path, 0, &mut out)?;
    debug!("read {} table lines from {}", out.len(), path.display());
    Ok(out)
}

fn read_into(path: &Path, depth: usize, out: &mut Vec<ConfigLine>) -> Result<()> {
    let bytes = read_file(path)?;
    let text = String::from_utf8_lossy(&bytes);
    parse_into(&text, path, depth, out)
}

fn parse_into(text: &str, origin: &Path, depth: usize, out: &mut Vec<ConfigLine>) -> Result<()> {
    for (i, raw) in text.lines().enumerate() {
        let tokens = tokenize(raw);
        if tokens.is_empty() {
            continue;
        }
        let line = ConfigLine {
            file: origin.to_path_buf(),
            line: i + 1,
            tokens,
        };
        if line.key() == "INCLUDE" {
            line.expect_len(2)?;
            if depth + 1 >= MAX_INCLUDE_DEPTH {
                return Err(line.error("INCLUDE nested too deeply"));
            }
            let target = origin
                .parent()
                .unwrap_or_else(|| Path::new(""))
                .join(&line.tokens[1]);
            read_into(&target, depth + 1, out)?;
        } else {
            out.push(line);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_strips_comments() {
        assert_eq!(tokenize("LU_IMPORT 3 lu_Forest # trees"), vec!["LU_IMPORT", "3", "lu_Forest"]);
        assert!(tokenize("   # only a comment").is_empty());
        assert_eq!(tokenize("A\tB  C"), vec!["A", "B", "C"]);
    }

    #[test]
    fn test_parse_float_percent() {
        assert_eq!(parse_float("50%"), Some(0.5));
        assert_eq!(parse_float("-2.5"), Some(-2.5));
        assert_eq!(parse_float("abc"), None);
    }

    #[test]
    fn test_parse_color_forms() {
        let c = parse_color("FF8000").unwrap();
        assert!((c[0] - 1.0).abs() < 1e-6 && (c[1] - 128.0 / 255.0).abs() < 1e-6 && c[2] == 0.0);
        let d = parse_color("255,0,51").unwrap();
        assert!((d[0] - 1.0).abs() < 1e-6 && (d[2] - 0.2).abs() < 1e-6);
        assert_eq!(parse_color("FF80"), None);
        assert_eq!(parse_color("GG0000"), None);
    }

    #[test]
    fn test_parse_enum_set() {
        let mut t = TokenTable::new();
        let set = parse_enum_set("lu_A,lu_B,lu_A", &mut t).unwrap();
        assert_eq!(set.len(), 2, "Duplicates should collapse");
        assert!(parse_enum_set("NO_VALUE", &mut t).unwrap().is_empty());
    }

    #[test]
    fn test_line_numbers_survive_blank_lines() {
        let lines = parse_config_str("\n# c\nA 1\n\nB 2\n", Path::new("mem.txt")).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].line, 3);
        assert_eq!(lines[1].line, 5);
        let err = lines[1].expect_len(3).unwrap_err();
        assert!(err.to_string().contains("mem.txt:5"), "Error should point at the line: {err}");
    }
}
