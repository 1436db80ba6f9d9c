//! Command-layer helpers: mode selection and comment input/output formats

use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use tracing::warn;
use crate::png::TextEntry;
use crate::{PngannoError, PngannoResult};

/// What a single invocation does to the PNG file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Add comments given as `key,text` arguments
    Add,
    /// Add comments read from a tab-delimited file
    AddFile,
    /// Print the text of the requested keys
    Retrieve,
    /// Remove the requested keys
    Delete,
    /// Print tag and length of every chunk
    Dump,
}

impl Mode {
    /// Whether this mode produces a new PNG file
    pub fn writes_png(self) -> bool {
        matches!(self, Mode::Add | Mode::AddFile | Mode::Delete)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let flag = match self {
            Mode::Add => "-a",
            Mode::AddFile => "-f",
            Mode::Retrieve => "-r",
            Mode::Delete => "-d",
            Mode::Dump => "-D",
        };
        f.write_str(flag)
    }
}

/// Collects requested modes, rejecting two different ones
#[derive(Debug, Default)]
pub struct ModeSelector {
    mode: Option<Mode>,
}

impl ModeSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request `mode`. Repeating the current mode is fine.
    pub fn select(&mut self, mode: Mode) -> PngannoResult<()> {
        match self.mode {
            None => {
                self.mode = Some(mode);
                Ok(())
            }
            Some(current) if current == mode => Ok(()),
            Some(current) => Err(PngannoError::ConflictingModes {
                first: current.to_string(),
                second: mode.to_string(),
            }),
        }
    }

    /// Selected mode; `None` means list keys
    pub fn finish(self) -> Option<Mode> {
        self.mode
    }
}

/// Split a `key,text` argument at its first comma.
///
/// Returns `None` when there is no comma or the key would be empty.
pub fn parse_comment_arg(arg: &str) -> Option<(&str, &str)> {
    match arg.find(',') {
        Some(p) if p > 0 => Some((&arg[..p], &arg[p + 1..])),
        _ => None,
    }
}

/// Parse `key,text` arguments, warning about malformed ones
pub fn parse_comment_args<S: AsRef<str>>(args: &[S]) -> Vec<(String, String)> {
    args.iter()
        .filter_map(|arg| {
            let arg = arg.as_ref();
            let parsed = parse_comment_arg(arg);
            if parsed.is_none() {
                warn!("Ignoring comment {:?}: expected key,text", arg);
            }
            parsed.map(|(k, t)| (k.to_string(), t.to_string()))
        })
        .collect()
}

/// Read comments from tab-delimited lines.
///
/// Lines starting with `#` and lines with fewer than two columns are
/// skipped. Column one is the key, column two the text.
pub fn parse_comments<R: BufRead>(reader: R) -> PngannoResult<Vec<(String, String)>> {
    let mut comments = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.starts_with('#') {
            continue;
        }

        let mut columns = line.trim().split('\t');
        if let (Some(key), Some(text)) = (columns.next(), columns.next()) {
            comments.push((key.to_string(), text.to_string()));
        }
    }
    Ok(comments)
}

/// Read a tab-delimited comments file
pub fn read_comments_file(path: &Path) -> PngannoResult<Vec<(String, String)>> {
    let file = File::open(path)?;
    parse_comments(BufReader::new(file))
}

/// Flatten comma-separated key lists into single keys
pub fn split_keys<S: AsRef<str>>(values: &[S]) -> Vec<String> {
    values
        .iter()
        .flat_map(|v| v.as_ref().split(','))
        .map(str::to_string)
        .collect()
}

/// Write retrieved comments as `#key` followed by the text
pub fn write_entries<W: Write>(out: &mut W, entries: &[TextEntry]) -> PngannoResult<()> {
    for entry in entries {
        out.write_all(b"#")?;
        out.write_all(&entry.key)?;
        out.write_all(b"\n")?;
        out.write_all(&entry.text)?;
        out.write_all(b"\n")?;
    }
    Ok(())
}

/// Write one key per line
pub fn write_keys<W: Write>(out: &mut W, keys: &[&[u8]]) -> PngannoResult<()> {
    for key in keys {
        out.write_all(key)?;
        out.write_all(b"\n")?;
    }
    Ok(())
}

/// Write `TAG LENGTH` per chunk
pub fn write_summary<W: Write>(out: &mut W, summary: &[(String, u32)]) -> PngannoResult<()> {
    for (tag, length) in summary {
        writeln!(out, "{} {}", tag, length)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use tempfile::NamedTempFile;

    #[test]
    fn test_mode_selection() {
        let mut selector = ModeSelector::new();
        selector.select(Mode::Add).unwrap();
        selector.select(Mode::Add).unwrap();
        assert_eq!(selector.finish(), Some(Mode::Add));

        assert_eq!(ModeSelector::new().finish(), None);
    }

    #[test]
    fn test_conflicting_modes() {
        let mut selector = ModeSelector::new();
        selector.select(Mode::Add).unwrap();
        let err = selector.select(Mode::Retrieve).unwrap_err();
        assert!(matches!(
            &err,
            PngannoError::ConflictingModes { first, second } if first == "-a" && second == "-r"
        ));
        assert!(!err.is_format_error());
    }

    #[test]
    fn test_writes_png() {
        assert!(Mode::Delete.writes_png());
        assert!(Mode::AddFile.writes_png());
        assert!(!Mode::Retrieve.writes_png());
        assert!(!Mode::Dump.writes_png());
    }

    #[test]
    fn test_parse_comment_arg() {
        assert_eq!(parse_comment_arg("key,text"), Some(("key", "text")));
        assert_eq!(parse_comment_arg("key,a,b"), Some(("key", "a,b")));
        assert_eq!(parse_comment_arg("key,"), Some(("key", "")));
        assert_eq!(parse_comment_arg(",text"), None);
        assert_eq!(parse_comment_arg("notext"), None);

        let parsed = parse_comment_args(&["a,1", "bad", "b,2"]);
        assert_eq!(parsed, [("a".to_string(), "1".to_string()), ("b".to_string(), "2".to_string())]);
    }

    #[test]
    fn test_parse_comments() {
        let input = "# header\tignored\nkey1\tvalue one\n\nsingle\nkey2\tvalue two\textra\n  key3\tpadded  \n";
        let comments = parse_comments(Cursor::new(input)).unwrap();
        assert_eq!(
            comments,
            [
                ("key1".to_string(), "value one".to_string()),
                ("key2".to_string(), "value two".to_string()),
                ("key3".to_string(), "padded".to_string()),
            ]
        );
    }

    #[test]
    fn test_read_comments_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "Author\tJane").unwrap();
        let comments = read_comments_file(file.path()).unwrap();
        assert_eq!(comments, [("Author".to_string(), "Jane".to_string())]);

        let missing = read_comments_file(Path::new("/nonexistent/comments.tsv"));
        assert!(matches!(missing, Err(PngannoError::Io(_))));
    }

    #[test]
    fn test_split_keys() {
        assert_eq!(split_keys(&["a,b", "c"]), ["a", "b", "c"]);
    }

    #[test]
    fn test_output_formats() {
        let mut out = Vec::new();
        write_entries(&mut out, &[TextEntry::new("key1", "line one\nline two")]).unwrap();
        assert_eq!(out, b"#key1\nline one\nline two\n");

        let mut out = Vec::new();
        write_keys(&mut out, &[&b"a"[..], &b"b"[..]]).unwrap();
        assert_eq!(out, b"a\nb\n");

        let mut out = Vec::new();
        write_summary(&mut out, &[("IHDR".to_string(), 13), ("IEND".to_string(), 0)]).unwrap();
        assert_eq!(out, b"IHDR 13\nIEND 0\n");
    }
}
