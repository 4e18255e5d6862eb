//! Script line grammar.
//!
//! ```text
//! #...                      comment
//! call <path>               push <path> onto the script stack
//! cli-setting <key> [<v>]   set or remove a setting
//! <whitespace only>         spacer
//! anything else             command sent to the target
//! ```
//!
//! Lines are classified as raw bytes. Prefixes are matched on the raw line,
//! so `call` and `cli-setting` need their trailing space and `#` must be the
//! first byte. Command bytes are never decoded.

/// Prefix of a comment line
pub const COMMENT_PREFIX: &[u8] = b"#";
/// Prefix of a `call` directive
pub const CALL_PREFIX: &[u8] = b"call ";
/// Prefix of a `cli-setting` directive
pub const SETTING_PREFIX: &[u8] = b"cli-setting ";

/// One classified script line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Directive<'a> {
    /// Comment text, trimmed
    Comment(&'a [u8]),
    /// `call` target, trimmed
    Call(&'a [u8]),
    /// Arguments following `cli-setting `
    Setting(&'a [u8]),
    /// Whitespace-only line
    Blank,
    /// The raw line, terminator included
    Command(&'a [u8]),
}

impl<'a> Directive<'a> {
    /// Classify a raw script line.
    pub fn parse(line: &'a [u8]) -> Self {
        if line.starts_with(COMMENT_PREFIX) {
            Self::Comment(line.trim_ascii())
        } else if let Some(rest) = line.strip_prefix(CALL_PREFIX) {
            Self::Call(rest.trim_ascii())
        } else if let Some(rest) = line.strip_prefix(SETTING_PREFIX) {
            Self::Setting(rest)
        } else if line.trim_ascii().is_empty() {
            Self::Blank
        } else {
            Self::Command(line)
        }
    }

    /// Whether the line goes to the target
    pub fn is_command(&self) -> bool {
        matches!(self, Self::Command(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comment() {
        assert_eq!(Directive::parse(b"# login flow\r\n"), Directive::Comment(b"# login flow"));
        assert_eq!(Directive::parse(b"#\n"), Directive::Comment(b"#"));
    }

    #[test]
    fn test_call() {
        assert_eq!(Directive::parse(b"call child.txt\n"), Directive::Call(b"child.txt"));
        assert_eq!(Directive::parse(b"call   sub/a.txt  \r\n"), Directive::Call(b"sub/a.txt"));
    }

    #[test]
    fn test_setting() {
        assert_eq!(
            Directive::parse(b"cli-setting retry 1\n"),
            Directive::Setting(b"retry 1\n")
        );
    }

    #[test]
    fn test_blank() {
        assert_eq!(Directive::parse(b"\n"), Directive::Blank);
        assert_eq!(Directive::parse(b" \t\r\n"), Directive::Blank);
    }

    #[test]
    fn test_command_keeps_terminator() {
        assert_eq!(Directive::parse(b"tap button\r\n"), Directive::Command(b"tap button\r\n"));
        assert!(Directive::parse(b"ping\n").is_command());
    }

    #[test]
    fn test_command_keeps_non_utf8_bytes() {
        let line = b"tap \xff\xfe\n";
        assert_eq!(Directive::parse(line), Directive::Command(line));
        assert!(Directive::parse(b"\xa9\n").is_command());
    }

    #[test]
    fn test_prefixes_need_their_space() {
        assert!(Directive::parse(b"cli-setting\n").is_command());
        assert!(Directive::parse(b"calls 3\n").is_command());
        assert!(Directive::parse(b" # indented\n").is_command());
    }
}
