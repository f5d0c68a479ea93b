//! Control line encoding/decoding
//!
//! Every transfer starts with a single text record announcing the file:
//!
//! ```text
//! C<mode> <size> <name>\n
//! ```
//!
//! - mode: permission bits, 4 octal digits
//! - size: content length in bytes, decimal
//! - name: base name of the file, no spaces

use std::fmt;

use crate::error::ProtocolError;

/// Longest control line accepted from a peer, newline included
pub const MAX_CONTROL_LINE: usize = 1024;

/// Marker byte of a regular-file control line
pub const CONTROL_MARKER: u8 = b'C';

/// Permission bits announced when the caller does not supply any
pub const DEFAULT_MODE: FileMode = FileMode(0o644);

/// Octal permission bits carried by a control line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileMode(pub u32);

impl FileMode {
    /// Create a mode, keeping only the permission and special bits
    pub fn new(bits: u32) -> Self {
        Self(bits & 0o7777)
    }

    /// Get the raw permission bits
    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Parse the octal text of a control line's first field
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        if text.is_empty() || !text.bytes().all(|b| (b'0'..=b'7').contains(&b)) {
            return Err(ProtocolError::InvalidMode(text.to_string()));
        }

        let bits = u32::from_str_radix(text, 8)
            .map_err(|_| ProtocolError::InvalidMode(text.to_string()))?;
        if bits > 0o7777 {
            return Err(ProtocolError::InvalidMode(text.to_string()));
        }

        Ok(Self(bits))
    }
}

impl Default for FileMode {
    fn default() -> Self {
        DEFAULT_MODE
    }
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04o}", self.0)
    }
}

impl From<u32> for FileMode {
    fn from(bits: u32) -> Self {
        Self::new(bits)
    }
}

/// Metadata record sent ahead of a file's bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlLine {
    /// Permission bits of the file
    pub mode: FileMode,
    /// Declared content length in bytes
    pub size: u64,
    /// Base name of the file
    pub file_name: String,
}

impl ControlLine {
    /// Create a new control line
    pub fn new(mode: FileMode, size: u64, file_name: impl Into<String>) -> Self {
        Self {
            mode,
            size,
            file_name: file_name.into(),
        }
    }

    /// Parse a raw control line, with or without its trailing newline
    ///
    /// Fields are separated by single spaces. Only the first three fields are
    /// read, so a file name containing a space is cut at the first space.
    pub fn parse(raw: &str) -> Result<Self, ProtocolError> {
        let line = raw.strip_suffix('\n').unwrap_or(raw);
        let malformed = || ProtocolError::MalformedControlLine(line.to_string());

        let mut fields = line.split(' ');

        let head = fields.next().ok_or_else(malformed)?;
        let mode_text = head
            .strip_prefix(CONTROL_MARKER as char)
            .ok_or_else(malformed)?;
        let size_text = fields.next().ok_or_else(malformed)?;
        let file_name = fields.next().filter(|f| !f.is_empty()).ok_or_else(malformed)?;

        if fields.next().is_some() {
            tracing::debug!(
                "Control line name truncated at first space: {:?} -> {:?}",
                line,
                file_name
            );
        }

        let mode = FileMode::parse(mode_text)?;
        let size = size_text
            .parse::<u64>()
            .map_err(|_| ProtocolError::InvalidSize(size_text.to_string()))?;

        Ok(Self {
            mode,
            size,
            file_name: file_name.to_string(),
        })
    }

    /// Reject names that would escape the destination directory or break framing
    pub fn check_file_name(&self) -> Result<(), ProtocolError> {
        let name = self.file_name.as_str();
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\0', '\n'])
        {
            return Err(ProtocolError::UnsafeFileName(name.to_string()));
        }
        Ok(())
    }

    /// Format the record as it goes on the wire, newline included
    pub fn to_line(&self) -> String {
        format!("{}\n", self)
    }
}

impl fmt::Display for ControlLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{} {} {}",
            CONTROL_MARKER as char, self.mode, self.size, self.file_name
        )
    }
}
