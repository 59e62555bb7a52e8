use serde::Deserialize;
use std::str::FromStr;

/// Centralized command id enum for the A-compatible 1E ASCII command set.
/// Each variant is bound to the fixed one-byte command code that opens an
/// ASCII frame. Variant names match the snake_case ids used in mock
/// fixtures so serde can deserialize unit-variant strings like
/// `"read_words"` directly.
#[derive(Debug, Deserialize, PartialEq, Eq, Hash, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    ReadBits,
    ReadWords,
    WriteBits,
    WriteWords,
}
impl Command {
    /// Wire command code (first 2 hex digits of a request frame).
    #[must_use]
    pub const fn code(&self) -> u8 {
        match self {
            Self::ReadBits => 0x00,
            Self::ReadWords => 0x01,
            Self::WriteBits => 0x02,
            Self::WriteWords => 0x03,
        }
    }

    /// Map a wire command code back to its variant.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(Self::ReadBits),
            0x01 => Some(Self::ReadWords),
            0x02 => Some(Self::WriteBits),
            0x03 => Some(Self::WriteWords),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::ReadBits => "read_bits",
            Self::ReadWords => "read_words",
            Self::WriteBits => "write_bits",
            Self::WriteWords => "write_words",
        }
    }
    #[must_use]
    pub const fn is_read(&self) -> bool {
        matches!(self, Self::ReadBits | Self::ReadWords)
    }

    #[must_use]
    pub const fn is_write(&self) -> bool {
        matches!(self, Self::WriteBits | Self::WriteWords)
    }

    #[must_use]
    pub const fn is_bit_command(&self) -> bool {
        matches!(self, Self::ReadBits | Self::WriteBits)
    }

    #[must_use]
    pub const fn is_word_command(&self) -> bool {
        matches!(self, Self::ReadWords | Self::WriteWords)
    }
}
impl FromStr for Command {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read_bits" => Ok(Self::ReadBits),
            "read_words" => Ok(Self::ReadWords),
            "write_bits" => Ok(Self::WriteBits),
            "write_words" => Ok(Self::WriteWords),
            other => Err(format!("unknown command id: {other}")),
        }
    }
}
