use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Device classes addressable through the 1E ASCII command set.
///
/// 各デバイスクラスはマニュアル記載の固定 4 文字デバイスコード
/// （デバイス記号 2 バイトの ASCII-hex 表現, 例: 'D' 0x44 0x20 → "4420"）
/// に対応します。1E の ASCII コマンドセットではコード表は固定なので
/// TOML 等によるデータ駆動にはしていません。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceClass {
    /// X inputs (bit device, read-only on real hardware)
    BitInput,
    /// Y outputs (bit device)
    BitOutput,
    /// D data registers (16-bit word device)
    WordRegister,
}

impl DeviceClass {
    /// The fixed 4-character device code sent on the wire.
    #[must_use]
    pub const fn wire_token(&self) -> &'static str {
        match self {
            Self::BitInput => "5820",
            Self::BitOutput => "5920",
            Self::WordRegister => "4420",
        }
    }

    /// Resolve a wire token back to a device class (used by servers/mocks).
    #[must_use]
    pub fn from_wire_token(token: &str) -> Option<Self> {
        match token {
            "5820" => Some(Self::BitInput),
            "5920" => Some(Self::BitOutput),
            "4420" => Some(Self::WordRegister),
            _ => None,
        }
    }

    /// PLC program symbol for this class (X/Y/D).
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::BitInput => "X",
            Self::BitOutput => "Y",
            Self::WordRegister => "D",
        }
    }

    #[must_use]
    pub const fn is_bit(&self) -> bool {
        matches!(self, Self::BitInput | Self::BitOutput)
    }

    #[must_use]
    pub const fn is_word(&self) -> bool {
        matches!(self, Self::WordRegister)
    }
}

impl std::fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for DeviceClass {
    type Err = crate::error::Melsec1eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "X" | "x" => Ok(Self::BitInput),
            "Y" | "y" => Ok(Self::BitOutput),
            "D" | "d" => Ok(Self::WordRegister),
            other => Err(crate::error::Melsec1eError::InvalidArgument(format!(
                "unknown device: {other}"
            ))),
        }
    }
}
