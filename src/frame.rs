//! A互換1E (ASCII) フレームの組立・解析
//!
//! このモジュールは純粋なコーデックです。I/O や接続状態は持ちません。
//! 要求フレームは `CC` + `FF000A` + デバイスコード + 先頭デバイス番号(8桁hex)
//! + 点数(4桁hex) + 任意のデータ部、応答は サブヘッダ(2) + 終了コード(2) +
//! ペイロード という固定レイアウトです。

use crate::commands::Command;
use crate::device::DeviceClass;
use crate::error::Melsec1eError;

/// Fixed literal following the command code: wildcard PC number (0xFF)
/// plus the monitor timer 0x000A (2.5 s in 250 ms units).
pub const STATION_TIMER_SUFFIX: &str = "FF000A";

/// End code reported by the adapter on success.
pub const END_CODE_OK: &str = "00";

/// Byte order of the 4-hex-digit points field.
///
/// Some adapter firmware expects the natural big-endian rendering
/// ("0005"), others the low/high swapped one ("0500"). The session layer
/// discovers which one a given adapter wants by trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CountByteOrder {
    BigEndian,
    Swapped,
}

impl CountByteOrder {
    /// Render a point/word count as 4 hex digits in this byte order.
    #[must_use]
    pub fn encode_count(&self, count: u16) -> String {
        match self {
            Self::BigEndian => format!("{count:04X}"),
            Self::Swapped => {
                let lo = count & 0xFF;
                let hi = (count >> 8) & 0xFF;
                format!("{lo:02X}{hi:02X}")
            }
        }
    }

    /// Interpret a raw 4-hex-digit count field under this byte order.
    pub fn decode_count(&self, field: &str) -> Result<u16, Melsec1eError> {
        let raw = u16::from_str_radix(field, 16).map_err(|e| {
            Melsec1eError::MalformedResponse(format!("bad count field {field:?}: {e}"))
        })?;
        Ok(match self {
            Self::BigEndian => raw,
            Self::Swapped => raw.rotate_left(8),
        })
    }
}

/// Build one 1E ASCII request frame.
///
/// `head` is the starting device number (already bounded to 32 bits by the
/// type), `count` the number of points/words, `data_field` an optional
/// pre-encoded data part appended verbatim. Zero-point requests never reach
/// the codec; callers short-circuit them to no-ops first.
pub fn build_request(
    command: Command,
    device: DeviceClass,
    head: u32,
    count: u16,
    data_field: Option<&str>,
    order: CountByteOrder,
) -> Result<String, Melsec1eError> {
    if count == 0 {
        return Err(Melsec1eError::InvalidArgument(
            "zero-point request reached the frame codec".into(),
        ));
    }
    let mut frame = format!("{code:02X}{STATION_TIMER_SUFFIX}", code = command.code());
    frame.push_str(device.wire_token());
    frame.push_str(&format!("{head:08X}"));
    frame.push_str(&order.encode_count(count));
    if let Some(data) = data_field {
        frame.push_str(data);
    }
    Ok(frame)
}

/// Encode a bit-write data part: one '0'/'1' per point, padded with one
/// dummy '0' when the point count is odd so the payload stays byte-aligned.
/// The pad is consumed by the adapter and never echoed back to the caller.
#[must_use]
pub fn bit_data_field(values: &[bool]) -> String {
    let mut chars: String = values.iter().map(|&v| if v { '1' } else { '0' }).collect();
    if values.len() % 2 == 1 {
        chars.push('0'); // dummy
    }
    chars
}

/// Encode a word-write data part: 4 uppercase hex digits per value.
#[must_use]
pub fn word_data_field(values: &[u16]) -> String {
    values.iter().map(|v| format!("{v:04X}")).collect()
}

/// Parse a decoded ASCII response and return its payload.
///
/// Layout: subheader (2 chars, informational) + end code (2 chars) +
/// payload. Anything other than end code "00" is surfaced as a protocol
/// error carrying the raw text for diagnostics. Payload length is not
/// validated here; the expected length depends on the request and is the
/// device API's responsibility.
pub fn parse_response(rx: &str) -> Result<String, Melsec1eError> {
    if !rx.is_ascii() {
        return Err(Melsec1eError::MalformedResponse(format!(
            "non-ASCII response: {rx:?}"
        )));
    }
    if rx.len() < 4 {
        return Err(Melsec1eError::MalformedResponse(format!(
            "response too short: {rx:?}"
        )));
    }
    let end_code = &rx[2..4];
    if end_code != END_CODE_OK {
        return Err(Melsec1eError::Protocol {
            end_code: end_code.to_string(),
            raw: rx.to_string(),
        });
    }
    Ok(rx[4..].to_string())
}

/// A 1E ASCII request as seen from the adapter side.
///
/// This is the inverse of [`build_request`] and exists for servers and
/// mocks that receive requests and want to interpret them as typed values.
/// The count field is kept raw because its byte order is the sender's
/// choice; interpret it with [`CountByteOrder::decode_count`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRequest {
    pub command: Command,
    pub device: DeviceClass,
    pub head: u32,
    pub count_field: String,
    pub data: String,
}

/// Minimum request length: cmd(2) + suffix(6) + device(4) + head(8) + count(4).
const REQUEST_HEADER_LEN: usize = 24;

pub fn parse_request(rx: &str) -> Result<ParsedRequest, Melsec1eError> {
    if !rx.is_ascii() || rx.len() < REQUEST_HEADER_LEN {
        return Err(Melsec1eError::MalformedResponse(format!(
            "request too short: {rx:?}"
        )));
    }
    let code = u8::from_str_radix(&rx[0..2], 16)
        .map_err(|e| Melsec1eError::MalformedResponse(format!("bad command code: {e}")))?;
    let command = Command::from_code(code).ok_or_else(|| {
        Melsec1eError::MalformedResponse(format!("unsupported command code: 0x{code:02X}"))
    })?;
    let device = DeviceClass::from_wire_token(&rx[8..12]).ok_or_else(|| {
        Melsec1eError::MalformedResponse(format!("unknown device token: {token}", token = &rx[8..12]))
    })?;
    let head = u32::from_str_radix(&rx[12..20], 16)
        .map_err(|e| Melsec1eError::MalformedResponse(format!("bad head field: {e}")))?;
    Ok(ParsedRequest {
        command,
        device,
        head,
        count_field: rx[20..24].to_string(),
        data: rx[24..].to_string(),
    })
}
