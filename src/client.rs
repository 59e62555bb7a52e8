use crate::commands::Command;
use crate::config::config as global_config;
use crate::device::DeviceClass;
use crate::endpoint::ConnectionTarget;
use crate::error::Melsec1eError;
use crate::frame::{bit_data_field, word_data_field, CountByteOrder};
use crate::session::Session;

/// High-level client for FX-series PLCs behind an A-compatible 1E ASCII
/// Ethernet adapter.
///
/// McClient は接続先情報 (`ConnectionTarget`) を保持し、ビットデバイス
/// (X/Y) とワードデバイス (D) に対する高レベルの read/write 操作を提供
/// します。内部では `frame` コーデックと `session` 層を使ってフレームを
/// 組み立て・送受信・解析します。
///
/// エラーは `Melsec1eError` を返します。ネットワーク上の実機テストは
/// 環境依存のため CI ではモックアダプタ (`melsec_1e_mock`) の利用を推奨
/// します。
pub struct McClient {
    session: Session,
}

fn maybe_log_payload(label: &str, frame_desc: &str) {
    if global_config().log_1e_payloads {
        log::debug!("[1E CMD {label}] {frame_desc}");
    }
}

impl McClient {
    /// Create a new `McClient` with the default target.
    #[must_use]
    pub fn new() -> Self {
        Self {
            session: Session::new(ConnectionTarget::new()),
        }
    }
    #[must_use]
    pub fn with_target(mut self, target: ConnectionTarget) -> Self {
        self.session = Session::new(target);
        self
    }

    #[must_use]
    pub const fn target(&self) -> &ConnectionTarget {
        self.session.target()
    }

    /// Resolved count byte order for a (command, device) pair, if any.
    #[must_use]
    pub fn cached_count_order(
        &self,
        command: Command,
        device: DeviceClass,
    ) -> Option<CountByteOrder> {
        self.session.cached_count_order(command, device)
    }

    /// Open the connection eagerly. Commands connect on demand, so this is
    /// only needed when connect errors should surface before the first
    /// read/write.
    pub async fn connect(&mut self) -> Result<(), Melsec1eError> {
        self.session.connect().await
    }

    /// Release the socket on every exit path of a usage block. The client
    /// stays usable afterwards; the next command reconnects.
    pub async fn close(&mut self) {
        self.session.close().await;
    }

    /// Batch-read bit devices. Returns one bool per point, in device order.
    ///
    /// `points == 0` short-circuits to an empty vec without touching the
    /// network. The adapter's odd-count pad character is ignored.
    pub async fn read_bits(
        &mut self,
        device: DeviceClass,
        head: u32,
        points: u16,
    ) -> Result<Vec<bool>, Melsec1eError> {
        if !device.is_bit() {
            return Err(Melsec1eError::InvalidArgument(format!(
                "read_bits requires a bit device class, got {device}"
            )));
        }
        if points == 0 {
            return Ok(Vec::new());
        }
        maybe_log_payload("read_bits", &format!("{device}{head} x{points}"));
        let payload = self
            .session
            .execute(Command::ReadBits, device, head, points, None)
            .await?;
        let want = points as usize;
        if payload.len() < want {
            return Err(Melsec1eError::ShortResponse {
                expected: want,
                got: payload.len(),
                payload,
            });
        }
        Ok(payload.chars().take(want).map(|c| c == '1').collect())
    }

    /// Batch-write bit outputs. Empty input is a no-op; odd counts get the
    /// alignment pad on the wire.
    pub async fn write_bits(
        &mut self,
        device: DeviceClass,
        head: u32,
        values: &[bool],
    ) -> Result<(), Melsec1eError> {
        if device != DeviceClass::BitOutput {
            return Err(Melsec1eError::InvalidArgument(format!(
                "write_bits targets the bit-output device class, got {device}"
            )));
        }
        if values.is_empty() {
            return Ok(());
        }
        let points = u16::try_from(values.len()).map_err(|_| {
            Melsec1eError::InvalidArgument(format!("too many points: {}", values.len()))
        })?;
        maybe_log_payload("write_bits", &format!("{device}{head} x{points}"));
        let data = bit_data_field(values);
        self.session
            .execute(Command::WriteBits, device, head, points, Some(&data))
            .await?;
        Ok(())
    }

    /// Batch-read D registers as unsigned 16-bit words.
    pub async fn read_words(&mut self, head: u32, words: u16) -> Result<Vec<u16>, Melsec1eError> {
        if words == 0 {
            return Ok(Vec::new());
        }
        maybe_log_payload("read_words", &format!("D{head} x{words}"));
        let payload = self
            .session
            .execute(Command::ReadWords, DeviceClass::WordRegister, head, words, None)
            .await?;
        let want = words as usize * 4;
        if payload.len() < want {
            return Err(Melsec1eError::ShortResponse {
                expected: want,
                got: payload.len(),
                payload,
            });
        }
        let mut values = Vec::with_capacity(words as usize);
        for i in 0..words as usize {
            let chunk = &payload[i * 4..i * 4 + 4];
            let v = u16::from_str_radix(chunk, 16).map_err(|e| {
                Melsec1eError::MalformedResponse(format!("bad word hex {chunk:?}: {e}"))
            })?;
            values.push(v);
        }
        Ok(values)
    }

    /// Batch-write D registers. Empty input is a no-op. Values are already
    /// 16-bit so the wire's fixed 4-digit width holds by construction.
    pub async fn write_words(&mut self, head: u32, values: &[u16]) -> Result<(), Melsec1eError> {
        if values.is_empty() {
            return Ok(());
        }
        let words = u16::try_from(values.len()).map_err(|_| {
            Melsec1eError::InvalidArgument(format!("too many words: {}", values.len()))
        })?;
        maybe_log_payload("write_words", &format!("D{head} x{words}"));
        let data = word_data_field(values);
        self.session
            .execute(
                Command::WriteWords,
                DeviceClass::WordRegister,
                head,
                words,
                Some(&data),
            )
            .await?;
        Ok(())
    }

    // --- X/Y/D convenience wrappers ---
    // X/Y numbering is octal in PLC programs: to address X20 (octal) pass
    // head = 0o20.

    /// Read X\[head\] .. X\[head+points-1\].
    pub async fn read_x(&mut self, head: u32, points: u16) -> Result<Vec<bool>, Melsec1eError> {
        self.read_bits(DeviceClass::BitInput, head, points).await
    }

    /// Read Y\[head\] .. Y\[head+points-1\].
    pub async fn read_y(&mut self, head: u32, points: u16) -> Result<Vec<bool>, Melsec1eError> {
        self.read_bits(DeviceClass::BitOutput, head, points).await
    }

    /// Write consecutive Y outputs starting at `head`.
    pub async fn write_y(&mut self, head: u32, values: &[bool]) -> Result<(), Melsec1eError> {
        self.write_bits(DeviceClass::BitOutput, head, values).await
    }

    /// Set a single Y output.
    pub async fn write_y_bit(&mut self, head: u32, value: bool) -> Result<(), Melsec1eError> {
        self.write_bits(DeviceClass::BitOutput, head, &[value]).await
    }

    /// Read D\[head\] .. D\[head+words-1\].
    pub async fn read_d(&mut self, head: u32, words: u16) -> Result<Vec<u16>, Melsec1eError> {
        self.read_words(head, words).await
    }

    /// Write consecutive D registers starting at `head`.
    pub async fn write_d(&mut self, head: u32, values: &[u16]) -> Result<(), Melsec1eError> {
        self.write_words(head, values).await
    }

    /// Set a single D register.
    pub async fn write_d_word(&mut self, head: u32, value: u16) -> Result<(), Melsec1eError> {
        self.write_words(head, &[value]).await
    }
}
impl Default for McClient {
    fn default() -> Self {
        Self::new()
    }
}
