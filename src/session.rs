//! セッション層: TCP 接続のライフサイクルと点数フィールドの
//! バイトオーダー解決を担当します。
//!
//! プロトコルは厳密なリクエスト/レスポンス (half-duplex) なので、同時に
//! 送出できるコマンドは常に 1 つです。`&mut self` レシーバがこれを
//! コンパイル時に保証します。

use std::collections::HashMap;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::{sleep, timeout as tokio_timeout};

use crate::commands::Command;
use crate::config::config as global_config;
use crate::device::DeviceClass;
use crate::endpoint::ConnectionTarget;
use crate::error::Melsec1eError;
use crate::frame::{build_request, parse_response, CountByteOrder};

/// Owns at most one TCP connection to an adapter plus the per-instance
/// count-byte-order cache. Scoped to the instance on purpose: two sessions
/// talking to differently-configured adapters must not share discoveries.
pub struct Session {
    target: ConnectionTarget,
    stream: Option<TcpStream>,
    points_mode: HashMap<(Command, DeviceClass), CountByteOrder>,
}

impl Session {
    #[must_use]
    pub fn new(target: ConnectionTarget) -> Self {
        Self {
            target,
            stream: None,
            points_mode: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn target(&self) -> &ConnectionTarget {
        &self.target
    }

    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Resolved count byte order for a (command, device) pair, if any.
    #[must_use]
    pub fn cached_count_order(
        &self,
        command: Command,
        device: DeviceClass,
    ) -> Option<CountByteOrder> {
        self.points_mode.get(&(command, device)).copied()
    }

    /// Open the TCP connection. Idempotent: a no-op while already connected.
    /// Retries a bounded number of times with a fixed backoff.
    ///
    /// # Errors
    ///
    /// Returns `Melsec1eError::Connection` when all attempts fail.
    pub async fn connect(&mut self) -> Result<(), Melsec1eError> {
        if self.stream.is_some() {
            return Ok(());
        }
        let mut last_err: Option<String> = None;
        for attempt in 1..=self.target.connect_retries.max(1) {
            match tokio_timeout(
                self.target.connect_timeout,
                TcpStream::connect(&self.target.addr),
            )
            .await
            {
                Ok(Ok(stream)) => {
                    log::debug!("[1E] connected to {} (attempt {attempt})", self.target.addr);
                    self.stream = Some(stream);
                    return Ok(());
                }
                Ok(Err(e)) => last_err = Some(e.to_string()),
                Err(_) => last_err = Some("connect attempt timed out".to_string()),
            }
            if attempt < self.target.connect_retries {
                sleep(self.target.connect_backoff).await;
            }
        }
        Err(Melsec1eError::Connection(format!(
            "connect to {} failed after {} attempts: {}",
            self.target.addr,
            self.target.connect_retries.max(1),
            last_err.unwrap_or_default()
        )))
    }

    /// Release the socket. The session stays usable; the next command
    /// reconnects.
    pub async fn close(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
    }

    /// Run one command against the adapter and return the decoded payload.
    ///
    /// Resolves the count-field byte order on first use of a
    /// (command, device) pair: the big-endian encoding is tried first, then
    /// the swapped one; the first encoding the adapter answers with end
    /// code "00" is cached for the rest of the session. A cached mode that
    /// later fails with anything but a timeout is assumed stale, evicted
    /// and rediscovered instead of surfacing the failure.
    pub async fn execute(
        &mut self,
        command: Command,
        device: DeviceClass,
        head: u32,
        count: u16,
        data_field: Option<&str>,
    ) -> Result<String, Melsec1eError> {
        let key = (command, device);
        if let Some(&mode) = self.points_mode.get(&key) {
            let frame = build_request(command, device, head, count, data_field, mode)?;
            let res = self.exchange(&frame).await.and_then(|rx| parse_response(&rx));
            match res {
                Ok(payload) => return Ok(payload),
                // adapter silent: byte-order knowledge is not suspect
                Err(e @ Melsec1eError::Timeout) => return Err(e),
                Err(e) => {
                    log::warn!(
                        "[1E] cached count order {mode:?} failed for {cmd}/{dev}: {e}; rediscovering",
                        cmd = command.as_str(),
                        dev = device.symbol()
                    );
                    self.points_mode.remove(&key);
                }
            }
        }

        let mut last_err: Option<Melsec1eError> = None;
        for mode in [CountByteOrder::BigEndian, CountByteOrder::Swapped] {
            let frame = build_request(command, device, head, count, data_field, mode)?;
            match self.exchange(&frame).await.and_then(|rx| parse_response(&rx)) {
                Ok(payload) => {
                    self.points_mode.insert(key, mode);
                    return Ok(payload);
                }
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            Melsec1eError::Connection("no count encoding produced a response".into())
        }))
    }

    /// One send/receive cycle with a single reconnect-and-resend on
    /// transport failure. A second failure propagates: persistent read
    /// timeouts stay `Timeout`, everything else becomes `Connection`.
    async fn exchange(&mut self, frame: &str) -> Result<String, Melsec1eError> {
        self.connect().await?;
        match self.send_and_recv(frame).await {
            Ok(rx) => Ok(rx),
            Err(first) => {
                log::warn!(
                    "[1E] transport failure on {} ({first}), reconnecting once",
                    self.target.addr
                );
                self.close().await;
                self.connect().await?;
                match self.send_and_recv(frame).await {
                    Ok(rx) => Ok(rx),
                    Err(retry) => {
                        self.close().await;
                        Err(match retry {
                            Melsec1eError::Timeout => Melsec1eError::Timeout,
                            Melsec1eError::Io(e) => Melsec1eError::Connection(format!(
                                "{addr}: {e}",
                                addr = self.target.addr
                            )),
                            other => other,
                        })
                    }
                }
            }
        }
    }

    async fn send_and_recv(&mut self, frame: &str) -> Result<String, Melsec1eError> {
        let cfg = global_config();
        let stream = self
            .stream
            .as_mut()
            .ok_or_else(|| Melsec1eError::Connection("not connected".into()))?;

        if cfg.log_1e_payloads {
            log::debug!("[1E TX] {frame}");
        }
        stream.write_all(frame.as_bytes()).await?;

        let mut buf: Vec<u8> = Vec::new();
        let mut tmp = [0u8; 4096];

        // first chunk must arrive within the per-command deadline
        match tokio_timeout(self.target.timeout, stream.read(&mut tmp)).await {
            Ok(Ok(0)) => {
                return Err(Melsec1eError::Connection(
                    "peer closed before replying".into(),
                ))
            }
            Ok(Ok(n)) => buf.extend_from_slice(&tmp[..n]),
            Ok(Err(e)) => return Err(e.into()),
            Err(_) => return Err(Melsec1eError::Timeout),
        }

        // linger briefly to absorb trailing segments, stopping on a quiet
        // interval or peer close
        let linger = Duration::from_millis(cfg.melsec1e_linger_ms);
        loop {
            match tokio_timeout(linger, stream.read(&mut tmp)).await {
                Ok(Ok(0)) => break,
                Ok(Ok(n)) => buf.extend_from_slice(&tmp[..n]),
                Ok(Err(e)) => return Err(e.into()),
                Err(_) => break,
            }
        }

        let rx = ascii_text(&buf);
        if cfg.log_1e_payloads {
            log::debug!("[1E RX] {rx}");
        }
        if rx.is_empty() {
            if cfg.melsec1e_dump_on_error {
                log::error!("[1E ERROR] empty/non-ASCII reply, {n} raw bytes", n = buf.len());
            }
            return Err(Melsec1eError::Connection(
                "empty ASCII response from adapter".into(),
            ));
        }
        Ok(rx)
    }
}

/// Decode received bytes as ASCII text, dropping non-ASCII bytes and
/// trimming surrounding whitespace/control characters.
fn ascii_text(buf: &[u8]) -> String {
    let text: String = buf
        .iter()
        .copied()
        .filter(u8::is_ascii)
        .map(char::from)
        .collect();
    text.trim_matches(|c: char| c.is_ascii_whitespace() || c.is_ascii_control())
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::ascii_text;

    #[test]
    fn ascii_text_strips_noise() {
        assert_eq!(ascii_text(b"8100000A\r\n"), "8100000A");
        assert_eq!(ascii_text(&[0xFFu8, b'8', b'1', b'0', b'0', 0x00]), "8100");
        assert_eq!(ascii_text(b""), "");
    }
}
