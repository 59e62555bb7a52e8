//! melsec_1e_mock
//!
//! A互換1E (ASCII) アダプタのモック実装です。
//!
//! `melsec_1e` クライアントのローカルテスト用に、1E ASCII フレームを
//! 話す小さな TCP サーバを提供します。実機で観測されるファームウェア
//! 差 (点数フィールドのバイトオーダー) や異常系 (エラー終了コード、
//! 応答遅延、RST 切断) を再現できます。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use melsec_1e::frame::{parse_request, CountByteOrder, ParsedRequest};
use melsec_1e::{Command, DeviceClass};

pub const BIT_BANK_SIZE: usize = 256;
pub const WORD_BANK_SIZE: usize = 512;

/// End code for frames the mock cannot parse at all.
pub const END_CODE_BAD_FRAME: &str = "60";
/// End code for a count/range the mock rejects (also what a real adapter
/// reports when the count field arrives in the byte order it doesn't speak).
pub const END_CODE_BAD_RANGE: &str = "57";

/// Which count-field byte orders the mock accepts, mirroring the firmware
/// variants seen on real adapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptedOrder {
    BigEndian,
    Swapped,
    Either,
}

#[derive(Debug, Clone)]
struct Behavior {
    accepted_order: AcceptedOrder,
    forced_end_code: Option<String>,
    raw_reply: Option<String>,
    truncate_payload: Option<usize>,
    response_delay: Option<Duration>,
    reset_next: bool,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            accepted_order: AcceptedOrder::Either,
            forced_end_code: None,
            raw_reply: None,
            truncate_payload: None,
            response_delay: None,
            reset_next: false,
        }
    }
}

#[derive(Debug)]
struct DeviceMemory {
    x_bits: Vec<bool>,
    y_bits: Vec<bool>,
    d_words: Vec<u16>,
}

impl Default for DeviceMemory {
    fn default() -> Self {
        Self {
            x_bits: vec![false; BIT_BANK_SIZE],
            y_bits: vec![false; BIT_BANK_SIZE],
            d_words: vec![0; WORD_BANK_SIZE],
        }
    }
}

/// Seed entry for initial device memory, loadable from a TOML fixture.
#[derive(Debug, Deserialize)]
pub struct Seed {
    pub device: DeviceClass,
    pub head: u32,
    #[serde(default)]
    pub words: Vec<u16>,
    #[serde(default)]
    pub bits: Vec<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MemoryFixture {
    #[serde(rename = "seed", default)]
    pub seeds: Vec<Seed>,
}

struct Inner {
    memory: Mutex<DeviceMemory>,
    behavior: Mutex<Behavior>,
    frames_served: AtomicUsize,
    last_request: Mutex<Option<String>>,
}

/// Mock 1E ASCII adapter. Cheap to clone; all clones share state, so tests
/// can keep one handle for assertions while a listener task serves another.
#[derive(Clone)]
pub struct MockServer {
    inner: Arc<Inner>,
}

impl Default for MockServer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockServer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                memory: Mutex::new(DeviceMemory::default()),
                behavior: Mutex::new(Behavior::default()),
                frames_served: AtomicUsize::new(0),
                last_request: Mutex::new(None),
            }),
        }
    }

    #[must_use]
    pub fn with_accepted_order(self, order: AcceptedOrder) -> Self {
        self.set_accepted_order(order);
        self
    }

    // --- behavior knobs (shared across clones) ---

    pub fn set_accepted_order(&self, order: AcceptedOrder) {
        self.inner.behavior.lock().unwrap().accepted_order = order;
    }

    /// Reply to every request with this end code (and no payload) until
    /// cleared with `None`.
    pub fn force_end_code(&self, end_code: Option<&str>) {
        self.inner.behavior.lock().unwrap().forced_end_code = end_code.map(str::to_string);
    }

    /// Reply with this exact text verbatim until cleared with `None`.
    pub fn force_raw_reply(&self, reply: Option<&str>) {
        self.inner.behavior.lock().unwrap().raw_reply = reply.map(str::to_string);
    }

    /// Truncate every successful payload to at most `chars` characters.
    pub fn truncate_payload(&self, chars: Option<usize>) {
        self.inner.behavior.lock().unwrap().truncate_payload = chars;
    }

    /// Sleep this long before every reply until cleared with `None`.
    pub fn set_response_delay(&self, delay: Option<Duration>) {
        self.inner.behavior.lock().unwrap().response_delay = delay;
    }

    /// Abort the connection with an RST instead of answering the next
    /// request. One-shot: cleared once consumed.
    pub fn inject_reset_next(&self) {
        self.inner.behavior.lock().unwrap().reset_next = true;
    }

    // --- observation hooks for tests ---

    #[must_use]
    pub fn frames_served(&self) -> usize {
        self.inner.frames_served.load(Ordering::SeqCst)
    }

    /// Raw text of the most recent request frame.
    #[must_use]
    pub fn last_request(&self) -> Option<String> {
        self.inner.last_request.lock().unwrap().clone()
    }

    #[must_use]
    pub fn word_at(&self, head: usize) -> u16 {
        self.inner.memory.lock().unwrap().d_words[head]
    }

    #[must_use]
    pub fn y_bit_at(&self, head: usize) -> bool {
        self.inner.memory.lock().unwrap().y_bits[head]
    }

    // --- memory seeding ---

    pub fn load_words(&self, head: usize, values: &[u16]) {
        let mut mem = self.inner.memory.lock().unwrap();
        mem.d_words[head..head + values.len()].copy_from_slice(values);
    }

    pub fn load_x_bits(&self, head: usize, values: &[bool]) {
        let mut mem = self.inner.memory.lock().unwrap();
        mem.x_bits[head..head + values.len()].copy_from_slice(values);
    }

    pub fn load_y_bits(&self, head: usize, values: &[bool]) {
        let mut mem = self.inner.memory.lock().unwrap();
        mem.y_bits[head..head + values.len()].copy_from_slice(values);
    }

    pub fn apply_fixture(&self, fixture: &MemoryFixture) {
        for seed in &fixture.seeds {
            let head = seed.head as usize;
            match seed.device {
                DeviceClass::WordRegister => self.load_words(head, &seed.words),
                DeviceClass::BitInput => self.load_x_bits(head, &seed.bits),
                DeviceClass::BitOutput => self.load_y_bits(head, &seed.bits),
            }
        }
    }

    /// Accept loop: serve every connection on `listener` until the task is
    /// dropped or the listener errors.
    pub async fn run_listener_on(&self, listener: TcpListener) -> anyhow::Result<()> {
        loop {
            let (stream, peer) = listener.accept().await?;
            tracing::debug!(%peer, "mock: accepted connection");
            let server = self.clone();
            tokio::spawn(async move {
                if let Err(e) = server.serve_conn(stream).await {
                    tracing::debug!("mock: connection ended: {e}");
                }
            });
        }
    }

    async fn serve_conn(&self, mut stream: TcpStream) -> anyhow::Result<()> {
        let mut tmp = [0u8; 4096];
        loop {
            let n = stream.read(&mut tmp).await?;
            if n == 0 {
                return Ok(());
            }
            let rx = String::from_utf8_lossy(&tmp[..n]).trim().to_string();
            self.inner.frames_served.fetch_add(1, Ordering::SeqCst);
            *self.inner.last_request.lock().unwrap() = Some(rx.clone());

            let (behavior, reset) = {
                let mut b = self.inner.behavior.lock().unwrap();
                let reset = b.reset_next;
                b.reset_next = false;
                (b.clone(), reset)
            };
            if let Some(delay) = behavior.response_delay {
                tokio::time::sleep(delay).await;
            }
            if reset {
                tracing::debug!("mock: injecting RST");
                return reset_connection(stream);
            }

            let reply = if let Some(raw) = &behavior.raw_reply {
                raw.clone()
            } else {
                self.handle_request(&rx, &behavior)
            };
            tracing::trace!(%rx, %reply, "mock: exchange");
            stream.write_all(reply.as_bytes()).await?;
        }
    }

    fn handle_request(&self, rx: &str, behavior: &Behavior) -> String {
        let req = match parse_request(rx) {
            Ok(req) => req,
            Err(e) => {
                tracing::debug!("mock: unparseable request ({e}): {rx}");
                return format!("00{END_CODE_BAD_FRAME}");
            }
        };
        let subheader = format!("{:02X}", req.command.code() | 0x80);

        if let Some(code) = &behavior.forced_end_code {
            return format!("{subheader}{code}");
        }

        let Some(count) = resolve_count(&req, behavior.accepted_order) else {
            return format!("{subheader}{END_CODE_BAD_RANGE}");
        };

        match self.execute(&req, count) {
            Some(mut payload) => {
                if let Some(max) = behavior.truncate_payload {
                    payload.truncate(max);
                }
                format!("{subheader}00{payload}")
            }
            None => format!("{subheader}{END_CODE_BAD_RANGE}"),
        }
    }

    fn execute(&self, req: &ParsedRequest, count: u16) -> Option<String> {
        let mut mem = self.inner.memory.lock().unwrap();
        let head = req.head as usize;
        let count = count as usize;
        match (req.command, req.device) {
            (Command::ReadBits, DeviceClass::BitInput | DeviceClass::BitOutput) => {
                let bank = bit_bank(&mut mem, req.device);
                let mut payload: String = bank[head..head + count]
                    .iter()
                    .map(|&b| if b { '1' } else { '0' })
                    .collect();
                if count % 2 == 1 {
                    payload.push('0'); // alignment pad, like real hardware
                }
                Some(payload)
            }
            (Command::WriteBits, DeviceClass::BitOutput) => {
                let values: Vec<bool> = req.data.chars().take(count).map(|c| c == '1').collect();
                mem.y_bits[head..head + count].copy_from_slice(&values);
                Some(String::new())
            }
            (Command::ReadWords, DeviceClass::WordRegister) => Some(
                mem.d_words[head..head + count]
                    .iter()
                    .map(|v| format!("{v:04X}"))
                    .collect(),
            ),
            (Command::WriteWords, DeviceClass::WordRegister) => {
                for i in 0..count {
                    let chunk = &req.data[i * 4..i * 4 + 4];
                    mem.d_words[head + i] = u16::from_str_radix(chunk, 16).ok()?;
                }
                Some(String::new())
            }
            _ => None, // command/device pairing the adapter rejects
        }
    }
}

fn bit_bank(mem: &mut DeviceMemory, device: DeviceClass) -> &mut Vec<bool> {
    match device {
        DeviceClass::BitInput => &mut mem.x_bits,
        _ => &mut mem.y_bits,
    }
}

/// Decode the count field under the accepted order(s), keeping the first
/// interpretation that validates against the request. Rejecting the other
/// byte order falls out naturally: decoded under the wrong order the count
/// lands outside the bank or disagrees with the data length.
fn resolve_count(req: &ParsedRequest, accepted: AcceptedOrder) -> Option<u16> {
    let orders: &[CountByteOrder] = match accepted {
        AcceptedOrder::BigEndian => &[CountByteOrder::BigEndian],
        AcceptedOrder::Swapped => &[CountByteOrder::Swapped],
        AcceptedOrder::Either => &[CountByteOrder::BigEndian, CountByteOrder::Swapped],
    };
    orders
        .iter()
        .filter_map(|order| order.decode_count(&req.count_field).ok())
        .find(|&count| validate(req, count))
}

/// Check a decoded count against the request shape and bank bounds.
fn validate(req: &ParsedRequest, count: u16) -> bool {
    if count == 0 {
        return false;
    }
    let head = req.head as usize;
    let count = count as usize;
    match req.command {
        Command::ReadBits => req.data.is_empty() && head + count <= BIT_BANK_SIZE,
        Command::WriteBits => {
            let padded = count + count % 2;
            head + count <= BIT_BANK_SIZE && req.data.len() == padded
        }
        Command::ReadWords => req.data.is_empty() && head + count <= WORD_BANK_SIZE,
        Command::WriteWords => head + count <= WORD_BANK_SIZE && req.data.len() == count * 4,
    }
}

/// Drop the connection with SO_LINGER=0 so the peer sees an RST instead of
/// an orderly FIN.
fn reset_connection(stream: TcpStream) -> anyhow::Result<()> {
    let std_stream = stream.into_std()?;
    let sock = socket2::Socket::from(std_stream);
    sock.set_linger(Some(Duration::from_secs(0)))?;
    drop(sock);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_d_frame(count_field: &str) -> String {
        format!("01FF000A442000000000{count_field}")
    }

    #[test]
    fn serves_word_read_in_big_endian_mode() {
        let server = MockServer::new().with_accepted_order(AcceptedOrder::BigEndian);
        server.load_words(0, &[10, 11, 12]);
        let behavior = server.inner.behavior.lock().unwrap().clone();
        let reply = server.handle_request(&read_d_frame("0003"), &behavior);
        assert_eq!(reply, "8100000A000B000C");
    }

    #[test]
    fn rejects_swapped_count_in_big_endian_mode() {
        let server = MockServer::new().with_accepted_order(AcceptedOrder::BigEndian);
        let behavior = server.inner.behavior.lock().unwrap().clone();
        // count 3 in swapped order decodes big-endian as 0x0300 = 768 words
        let reply = server.handle_request(&read_d_frame("0300"), &behavior);
        assert_eq!(reply, format!("81{END_CODE_BAD_RANGE}"));
    }

    #[test]
    fn bit_read_pads_odd_counts() {
        let server = MockServer::new();
        server.load_y_bits(0, &[true, false, true]);
        let behavior = server.inner.behavior.lock().unwrap().clone();
        let reply = server.handle_request("00FF000A5920000000000003", &behavior);
        assert_eq!(reply, "80001010");
    }

    #[test]
    fn unparseable_frame_gets_bad_frame_code() {
        let server = MockServer::new();
        let behavior = server.inner.behavior.lock().unwrap().clone();
        let reply = server.handle_request("zzzz", &behavior);
        assert_eq!(reply, format!("00{END_CODE_BAD_FRAME}"));
    }
}
