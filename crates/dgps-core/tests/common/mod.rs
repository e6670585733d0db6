//! Shared fixtures: a scripted receiver and reply frame builders.
#![allow(dead_code)]

use byteorder::{ByteOrder, LittleEndian};
use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use dgps_core::diagnostics::DiagnosticLog;
use dgps_core::protocol::{Channel, Receiver};

/// What the scripted receiver does in answer to one write
#[derive(Debug, Clone)]
pub enum Reply {
    /// Answer with these bytes
    Bytes(Vec<u8>),
    /// Never answer
    Silence,
    /// Close the link
    HangUp,
    /// Accept only this many bytes of the write and stay silent
    ShortWrite(usize),
}

/// Transport that answers each write with the next scripted reply
pub struct ScriptedPort {
    script: VecDeque<Reply>,
    inbound: Vec<u8>,
    hung_up: bool,
    written: Arc<Mutex<Vec<u8>>>,
}

impl ScriptedPort {
    pub fn new(script: Vec<Reply>) -> (Self, Arc<Mutex<Vec<u8>>>) {
        let written = Arc::new(Mutex::new(Vec::new()));
        let port = Self {
            script: script.into(),
            inbound: Vec::new(),
            hung_up: false,
            written: Arc::clone(&written),
        };
        (port, written)
    }
}

impl AsyncWrite for ScriptedPort {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        let accepted = match this.script.pop_front() {
            Some(Reply::Bytes(bytes)) => {
                this.inbound.extend_from_slice(&bytes);
                buf.len()
            }
            Some(Reply::HangUp) => {
                this.hung_up = true;
                buf.len()
            }
            Some(Reply::ShortWrite(n)) => n.min(buf.len()),
            Some(Reply::Silence) | None => buf.len(),
        };
        this.written
            .lock()
            .unwrap()
            .extend_from_slice(&buf[..accepted]);
        Poll::Ready(Ok(accepted))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

impl AsyncRead for ScriptedPort {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if !this.inbound.is_empty() {
            let n = buf.remaining().min(this.inbound.len());
            buf.put_slice(&this.inbound[..n]);
            this.inbound.drain(..n);
            Poll::Ready(Ok(()))
        } else if this.hung_up {
            Poll::Ready(Ok(()))
        } else {
            // Silent line: only the response timer can end the read
            Poll::Pending
        }
    }
}

/// Receiver wired to a scripted port, with a short response timeout
pub fn scripted_receiver(
    script: Vec<Reply>,
) -> (Receiver<ScriptedPort>, Arc<Mutex<Vec<u8>>>, Arc<DiagnosticLog>) {
    let (port, written) = ScriptedPort::new(script);
    let channel = Channel::with_timeout(port, Duration::from_millis(30)).expect("runtime");
    let log = Arc::new(DiagnosticLog::new());
    (Receiver::new(channel, log.clone()), written, log)
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Field values of a position record, angles in semicircles
#[derive(Debug, Clone)]
pub struct RecordFields {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub clock_offset: f64,
    pub frequency_offset: f64,
    pub pdop: f64,
    pub latitude_rate: f64,
    pub longitude_rate: f64,
    pub altitude_rate: f64,
    pub gps_msec_of_week: i32,
    pub position_flags: u8,
    pub satellites: Vec<(u8, u8)>,
}

impl Default for RecordFields {
    fn default() -> Self {
        Self {
            latitude: 0.269_444_444_444_444_4,
            longitude: 0.050_555_555_555_555_6,
            altitude: 312.75,
            clock_offset: -0.125,
            frequency_offset: 2.5,
            pdop: 1.75,
            latitude_rate: 0.0,
            longitude_rate: 0.0,
            altitude_rate: -0.5,
            gps_msec_of_week: 302_400_000,
            position_flags: 0x1f,
            satellites: vec![(1, 5), (2, 12), (3, 29)],
        }
    }
}

impl RecordFields {
    /// Encode the record the way the receiver lays it out on the wire
    pub fn encode(&self) -> Vec<u8> {
        let mut data = vec![0u8; 78];
        let doubles = [
            self.latitude,
            self.longitude,
            self.altitude,
            self.clock_offset,
            self.frequency_offset,
            self.pdop,
            self.latitude_rate,
            self.longitude_rate,
            self.altitude_rate,
        ];
        for (i, value) in doubles.iter().enumerate() {
            LittleEndian::write_f64(&mut data[i * 8..i * 8 + 8], *value);
        }
        LittleEndian::write_i32(&mut data[72..76], self.gps_msec_of_week);
        data[76] = self.position_flags;
        data[77] = self.satellites.len() as u8;
        for &(channel, prn) in &self.satellites {
            data.push(channel);
            data.push(prn);
        }
        data
    }
}

/// Wrap a record into a RAWDATA reply frame
pub fn reply_frame(record: &[u8]) -> Vec<u8> {
    let length = u8::try_from(record.len() + 4).expect("record exceeds the length field");
    let mut frame = vec![0x02, 0x00, 0x57, length, 0x01, 0x11, 0x00, 0x00];
    frame.extend_from_slice(record);
    let sum = frame[1..].iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    frame.push(sum);
    frame.push(0x03);
    frame
}

/// Reply frame with `svs` satellites
pub fn frame_with_satellites(svs: usize) -> Vec<u8> {
    let fields = RecordFields {
        satellites: (0..svs).map(|i| (i as u8, (i + 1) as u8)).collect(),
        ..RecordFields::default()
    };
    reply_frame(&fields.encode())
}
