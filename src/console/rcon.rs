// src/console/rcon.rs
use async_trait::async_trait;
use byteorder::{ByteOrder, LittleEndian};
use log::{debug, info, warn};
use rand::Rng;
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::{ConsoleSession, Connector};
use crate::utils::RequestError;

pub const SERVERDATA_AUTH: i32 = 3;
pub const SERVERDATA_AUTH_RESPONSE: i32 = 2;
pub const SERVERDATA_EXECCOMMAND: i32 = 2;
pub const SERVERDATA_RESPONSE_VALUE: i32 = 0;

/// Servers split long replies into bodies of at most this many bytes.
pub const MAX_FRAGMENT: usize = 4096;

// id + type + two terminating nulls
const PACKET_OVERHEAD: usize = 10;
const MAX_PACKET_LEN: usize = 1 << 20;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    pub id: i32,
    pub kind: i32,
    pub body: Vec<u8>,
}

impl Packet {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

pub fn encode_packet(id: i32, kind: i32, body: &str) -> Vec<u8> {
    let body = body.as_bytes();
    let mut header = [0u8; 12];
    LittleEndian::write_i32(&mut header[0..4], (body.len() + PACKET_OVERHEAD) as i32);
    LittleEndian::write_i32(&mut header[4..8], id);
    LittleEndian::write_i32(&mut header[8..12], kind);

    let mut packet = Vec::with_capacity(header.len() + body.len() + 2);
    packet.extend_from_slice(&header);
    packet.extend_from_slice(body);
    packet.extend_from_slice(&[0x00, 0x00]);
    packet
}

pub async fn read_packet<R: AsyncRead + Unpin>(reader: &mut R) -> io::Result<Packet> {
    let mut length_bytes = [0u8; 4];
    reader.read_exact(&mut length_bytes).await?;
    let length = LittleEndian::read_i32(&length_bytes);

    if length < PACKET_OVERHEAD as i32 || length as usize > MAX_PACKET_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Invalid packet length: {}", length),
        ));
    }

    let mut payload = vec![0u8; length as usize];
    reader.read_exact(&mut payload).await?;

    let id = LittleEndian::read_i32(&payload[0..4]);
    let kind = LittleEndian::read_i32(&payload[4..8]);
    let mut body = payload.split_off(8);
    while body.last() == Some(&0) {
        body.pop();
    }

    Ok(Packet { id, kind, body })
}

/// One authenticated remote-console session.
pub struct RconClient {
    stream: TcpStream,
    next_id: i32,
}

impl RconClient {
    pub async fn connect(host: &str, port: u16, password: &str) -> Result<Self, RequestError> {
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(|e| RequestError::Connection(format!("Failed to connect to {}:{}: {}", host, port, e)))?;

        let mut client = Self {
            stream,
            next_id: initial_id(),
        };
        client.login(password).await?;
        info!("RCON session established with {}:{}", host, port);
        Ok(client)
    }

    fn allocate_id(&mut self) -> i32 {
        let id = self.next_id;
        self.next_id = if self.next_id >= i32::MAX - 1 { 1 } else { self.next_id + 1 };
        id
    }

    async fn write(&mut self, id: i32, kind: i32, body: &str) -> io::Result<()> {
        self.stream.write_all(&encode_packet(id, kind, body)).await?;
        self.stream.flush().await
    }

    async fn login(&mut self, password: &str) -> Result<(), RequestError> {
        let id = self.allocate_id();
        self.write(id, SERVERDATA_AUTH, password).await.map_err(lost)?;

        loop {
            let packet = read_packet(&mut self.stream).await.map_err(lost)?;
            if packet.kind != SERVERDATA_AUTH_RESPONSE {
                // Some servers send an empty RESPONSE_VALUE before the auth result.
                continue;
            }
            if packet.id == -1 {
                warn!("RCON authentication rejected");
                return Err(RequestError::Connection("RCON authentication failed".to_string()));
            }
            if packet.id == id {
                return Ok(());
            }
        }
    }

    async fn run(&mut self, command: &str) -> io::Result<String> {
        let id = self.allocate_id();
        debug!("RCON -> [{}] {}", id, command);
        self.write(id, SERVERDATA_EXECCOMMAND, command).await?;

        let first = loop {
            let packet = read_packet(&mut self.stream).await?;
            if packet.id == id {
                break packet;
            }
            debug!("Skipping stale RCON packet {}", packet.id);
        };

        let mut body = first.body;
        if body.len() >= MAX_FRAGMENT {
            // A full fragment may have followers; the reply to a marker packet ends the sequence.
            let marker = self.allocate_id();
            self.write(marker, SERVERDATA_RESPONSE_VALUE, "").await?;
            loop {
                let packet = read_packet(&mut self.stream).await?;
                if packet.id == marker {
                    break;
                }
                if packet.id == id {
                    body.extend_from_slice(&packet.body);
                }
            }
        }

        let response = String::from_utf8_lossy(&body).into_owned();
        debug!("RCON <- [{}] {} bytes", id, response.len());
        Ok(response)
    }
}

fn initial_id() -> i32 {
    rand::thread_rng().gen_range(1..0x3fff_ffff)
}

fn lost(e: io::Error) -> RequestError {
    RequestError::Connection(format!("Console connection lost: {}", e))
}

#[async_trait]
impl ConsoleSession for RconClient {
    async fn execute(&mut self, command: &str) -> Result<String, RequestError> {
        self.run(command).await.map_err(lost)
    }

    // An idle socket has nothing to peek; a closed one reads EOF right away.
    async fn is_alive(&mut self) -> bool {
        let mut probe = [0u8; 1];
        match tokio::time::timeout(Duration::ZERO, self.stream.peek(&mut probe)).await {
            Ok(Ok(0)) | Ok(Err(_)) => false,
            Ok(Ok(_)) | Err(_) => true,
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.shutdown().await {
            debug!("Error closing RCON stream: {}", e);
        }
    }
}

pub struct RconConnector {
    host: String,
    port: u16,
    password: Option<String>,
}

impl RconConnector {
    pub fn new(host: impl Into<String>, port: u16, password: Option<String>) -> Self {
        Self { host: host.into(), port, password }
    }
}

#[async_trait]
impl Connector for RconConnector {
    async fn connect(&self) -> Result<Box<dyn ConsoleSession>, RequestError> {
        let Some(password) = self.password.as_deref() else {
            return Err(RequestError::Connection("RCON password is not configured".to_string()));
        };
        let client = RconClient::connect(&self.host, self.port, password).await?;
        Ok(Box::new(client))
    }

    fn describe(&self) -> String {
        format!("rcon://{}:{}", self.host, self.port)
    }
}
