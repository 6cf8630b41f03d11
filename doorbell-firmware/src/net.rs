//! HTTP transport over embassy-net
//!
//! Plain HTTP GET with `If-Modified-Since`. Requests are sent as HTTP/1.0
//! so the server closes the connection after an unchunked body.

use alloc::format;
use alloc::string::ToString;
use alloc::vec;
use alloc::vec::Vec;
use core::cell::Cell;
use core::fmt::Write as _;
use core::net::Ipv4Addr;

use defmt::*;
use embassy_net::dns::DnsQueryType;
use embassy_net::tcp::TcpSocket;
use embassy_net::{IpAddress, Stack};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_time::{with_timeout, Duration};
use embedded_io_async::Write;

use doorbell_core::config::VERSION;
use doorbell_core::traits::{FetchResponse, LinkInfo, Transport, TransportError};

use crate::clock;

/// Whole-request deadline
const FETCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Per-operation socket timeout
const SOCKET_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest response, headers included
pub const MAX_RESPONSE: usize = 160 * 1024;

/// Radio link figures recorded by the WiFi task
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkStats {
    pub channel: u8,
    pub rssi: i16,
}

/// Last link figures, updated on each join
pub static LINK: Mutex<CriticalSectionRawMutex, Cell<LinkStats>> =
    Mutex::new(Cell::new(LinkStats { channel: 0, rssi: 0 }));

/// HTTP client for the content cache
pub struct HttpTransport {
    stack: Stack<'static>,
    ssid: &'static str,
}

impl HttpTransport {
    pub fn new(stack: Stack<'static>, ssid: &'static str) -> Self {
        Self { stack, ssid }
    }

    async fn resolve(&self, host: &str) -> Result<IpAddress, TransportError> {
        if let Ok(ip) = host.parse::<Ipv4Addr>() {
            return Ok(IpAddress::Ipv4(ip));
        }
        let addrs = self
            .stack
            .dns_query(host, DnsQueryType::A)
            .await
            .map_err(|_| TransportError::Connect)?;
        addrs.first().copied().ok_or(TransportError::Connect)
    }

    async fn fetch(
        &mut self,
        url: &str,
        if_modified_since: Option<&str>,
    ) -> Result<FetchResponse, TransportError> {
        let (host, port, path) = split_url(url).ok_or(TransportError::Protocol)?;
        let addr = self.resolve(host).await?;

        let mut rx_buf = vec![0u8; 2048];
        let mut tx_buf = [0u8; 512];
        let mut socket = TcpSocket::new(self.stack, &mut rx_buf, &mut tx_buf);
        socket.set_timeout(Some(SOCKET_TIMEOUT));
        socket.connect((addr, port)).await.map_err(|e| {
            debug!("connect to {=str} failed: {:?}", host, e);
            TransportError::Connect
        })?;

        let mut request = format!(
            "GET {} HTTP/1.0\r\nHost: {}\r\nUser-Agent: doorbell/{}\r\n",
            path, host, VERSION
        );
        if let Some(since) = if_modified_since {
            let _ = write!(request, "If-Modified-Since: {}\r\n", since);
        }
        request.push_str("\r\n");

        socket
            .write_all(request.as_bytes())
            .await
            .map_err(|_| TransportError::Connect)?;
        socket.flush().await.map_err(|_| TransportError::Connect)?;

        let mut response = Vec::new();
        let mut buf = [0u8; 512];
        loop {
            let n = socket.read(&mut buf).await.map_err(|_| TransportError::Connect)?;
            if n == 0 {
                break;
            }
            if response.len() + n > MAX_RESPONSE {
                socket.abort();
                return Err(TransportError::TooLarge);
            }
            response.extend_from_slice(&buf[..n]);
        }
        socket.close();

        parse_response(&response)
    }
}

impl Transport for HttpTransport {
    fn is_online(&self) -> bool {
        self.stack.is_config_up()
    }

    fn link_info(&self) -> LinkInfo {
        let stats = LINK.lock(|link| link.get());
        LinkInfo {
            ssid: self.ssid.into(),
            channel: stats.channel,
            rssi: stats.rssi,
            ipv4: self
                .stack
                .config_v4()
                .map(|c| c.address.address().to_string())
                .unwrap_or_default(),
            ipv6: self
                .stack
                .config_v6()
                .map(|c| c.address.address().to_string())
                .into_iter()
                .collect(),
        }
    }

    async fn get(
        &mut self,
        url: &str,
        if_modified_since: Option<&str>,
    ) -> Result<FetchResponse, TransportError> {
        if !self.is_online() {
            return Err(TransportError::Offline);
        }
        match with_timeout(FETCH_TIMEOUT, self.fetch(url, if_modified_since)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout),
        }
    }
}

/// Split `http://host[:port]/path` into its parts
fn split_url(url: &str) -> Option<(&str, u16, &str)> {
    let rest = url.strip_prefix("http://")?;
    let (authority, path) = match rest.find('/') {
        Some(i) => (&rest[..i], &rest[i..]),
        None => (rest, "/"),
    };
    let (host, port) = match authority.split_once(':') {
        Some((host, port)) => (host, port.parse().ok()?),
        None => (authority, 80),
    };
    (!host.is_empty()).then_some((host, port, path))
}

/// Interpret a complete HTTP response
///
/// A `Date` header sets the wall clock.
fn parse_response(response: &[u8]) -> Result<FetchResponse, TransportError> {
    let split = response
        .windows(4)
        .position(|w| w == b"\r\n\r\n")
        .ok_or(TransportError::Protocol)?;
    let head = core::str::from_utf8(&response[..split]).map_err(|_| TransportError::Protocol)?;
    let body = &response[split + 4..];

    let mut lines = head.split("\r\n");
    let status: u16 = lines
        .next()
        .and_then(|line| line.split_ascii_whitespace().nth(1))
        .and_then(|code| code.parse().ok())
        .ok_or(TransportError::Protocol)?;

    let mut content_length = None;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if name.eq_ignore_ascii_case("date") {
            if let Some(unix) = clock::parse_http_date(value) {
                clock::set_wall(unix);
            }
        } else if name.eq_ignore_ascii_case("content-length") {
            content_length = value.parse::<usize>().ok();
        }
    }

    match status {
        200 => {
            // A short body means the connection dropped mid-transfer
            if content_length.is_some_and(|len| len != body.len()) {
                return Err(TransportError::Protocol);
            }
            Ok(FetchResponse::Ok(body.to_vec()))
        }
        304 => Ok(FetchResponse::NotModified),
        code => Err(TransportError::Status(code)),
    }
}

