//! Web command surface
//!
//! One connection at a time on port 80. `GET /push[?asset]`,
//! `/active?<name>` and `/message?<text>` go through the same command
//! ingress as the bus.

use defmt::*;
use embassy_net::tcp::{Error as TcpError, TcpSocket};
use embassy_net::Stack;
use embassy_time::{Duration, Timer};
use embedded_io_async::Write;

use doorbell_core::{Command, CommandError, Context};

use crate::clock;

/// Listening port
pub const HTTP_PORT: u16 = 80;

/// Longest request head read
const MAX_REQUEST_SIZE: usize = 1024;

#[embassy_executor::task]
pub async fn web_task(ctx: &'static Context, stack: Stack<'static>) {
    info!("Web task started (port={})", HTTP_PORT);

    let mut rx_buf = [0u8; MAX_REQUEST_SIZE];
    let mut tx_buf = [0u8; 256];

    while !ctx.is_stopped() {
        stack.wait_config_up().await;

        let mut socket = TcpSocket::new(stack, &mut rx_buf, &mut tx_buf);
        socket.set_timeout(Some(Duration::from_secs(10)));

        match socket.accept(HTTP_PORT).await {
            Ok(()) => {
                if let Err(e) = handle_connection(ctx, &mut socket).await {
                    warn!("Web connection error: {:?}", e);
                }
                socket.close();
                let _ = socket.flush().await;
            }
            Err(e) => {
                warn!("Web accept error: {:?}", e);
                Timer::after(Duration::from_millis(200)).await;
            }
        }

        socket.abort();
    }

    info!("Web task stopped");
}

async fn handle_connection(ctx: &Context, socket: &mut TcpSocket<'_>) -> Result<(), TcpError> {
    let mut buf = [0u8; MAX_REQUEST_SIZE];
    let mut total = 0usize;

    // Read until the end of the headers or a full buffer
    loop {
        let n = socket.read(&mut buf[total..]).await?;
        if n == 0 {
            break;
        }
        total += n;
        if total >= MAX_REQUEST_SIZE || buf[..total].windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }
    if total == 0 {
        return Ok(());
    }

    let head = core::str::from_utf8(&buf[..total]).unwrap_or("");
    let mut words = head.lines().next().unwrap_or("").split_ascii_whitespace();
    let (status, body) = match (words.next(), words.next()) {
        (Some("GET"), Some(target)) => {
            let (path, query) = match target.split_once('?') {
                Some((path, query)) => (path, Some(query)),
                None => (target, None),
            };
            match Command::from_web(path, query) {
                Ok(command) => {
                    debug!("Web command {=str}", path);
                    ctx.apply(command, clock::now());
                    ("200 OK", "OK\n")
                }
                Err(CommandError::Unknown) => ("404 Not Found", "Not found\n"),
                Err(e) => {
                    ctx.reject(e);
                    ("400 Bad Request", "Bad request\n")
                }
            }
        }
        (Some(_), Some(_)) => ("405 Method Not Allowed", "GET only\n"),
        _ => ("400 Bad Request", "Bad request\n"),
    };

    write_response(socket, status, body).await
}

async fn write_response(
    socket: &mut TcpSocket<'_>,
    status: &str,
    body: &str,
) -> Result<(), TcpError> {
    let mut head = heapless::String::<128>::new();
    let _ = core::fmt::write(
        &mut head,
        format_args!(
            "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status,
            body.len()
        ),
    );
    socket.write_all(head.as_bytes()).await?;
    socket.write_all(body.as_bytes()).await?;
    socket.flush().await
}
