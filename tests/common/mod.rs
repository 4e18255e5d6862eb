//! Fake target shared by the end-to-end tests.

#![allow(dead_code)]

use cascades::Config;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

/// Config pointing at a local port
pub fn config_for(port: u16) -> Config {
    let mut config = Config::default();
    config.connection.host = "127.0.0.1".to_string();
    config.connection.port = port;
    config.connection.connect_timeout_secs = 5;
    config
}

/// Accept one connection, send `welcome`, then answer each received line
/// with the next reply. Hangs up once the replies run out and returns the
/// lines it received.
pub async fn spawn_target(
    welcome: &'static str,
    replies: Vec<&'static str>,
) -> (u16, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        write_half.write_all(welcome.as_bytes()).await.unwrap();

        let mut received = Vec::new();
        for reply in replies {
            let mut line = String::new();
            if reader.read_line(&mut line).await.unwrap() == 0 {
                break;
            }
            received.push(line);
            write_half.write_all(reply.as_bytes()).await.unwrap();
        }
        received
    });

    (port, handle)
}

/// Accept one connection and stream `lines` once `record\r\n` arrives
pub async fn spawn_recording_target(lines: Vec<&'static str>) -> (u16, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        write_half.write_all(b"Harness target ready\r\n").await.unwrap();

        let mut request = String::new();
        reader.read_line(&mut request).await.unwrap();
        write_half.write_all(b"OK recording\r\n").await.unwrap();
        for line in lines {
            write_half.write_all(line.as_bytes()).await.unwrap();
        }
        write_half.flush().await.unwrap();
        request
    });

    (port, handle)
}
