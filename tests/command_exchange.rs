use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use kosa::{BaseClient, ClientConfig, Error, TransportError};

fn setup_test_server<F>(server_logic: F) -> (SocketAddr, thread::JoinHandle<()>)
where
    F: FnOnce(TcpStream) + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let local_addr = listener.local_addr().unwrap();

    let handle = thread::spawn(move || {
        if let Ok((stream, _)) = listener.accept() {
            server_logic(stream);
        }
    });

    (local_addr, handle)
}

fn read_command(stream: &mut TcpStream) -> Option<String> {
    let mut buf = [0u8; 1024];
    match stream.read(&mut buf).unwrap() {
        0 => None,
        n => Some(String::from_utf8(buf[..n].to_vec()).unwrap()),
    }
}

fn connect(addr: SocketAddr) -> BaseClient {
    BaseClient::connect(&addr.ip().to_string(), addr.port()).unwrap()
}

#[test]
fn connect_to_closed_port_fails() {
    let err = BaseClient::connect("127.0.0.1", 65531).err().unwrap();

    assert_eq!(err.transport_kind(), Some(TransportError::SocketConnectFailure));
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn connect_with_config_uses_host_and_port() {
    let (addr, server_handle) = setup_test_server(|mut stream| {
        stream.write_all(b"welcome").unwrap();
    });

    let config = ClientConfig::new(addr.ip().to_string(), addr.port());
    let mut client = BaseClient::with_config(&config).unwrap();

    assert_eq!(client.get_message().unwrap().as_deref(), Some("welcome"));
    server_handle.join().unwrap();
}

#[test]
fn non_blocking_receive_returns_immediately_when_idle() {
    let (done_tx, done_rx) = mpsc::channel::<()>();
    let (addr, server_handle) = setup_test_server(move |_stream| {
        let _ = done_rx.recv();
    });

    let mut client = connect(addr);
    let started = Instant::now();

    assert_eq!(client.get_message_non_blocking().unwrap(), None);
    assert!(started.elapsed() < Duration::from_secs(1));

    done_tx.send(()).unwrap();
    server_handle.join().unwrap();
}

#[test]
fn blocking_receive_returns_each_chunk_once() {
    let (next_tx, next_rx) = mpsc::channel::<()>();
    let (addr, server_handle) = setup_test_server(move |mut stream| {
        stream.write_all("first ✓".as_bytes()).unwrap();
        next_rx.recv().unwrap();
        stream.write_all(b"second").unwrap();
    });

    let mut client = connect(addr);

    assert_eq!(client.get_message().unwrap().as_deref(), Some("first ✓"));
    next_tx.send(()).unwrap();
    assert_eq!(client.get_message().unwrap().as_deref(), Some("second"));

    server_handle.join().unwrap();
    assert_eq!(client.get_message().unwrap(), None);
}

#[test]
fn perform_command_returns_echoed_reply() {
    let (tx, rx) = mpsc::channel();
    let (addr, server_handle) = setup_test_server(move |mut stream| {
        let command = read_command(&mut stream).unwrap();
        stream.write_all(command.as_bytes()).unwrap();
        tx.send(command).unwrap();
    });

    let mut client = connect(addr);

    assert_eq!(
        client.perform_command("PING", true).unwrap().as_deref(),
        Some("PING")
    );
    assert_eq!(rx.recv().unwrap(), "PING");

    server_handle.join().unwrap();
}

#[test]
fn perform_command_without_output_does_not_read() {
    let (addr, server_handle) = setup_test_server(|mut stream| {
        let command = read_command(&mut stream).unwrap();
        stream.write_all(format!("{command}-ACK").as_bytes()).unwrap();
        // Hold the connection open until the client hangs up.
        let _ = read_command(&mut stream);
    });

    let mut client = connect(addr);

    assert_eq!(client.perform_command("NOOP", false).unwrap(), None);

    thread::sleep(Duration::from_millis(100));
    // The reply is still sitting in the socket.
    assert_eq!(
        client.get_message_non_blocking().unwrap().as_deref(),
        Some("NOOP-ACK")
    );

    client.close().unwrap();
    server_handle.join().unwrap();
}

#[test]
fn stale_input_is_discarded_before_next_command() {
    let (addr, server_handle) = setup_test_server(|mut stream| {
        assert_eq!(read_command(&mut stream).as_deref(), Some("A"));
        stream.write_all(b"unsolicited broadcast").unwrap();

        assert_eq!(read_command(&mut stream).as_deref(), Some("B"));
        stream.write_all(b"B-ACK").unwrap();
    });

    let mut client = connect(addr);

    assert_eq!(client.perform_command("A", false).unwrap(), None);
    thread::sleep(Duration::from_millis(100));

    assert_eq!(
        client.perform_command("B", true).unwrap().as_deref(),
        Some("B-ACK")
    );

    server_handle.join().unwrap();
}

#[test]
fn hello_bye_session() {
    let (addr, server_handle) = setup_test_server(|mut stream| {
        while let Some(command) = read_command(&mut stream) {
            match command.as_str() {
                "HELLO" => stream.write_all(b"HELLO-ACK").unwrap(),
                "BYE" => break,
                other => panic!("unexpected command {other}"),
            }
        }
    });

    let mut client = connect(addr);

    assert_eq!(client.request("HELLO").unwrap().as_deref(), Some("HELLO-ACK"));
    assert_eq!(client.perform_command("BYE", false).unwrap(), None);

    server_handle.join().unwrap();
}

#[test]
fn invalid_utf8_from_server_is_an_error() {
    let (addr, server_handle) = setup_test_server(|mut stream| {
        stream.write_all(&[0xc3, 0x28]).unwrap();
    });

    let mut client = connect(addr);

    assert!(matches!(client.get_message(), Err(Error::Decode(_))));
    server_handle.join().unwrap();
}
