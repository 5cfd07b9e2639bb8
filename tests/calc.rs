use std::io::{BufRead, BufReader, Write};
use std::net::SocketAddr;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use calc_rpc::{
    CalcClient, Error, OperationTable, Request, Response, ServerConfig, ServerInstance, Status,
    TcpServer,
};

const STOP_LIMIT: Duration = Duration::from_secs(5);

/// stop the server on another thread, fail if that takes too long
fn stop_within(server: ServerInstance, limit: Duration) -> bool {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        drop(server);
        tx.send(()).ok();
    });
    rx.recv_timeout(limit).is_ok()
}

/// a running server that is stopped, with a time limit, when dropped
struct Running(Option<ServerInstance>);

impl Drop for Running {
    fn drop(&mut self) {
        if let Some(server) = self.0.take() {
            let stopped = stop_within(server, STOP_LIMIT);
            if !thread::panicking() {
                assert!(stopped, "server did not stop within {STOP_LIMIT:?}");
            }
        }
    }
}

fn start_server() -> (Running, SocketAddr) {
    let _ = env_logger::builder().is_test(true).try_init();
    let server = OperationTable::standard()
        .start(("127.0.0.1", 0))
        .unwrap();
    let addr = server.local_addr().unwrap();
    (Running(Some(server)), addr)
}

fn line(rsp: Response) -> String {
    rsp.to_string()
}

#[test]
fn addition() {
    let (_server, addr) = start_server();
    let mut client = CalcClient::connect(addr).unwrap();

    let rsp = client.call_raw("add", "3", "4").unwrap();
    assert_eq!(rsp.status(), Status::Ok);
    assert_eq!(rsp.result(), Some(7));
    assert_eq!(line(rsp), "Addition = 7");
}

#[test]
fn every_operation_has_its_label() {
    let (_server, addr) = start_server();
    let mut client = CalcClient::connect(addr).unwrap();

    assert_eq!(line(client.call("sub", 3, 4).unwrap()), "Subtraction = -1");
    assert_eq!(line(client.call("MUL", 6, -7).unwrap()), "Multiplication = -42");
    assert_eq!(line(client.call("Div", -7, 2).unwrap()), "Division = -3");
    assert_eq!(
        line(client.call("add", i32::MAX, 1).unwrap()),
        format!("Addition = {}", i32::MIN)
    );
}

#[test]
fn division_by_zero_keeps_connection() {
    let (_server, addr) = start_server();
    let mut client = CalcClient::connect(addr).unwrap();

    let rsp = client.call_raw("div", "10", "0").unwrap();
    assert_eq!(rsp.status(), Status::Fault);
    assert_eq!(rsp.fault_reason(), Some("Division by zero error"));

    assert_eq!(line(client.call("div", 10, 2).unwrap()), "Division = 5");
}

#[test]
fn unknown_operation_keeps_connection() {
    let (_server, addr) = start_server();
    let mut client = CalcClient::connect(addr).unwrap();

    let rsp = client.call_raw("mod", "3", "4").unwrap();
    assert_eq!(rsp.fault_reason(), Some("Unknown operation"));

    assert_eq!(line(client.call("add", 1, 1).unwrap()), "Addition = 2");
}

#[test]
fn malformed_request_keeps_connection() {
    let (_server, addr) = start_server();
    let mut client = CalcClient::connect(addr).unwrap();

    let rsp = client.call_raw("add", "x", "4").unwrap();
    assert_eq!(rsp.fault_reason(), Some("Malformed request"));
    let rsp = client.call_raw("a+b", "1", "4").unwrap();
    assert_eq!(rsp.fault_reason(), Some("Malformed request"));
    let rsp = client.call_raw("add", "1", "99999999999").unwrap();
    assert_eq!(rsp.fault_reason(), Some("Malformed request"));

    assert_eq!(line(client.call("add", 3, 4).unwrap()), "Addition = 7");
}

#[test]
fn repeated_calls_are_idempotent() {
    let (_server, addr) = start_server();
    let mut client = CalcClient::connect(addr).unwrap();

    let first = client.call("mul", 12, 12).unwrap();
    for _ in 0..20 {
        assert_eq!(client.call("mul", 12, 12).unwrap(), first);
    }
}

#[test]
fn concurrent_clients_are_independent() {
    let (_server, addr) = start_server();

    let workers: Vec<_> = (0..4)
        .map(|id: i32| {
            thread::spawn(move || {
                let mut client = CalcClient::connect(addr).unwrap();
                for i in 0..50 {
                    let a = id * 1000 + i;
                    assert_eq!(client.call("add", a, id).unwrap().result(), Some(a + id));
                    if i % 7 == 0 {
                        let rsp = client.call("div", a, 0).unwrap();
                        assert_eq!(rsp.fault_reason(), Some("Division by zero error"));
                    }
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }
}

#[test]
fn slow_client_does_not_block_others() {
    let (_server, addr) = start_server();

    // leaves a request half written
    let mut stalled = std::net::TcpStream::connect(addr).unwrap();
    stalled.write_all(b"add\n3\n").unwrap();

    let mut client = CalcClient::connect(addr).unwrap();
    assert_eq!(line(client.call("add", 3, 4).unwrap()), "Addition = 7");

    stalled.write_all(b"5\n").unwrap();
    let mut reader = BufReader::new(stalled);
    let mut answer = String::new();
    reader.read_line(&mut answer).unwrap();
    assert_eq!(answer, "Addition = 8\n");
}

#[test]
fn disconnect_mid_request_only_ends_that_session() {
    let (_server, addr) = start_server();

    {
        let mut raw = std::net::TcpStream::connect(addr).unwrap();
        raw.write_all(b"div\n10").unwrap();
    }

    let mut client = CalcClient::connect(addr).unwrap();
    assert_eq!(line(client.call("div", 10, 3).unwrap()), "Division = 3");
}

#[test]
fn crlf_frames_are_accepted() {
    let (_server, addr) = start_server();

    let mut raw = std::net::TcpStream::connect(addr).unwrap();
    raw.write_all(b"SUB\r\n10\r\n4\r\n").unwrap();
    let mut reader = BufReader::new(raw);
    let mut answer = String::new();
    reader.read_line(&mut answer).unwrap();
    assert_eq!(answer, "Subtraction = 6\n");
}

#[test]
fn unframeable_field_is_refused_locally() {
    let (_server, addr) = start_server();
    let mut client = CalcClient::connect(addr).unwrap();

    assert!(matches!(
        client.call_raw("add\n1", "2", "3"),
        Err(Error::InvalidField(_))
    ));
    // nothing was sent, the connection is still in step
    assert_eq!(line(client.call("add", 2, 3).unwrap()), "Addition = 5");
}

#[test]
fn parsed_requests_are_sent_as_three_frames() {
    let (_server, addr) = start_server();
    let mut client = CalcClient::connect(addr).unwrap();

    let req = Request::parse("DIV", "-9", "2").unwrap();
    assert_eq!(line(client.call_request(&req).unwrap()), "Division = -4");
    let req = Request::parse("div", "1", "0").unwrap();
    assert_eq!(
        client.call_request(&req).unwrap().fault_reason(),
        Some("Division by zero error")
    );
}

#[test]
fn custom_operations_are_served() {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut table = OperationTable::standard();
    table
        .register("max", "Maximum", |a, b| Ok(a.max(b)))
        .unwrap();
    let server = Running(Some(table.start(("127.0.0.1", 0)).unwrap()));
    let addr = server.0.as_ref().and_then(|s| s.local_addr()).unwrap();
    let mut client = CalcClient::connect(addr).unwrap();

    assert_eq!(line(client.call("MAX", 3, 9).unwrap()), "Maximum = 9");
    assert_eq!(line(client.call("add", 3, 9).unwrap()), "Addition = 12");
}

#[test]
fn port_in_use_is_a_bind_error() {
    let (_server, addr) = start_server();
    let second = OperationTable::standard().start(addr);
    assert!(matches!(second, Err(Error::Bind { .. })));
}

#[test]
fn unresolvable_host_is_reported() {
    assert!(matches!(
        CalcClient::connect(("no such host .invalid", 3000)),
        Err(Error::Resolve(_))
    ));
}

#[test]
fn idle_session_is_closed() {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = ServerConfig {
        port: 0,
        idle_timeout: Some(Duration::from_millis(100)),
        ..ServerConfig::default()
    };
    let server = OperationTable::standard()
        .start_with_config(&config)
        .unwrap();
    let addr = server.local_addr().unwrap();
    let _server = Running(Some(server));

    let mut client = CalcClient::connect(addr).unwrap();
    assert_eq!(line(client.call("add", 1, 2).unwrap()), "Addition = 3");

    thread::sleep(Duration::from_millis(500));
    assert!(client.call("add", 1, 2).is_err());
    assert!(matches!(client.call("add", 1, 2), Err(Error::Closed)));

    // the listener itself keeps serving
    let mut client = CalcClient::connect(addr).unwrap();
    assert_eq!(line(client.call("add", 2, 2).unwrap()), "Addition = 4");
}

#[test]
fn client_timeout_is_reported() {
    let _ = env_logger::try_init();
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    // accepts but never answers
    let silent = thread::spawn(move || listener.accept().map(|(s, _)| s));

    let mut client = CalcClient::connect(addr).unwrap();
    client.set_timeout(Duration::from_millis(100)).unwrap();
    assert!(matches!(client.call("add", 1, 2), Err(Error::Timeout)));
    assert!(matches!(client.call("add", 1, 2), Err(Error::Closed)));
    drop(silent.join());
}

#[test]
fn stopped_server_ends_sessions() {
    let (server, addr) = start_server();
    let mut client = CalcClient::connect(addr).unwrap();
    assert_eq!(line(client.call("add", 1, 2).unwrap()), "Addition = 3");

    drop(server);
    assert!(client.call("add", 1, 2).is_err());
}

#[test]
fn stop_with_connected_clients_finishes() {
    let _ = env_logger::builder().is_test(true).try_init();
    let config = ServerConfig {
        port: 0,
        idle_timeout: Some(Duration::from_secs(60)),
        ..ServerConfig::default()
    };
    let server = OperationTable::standard()
        .start_with_config(&config)
        .unwrap();
    let addr = server.local_addr().unwrap();

    // one client mid conversation, one that never sent anything,
    // one stalled inside a request
    let mut busy = CalcClient::connect(addr).unwrap();
    assert_eq!(line(busy.call("add", 3, 4).unwrap()), "Addition = 7");
    let _quiet = CalcClient::connect(addr).unwrap();
    let mut stalled = std::net::TcpStream::connect(addr).unwrap();
    stalled.write_all(b"mul\n").unwrap();
    // the listener has picked up every connection once this call returns
    let mut last = CalcClient::connect(addr).unwrap();
    assert_eq!(line(last.call("sub", 3, 4).unwrap()), "Subtraction = -1");

    assert!(stop_within(server, STOP_LIMIT), "server kept running");
    assert!(busy.call("add", 3, 4).is_err());
    assert!(last.call("add", 3, 4).is_err());
    assert!(CalcClient::connect(addr)
        .and_then(|mut c| c.call("add", 1, 1))
        .is_err());
}

#[cfg(unix)]
#[test]
fn unix_socket_listener() {
    use calc_rpc::UdsServer;
    use may::os::unix::net::UnixStream;

    let _ = env_logger::builder().is_test(true).try_init();
    let path = std::env::temp_dir().join(format!("calc_rpc_{}.sock", std::process::id()));
    let server = UdsServer::start(OperationTable::standard(), &path).unwrap();

    let mut client = CalcClient::new(UnixStream::connect(&path).unwrap());
    assert_eq!(line(client.call("mul", 6, 7).unwrap()), "Multiplication = 42");
    assert_eq!(
        client.call_raw("div", "1", "0").unwrap().fault_reason(),
        Some("Division by zero error")
    );

    assert!(stop_within(server, STOP_LIMIT), "server kept running");
    assert!(client.call("add", 1, 1).is_err());
    assert!(!path.exists());
}
