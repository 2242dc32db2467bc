use core_bridge::{BridgeExchange, BridgeParams, OutputSetpoint, TimeBase, DEFAULT_OUTPUT_STALE_US};
use rotor_io::link::{run_link, LinkConfig};
use rotor_io::wire::CommandFrameMsg;
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

struct LinkUnderTest {
    exchange: Arc<BridgeExchange>,
    timebase: TimeBase,
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<core_bridge::BridgeStats>>,
    addr: String,
}

impl LinkUnderTest {
    fn start() -> Self {
        let probe = TcpListener::bind("127.0.0.1:0").expect("ephemeral bind");
        let addr = format!("127.0.0.1:{}", probe.local_addr().unwrap().port());
        drop(probe);

        let exchange = Arc::new(BridgeExchange::new(DEFAULT_OUTPUT_STALE_US));
        let params = Arc::new(BridgeParams::new());
        let timebase = TimeBase::new();
        let stop = Arc::new(AtomicBool::new(false));

        let handle = {
            let exchange = Arc::clone(&exchange);
            let stop = Arc::clone(&stop);
            let config = LinkConfig { bind_addr: addr.clone() };
            thread::spawn(move || run_link(exchange, params, timebase, config, stop))
        };

        Self {
            exchange,
            timebase,
            stop,
            handle: Some(handle),
            addr,
        }
    }

    fn connect(&self) -> TcpStream {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            match TcpStream::connect(&self.addr) {
                Ok(stream) => {
                    stream
                        .set_read_timeout(Some(Duration::from_millis(200)))
                        .unwrap();
                    return stream;
                }
                Err(_) if Instant::now() < deadline => {
                    thread::sleep(Duration::from_millis(50))
                }
                Err(e) => panic!("link never came up: {}", e),
            }
        }
    }

    fn fresh_setpoint(&self, outputs: [u16; 8]) {
        self.exchange.submit_outputs(OutputSetpoint {
            timestamp_us: self.timebase.now_us(),
            stop: false,
            outputs,
        });
    }
}

impl Drop for LinkUnderTest {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Read command frames until `predicate` matches one, or panic at the
/// deadline.
fn wait_for_frame<F>(reader: &mut BufReader<TcpStream>, predicate: F) -> CommandFrameMsg
where
    F: Fn(&CommandFrameMsg) -> bool,
{
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut line = String::new();
    while Instant::now() < deadline {
        line.clear();
        match reader.read_line(&mut line) {
            Ok(0) => panic!("link closed the connection"),
            Ok(_) => {
                if let Some(frame) = CommandFrameMsg::parse(line.trim()) {
                    if predicate(&frame) {
                        return frame;
                    }
                }
            }
            Err(_) => {} // read timeout, keep polling
        }
    }
    panic!("no matching command frame before deadline");
}

#[test]
fn absent_setpoint_degrades_to_all_stop() {
    let link = LinkUnderTest::start();
    let stream = link.connect();
    let mut reader = BufReader::new(stream);

    let frame = wait_for_frame(&mut reader, |_| true);
    assert_eq!(frame.commands.len(), 8);
    assert!(frame.commands.iter().all(|c| c.value == 0));
}

#[test]
fn fresh_setpoint_passes_through_verbatim() {
    let link = LinkUnderTest::start();
    let stream = link.connect();
    let mut reader = BufReader::new(stream);

    // Keep the setpoint fresh while we wait for it to surface.
    let frame = {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            link.fresh_setpoint([1500, 1400, 0, 0, 0, 0, 0, 0]);
            let mut line = String::new();
            match reader.read_line(&mut line) {
                Ok(0) => panic!("link closed the connection"),
                Ok(_) => {
                    if let Some(frame) = CommandFrameMsg::parse(line.trim()) {
                        if frame.commands.first().is_some_and(|c| c.value == 1500) {
                            break frame;
                        }
                    }
                }
                Err(_) => {}
            }
            assert!(Instant::now() < deadline, "setpoint never surfaced");
        }
    };
    assert_eq!(frame.commands[1].value, 1400);
    // Idle slots still get explicit zero commands.
    assert_eq!(frame.commands[7].value, 0);
}

#[test]
fn status_report_surfaces_in_snapshot_online_mask() {
    let link = LinkUnderTest::start();
    let mut stream = link.connect();

    let status = r#"{"type":"esc_status","protocol_version":{"major":1,"minor":0},"esc_index":2,"node_id":22,"voltage_v":15.0,"current_a":2.0,"temperature_c":40.0,"rpm":5000,"error_count":0}"#;
    writeln!(stream, "{}", status).unwrap();
    stream.flush().unwrap();

    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        let snapshot = link.exchange.read_snapshot();
        if snapshot.online_mask & (1 << 2) != 0 {
            assert_eq!(snapshot.armed_mask, 0b1111);
            assert_eq!(snapshot.unit_count, 4);
            break;
        }
        assert!(
            Instant::now() < deadline,
            "online bit never set; mask {:#b}",
            snapshot.online_mask
        );
        thread::sleep(Duration::from_millis(20));
    }
}
