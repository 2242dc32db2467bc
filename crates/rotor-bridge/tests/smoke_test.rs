use std::io::{BufRead, BufReader};
use std::net::{TcpListener, TcpStream};
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

struct BridgeProcess {
    child: Child,
    addr: String,
}

impl BridgeProcess {
    fn start(extra_args: &[&str]) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .expect("Failed to bind ephemeral port for smoke test");
        let addr = format!("127.0.0.1:{}", listener.local_addr().unwrap().port());
        drop(listener);

        let mut args = vec!["--bind", addr.as_str(), "--run-seconds", "5"];
        args.extend_from_slice(extra_args);

        let child = Command::new(env!("CARGO_BIN_EXE_rotor-bridge"))
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .expect("Failed to start rotor-bridge");

        // Loop until the link port is open (up to 5s)
        let start = Instant::now();
        while start.elapsed().as_secs() < 5 {
            if TcpStream::connect(&addr).is_ok() {
                break;
            }
            thread::sleep(Duration::from_millis(100));
        }

        Self { child, addr }
    }
}

impl Drop for BridgeProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

#[test]
fn broadcasts_all_stop_without_a_setpoint_source() {
    let mut bridge = BridgeProcess::start(&[]);

    let stream = TcpStream::connect(&bridge.addr).expect("Failed to connect as gateway");
    stream
        .set_read_timeout(Some(Duration::from_secs(2)))
        .unwrap();
    let mut reader = BufReader::new(stream);

    // With no internal setpoint source the bridge must still emit explicit
    // all-stop batches at the command rate.
    let mut line = String::new();
    reader.read_line(&mut line).expect("no command frame");
    let frame: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(frame["type"], "actuator_command");
    let commands = frame["commands"].as_array().unwrap();
    assert_eq!(commands.len(), 8);
    for command in commands {
        assert_eq!(command["value"], 0);
    }

    // And the process exits cleanly when --run-seconds elapses.
    let status = bridge.child.wait().expect("wait failed");
    assert!(status.success());
}

#[test]
fn sim_run_exits_cleanly() {
    let mut bridge = BridgeProcess::start(&["--sim"]);
    let status = bridge.child.wait().expect("wait failed");
    assert!(status.success());
}
