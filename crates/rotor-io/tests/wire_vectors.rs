use core_bridge::{ActuatorCommand, CommandBatch};
use rotor_io::wire::{CommandFrameMsg, IncomingFrame, ProtocolVersion};

#[test]
fn parses_esc_status_frame() {
    let raw = r#"{
        "type":"esc_status",
        "protocol_version":{"major":1,"minor":0},
        "esc_index":2,
        "node_id":22,
        "voltage_v":15.1,
        "current_a":3.2,
        "temperature_c":44.5,
        "rpm":5200,
        "error_count":1
    }"#;

    let frame = IncomingFrame::parse(raw).expect("esc_status should parse");
    match frame {
        IncomingFrame::EscStatus(msg) => {
            assert!(msg.protocol_version.is_supported());
            let report = msg.to_report();
            assert_eq!(report.slot_index, 2);
            assert_eq!(report.address, 22);
            assert_eq!(report.rpm, 5200);
            assert_eq!(report.error_count, 1);
        }
        _ => panic!("expected esc_status frame"),
    }
}

#[test]
fn parses_hello_frame() {
    let raw = r#"{
        "type":"hello",
        "protocol_version":{"major":1,"minor":0},
        "capabilities":["esc_status.v1"],
        "client_id":"bench-gateway"
    }"#;

    let frame = IncomingFrame::parse(raw).expect("hello should parse");
    match frame {
        IncomingFrame::Hello(hello) => {
            assert_eq!(hello.client_id.as_deref(), Some("bench-gateway"));
        }
        _ => panic!("expected hello frame"),
    }
}

#[test]
fn parses_rpm_frame() {
    let raw = r#"{"type":"rpm","node_id":20,"rpm":[5100.0,5080.5,5120.0,5095.0]}"#;

    let frame = IncomingFrame::parse(raw).expect("rpm should parse");
    match frame {
        IncomingFrame::Rpm(msg) => {
            assert_eq!(msg.node_id, 20);
            assert_eq!(msg.rpm.len(), 4);
            // Version omitted on the wire is assumed current.
            assert_eq!(msg.protocol_version, ProtocolVersion::v1());
        }
        _ => panic!("expected rpm frame"),
    }
}

#[test]
fn rejects_unknown_and_malformed_frames() {
    assert!(IncomingFrame::parse(r#"{"type":"battery_status"}"#).is_none());
    assert!(IncomingFrame::parse("not json at all").is_none());
    assert!(IncomingFrame::parse(r#"{"no_type":true}"#).is_none());
    // Known type with missing required fields.
    assert!(IncomingFrame::parse(r#"{"type":"esc_status","esc_index":1}"#).is_none());
}

#[test]
fn command_frame_roundtrip() {
    let batch = CommandBatch {
        commands: vec![
            ActuatorCommand {
                actuator_id: 0,
                value: 1500,
            },
            ActuatorCommand {
                actuator_id: 1,
                value: 0,
            },
        ],
    };
    let frame = CommandFrameMsg::from_batch(7, 123_456, &batch);
    let line = serde_json::to_string(&frame).unwrap();

    let parsed = CommandFrameMsg::parse(&line).expect("command frame should parse");
    assert_eq!(parsed.sequence, 7);
    assert_eq!(parsed.timestamp_us, 123_456);
    assert_eq!(parsed.to_batch(), batch);
}

#[test]
fn command_frame_parse_rejects_other_types() {
    assert!(CommandFrameMsg::parse(r#"{"type":"esc_status","esc_index":1}"#).is_none());
}
