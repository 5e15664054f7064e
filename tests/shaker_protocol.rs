use std::time::Duration;

use mettler_toledo_device::serial::mock::{ScriptedReply, ScriptedTransport};
use mettler_toledo_device::serial::SerialError;
use mettler_toledo_device::{DeviceError, Shaker};

fn shaker(lines: &[&str]) -> Shaker<ScriptedTransport> {
    Shaker::new(ScriptedTransport::with_lines("/dev/ttyUSB1", lines))
}

fn writes_after<F>(lines: &[&str], op: F) -> Vec<String>
where
    F: FnOnce(&mut Shaker<ScriptedTransport>),
{
    let transport = ScriptedTransport::with_lines("/dev/ttyUSB1", lines);
    let log = transport.log();
    let mut shaker = Shaker::new(transport);
    op(&mut shaker);
    shaker.close().unwrap();
    let writes = log.lock().unwrap().writes.clone();
    writes
}

#[test]
fn test_description_is_whole_line() {
    let mut shaker = shaker(&["BIOSHAKE 3000 elm"]);
    assert_eq!(shaker.get_description().unwrap(), "BIOSHAKE 3000 elm");
}

#[test]
fn test_temperature_sent_in_tenths() {
    let writes = writes_after(&["ok"], |s| s.set_temp_target(37.5).unwrap());
    assert_eq!(writes, vec!["setTempTarget375\r".to_string()]);
}

#[test]
fn test_temp_on_sets_target_first() {
    let writes = writes_after(&["ok", "ok"], |s| s.temp_on(25.0).unwrap());
    assert_eq!(writes, vec!["setTempTarget250\r", "tempOn\r"]);
}

#[test]
fn test_out_of_range_temperature_writes_nothing() {
    let writes = writes_after(&[], |s| match s.temp_on(150.0) {
        Err(DeviceError::ArgumentOutOfRange {
            parameter,
            value,
            min,
            max,
        }) => {
            assert_eq!(parameter, "temp_target");
            assert_eq!(value, 150.0);
            assert_eq!((min, max), (0.0, 99.0));
        }
        other => panic!("expected ArgumentOutOfRange, got {:?}", other),
    });
    assert!(writes.is_empty());
}

#[test]
fn test_shake_on_with_runtime() {
    let writes = writes_after(&["ok", "ok"], |s| {
        s.shake_on_with_runtime(Duration::from_secs(30), 500).unwrap()
    });
    assert_eq!(
        writes,
        vec!["setShakeTargetSpeed500\r", "shakeOnWithRuntime30\r"]
    );
}

#[test]
fn test_speed_range_checked_before_io() {
    let writes = writes_after(&[], |s| {
        assert!(matches!(
            s.shake_on(100),
            Err(DeviceError::ArgumentOutOfRange { parameter: "speed_target", .. })
        ));
        assert!(matches!(
            s.shake_on(3001),
            Err(DeviceError::ArgumentOutOfRange { .. })
        ));
        assert!(matches!(
            s.set_shake_acceleration(11),
            Err(DeviceError::ArgumentOutOfRange { parameter: "acceleration", .. })
        ));
        assert!(matches!(
            s.shake_on_with_runtime(Duration::from_secs(100_000), 500),
            Err(DeviceError::ArgumentOutOfRange { parameter: "runtime", .. })
        ));
    });
    assert!(writes.is_empty());
}

#[test]
fn test_shake_on_default_speed() {
    let writes = writes_after(&["ok", "ok"], |s| {
        let speed = s.get_default_shake_speed_target();
        assert_eq!(speed, 1000);
        s.shake_on(speed).unwrap()
    });
    assert_eq!(writes, vec!["setShakeTargetSpeed1000\r", "shakeOn\r"]);
}

#[test]
fn test_shake_state_empty_payload() {
    let mut shaker = shaker(&["", "90", "42"]);

    let idle = shaker.get_shake_state().unwrap();
    assert_eq!(idle.code, -1);
    assert_eq!(idle.description, "");

    let eco = shaker.get_shake_state().unwrap();
    assert_eq!(eco.code, 90);
    assert_eq!(eco.description, "ECO mode");

    assert_eq!(shaker.get_shake_state().unwrap().description, "Unknown");
}

#[test]
fn test_elm_state() {
    let mut shaker = shaker(&["1", "3"]);
    assert_eq!(
        shaker.get_elm_state().unwrap().description,
        "Microplate is locked"
    );
    assert_eq!(
        shaker.get_elm_state().unwrap().description,
        "Microplate is unlocked"
    );
}

#[test]
fn test_error_sentinel_carries_request() {
    let mut shaker = shaker(&["e"]);
    match shaker.set_shake_target_speed(500) {
        Err(DeviceError::Generic { request }) => assert_eq!(request, "setShakeTargetSpeed500"),
        other => panic!("expected Generic, got {:?}", other),
    }
}

#[test]
fn test_numeric_queries_truncate() {
    let mut shaker = shaker(&["1000.0", "1499.9", "37.5", "12"]);
    assert_eq!(shaker.get_shake_target_speed().unwrap(), 1000);
    assert_eq!(shaker.get_shake_actual_speed().unwrap(), 1499);
    assert_eq!(shaker.get_temp_actual().unwrap(), 37.5);
    assert_eq!(
        shaker.get_shake_remaining_time().unwrap(),
        Duration::from_secs(12)
    );
}

#[test]
fn test_malformed_numeric_reply() {
    let mut shaker = shaker(&["fast"]);
    match shaker.get_shake_actual_speed() {
        Err(DeviceError::MalformedNumericField { request, field }) => {
            assert_eq!(request, "getShakeActualSpeed");
            assert_eq!(field, "fast");
        }
        other => panic!("expected MalformedNumericField, got {:?}", other),
    }
}

#[test]
fn test_error_list_split() {
    let mut shaker = shaker(&["E12: overtemp; W3: door open;"]);
    assert_eq!(
        shaker.get_error_list().unwrap(),
        vec!["E12: overtemp", "W3: door open"]
    );
}

#[test]
fn test_timeout_propagates() {
    let transport = ScriptedTransport::new("/dev/ttyUSB1", vec![ScriptedReply::Timeout]);
    let mut shaker = Shaker::new(transport);
    assert!(matches!(
        shaker.get_version(),
        Err(DeviceError::Serial(SerialError::Timeout))
    ));
}

#[test]
fn test_close_releases_transport() {
    let transport = ScriptedTransport::with_lines("/dev/ttyUSB1", &["ok"]);
    let log = transport.log();
    let shaker = Shaker::new(transport);
    shaker.close().unwrap();
    let log = log.lock().unwrap();
    assert_eq!((log.opens, log.closes), (1, 1));
}
