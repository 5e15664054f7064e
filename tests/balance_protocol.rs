use mettler_toledo_device::serial::mock::{ScriptedReply, ScriptedTransport};
use mettler_toledo_device::serial::SerialError;
use mettler_toledo_device::{Balance, DeviceError, Stability};

fn balance(lines: &[&str]) -> Balance<ScriptedTransport> {
    Balance::new(ScriptedTransport::with_lines("COM3", lines))
}

fn writes_after<F>(lines: &[&str], op: F) -> Vec<String>
where
    F: FnOnce(&mut Balance<ScriptedTransport>),
{
    let transport = ScriptedTransport::with_lines("COM3", lines);
    let log = transport.log();
    let mut balance = Balance::new(transport);
    op(&mut balance);
    balance.close().unwrap();
    let writes = log.lock().unwrap().writes.clone();
    writes
}

#[test]
fn test_serial_number_strips_quotes() {
    let mut balance = balance(&[r#"I4 A "1126493049""#]);
    assert_eq!(balance.get_serial_number().unwrap(), 1126493049);
}

#[test]
fn test_serial_number_request_bytes() {
    let writes = writes_after(&[r#"I4 A "1126493049""#], |b| {
        b.get_serial_number().unwrap();
    });
    assert_eq!(writes, vec!["I4\r\n".to_string()]);
}

#[test]
fn test_stable_weight_reading() {
    let mut balance = balance(&["S S 100.00 g"]);
    let reading = balance.get_weight_stable().unwrap().expect("stable reading");
    assert_eq!(reading.value, 100.0);
    assert_eq!(reading.unit, "g");
    assert_eq!(reading.stability, Stability::Stable);
}

#[test]
fn test_stable_weight_swallows_weighing_conditions() {
    let mut balance = balance(&["S I", "S +", "S -"]);
    assert!(balance.get_weight_stable().unwrap().is_none());
    assert!(balance.get_weight_stable().unwrap().is_none());
    assert!(balance.get_weight_stable().unwrap().is_none());
}

#[test]
fn test_immediate_weight_propagates_busy() {
    let mut balance = balance(&["SI I"]);
    match balance.get_weight() {
        Err(DeviceError::Busy { request }) => assert_eq!(request, "SI"),
        other => panic!("expected Busy, got {:?}", other),
    }
}

#[test]
fn test_immediate_weight_propagates_overload_and_underload() {
    let mut balance = balance(&["SI +", "SI -"]);
    match balance.get_weight() {
        Err(DeviceError::Overload { request }) => assert_eq!(request, "SI"),
        other => panic!("expected Overload, got {:?}", other),
    }
    match balance.get_weight() {
        Err(DeviceError::Underload { request }) => assert_eq!(request, "SI"),
        other => panic!("expected Underload, got {:?}", other),
    }
}

#[test]
fn test_dynamic_weight() {
    let mut balance = balance(&["SI D 12.5 g"]);
    let reading = balance.get_weight().unwrap();
    assert_eq!(reading.stability, Stability::Dynamic);
    assert_eq!(reading.to_string(), "12.5 g (dynamic)");
}

#[test]
fn test_syntax_error_takes_priority() {
    let mut balance = balance(&["ES I"]);
    assert!(matches!(
        balance.get_weight_stable(),
        Err(DeviceError::Syntax { .. })
    ));
}

#[test]
fn test_transmission_and_logical_errors_propagate() {
    let mut balance = balance(&["ET", "EL"]);
    assert!(matches!(
        balance.zero_stable(),
        Err(DeviceError::Transmission { .. })
    ));
    assert!(matches!(balance.get_weight(), Err(DeviceError::Logical { .. })));
}

#[test]
fn test_zero_stable() {
    let mut balance = balance(&["Z A", "Z I", "Z +"]);
    assert!(balance.zero_stable().unwrap());
    assert!(!balance.zero_stable().unwrap());
    assert!(!balance.zero_stable().unwrap());
}

#[test]
fn test_zero_immediately_reports_stability() {
    let mut balance = balance(&["ZI D", "ZI S"]);
    assert_eq!(balance.zero().unwrap(), Stability::Dynamic);
    assert_eq!(balance.zero().unwrap(), Stability::Stable);
}

#[test]
fn test_reset_does_not_read() {
    // No scripted reply: a read would time out
    let writes = writes_after(&[], |b| b.reset().unwrap());
    assert_eq!(writes, vec!["@\r\n".to_string()]);
}

#[test]
fn test_reset_reply_does_not_answer_next_request() {
    let mut balance = balance(&[r#"I4 A "1126493049""#, "SI S 100.00 g"]);
    balance.reset().unwrap();
    let reading = balance.get_weight().unwrap();
    assert_eq!(reading.value, 100.0);
    assert_eq!(reading.stability, Stability::Stable);
}

#[test]
fn test_late_reply_is_discarded() {
    let transport = ScriptedTransport::new(
        "COM3",
        vec![
            ScriptedReply::Late("S S 1.00 g".to_string()),
            ScriptedReply::line("SI S 2.00 g"),
        ],
    );
    let mut balance = Balance::new(transport);
    assert!(matches!(
        balance.get_weight_stable(),
        Err(DeviceError::Serial(SerialError::Timeout))
    ));
    assert_eq!(balance.get_weight().unwrap().value, 2.0);
}

#[test]
fn test_identification_busy_is_not_executable() {
    let mut balance = balance(&["I2 I"]);
    match balance.get_balance_data() {
        Err(DeviceError::CommandNotExecutable { operation, request }) => {
            assert_eq!(operation, "get_balance_data");
            assert_eq!(request, "I2");
        }
        other => panic!("expected CommandNotExecutable, got {:?}", other),
    }
}

#[test]
fn test_identification_payload() {
    let mut balance = balance(&[r#"I2 A "WMS404C-L/10 WMS-Bridge 410.0090 g""#]);
    assert_eq!(
        balance.get_balance_data().unwrap(),
        vec!["WMS404C-L/10", "WMS-Bridge", "410.0090", "g"]
    );
}

#[test]
fn test_malformed_numeric_field() {
    let mut balance = balance(&[r#"I4 A "B03X2""#, "SI S abc g"]);
    assert!(matches!(
        balance.get_serial_number(),
        Err(DeviceError::MalformedNumericField { .. })
    ));
    match balance.get_weight() {
        Err(DeviceError::MalformedNumericField { field, .. }) => assert_eq!(field, "abc"),
        other => panic!("expected MalformedNumericField, got {:?}", other),
    }
}

#[test]
fn test_short_reply_is_malformed() {
    let mut balance = balance(&["S S"]);
    assert!(matches!(
        balance.get_weight_stable(),
        Err(DeviceError::MalformedReply { .. })
    ));
}

#[test]
fn test_transport_failures_propagate() {
    let transport = ScriptedTransport::new(
        "COM3",
        vec![
            ScriptedReply::Timeout,
            ScriptedReply::IoFailure("cable pulled".to_string()),
        ],
    );
    let mut balance = Balance::new(transport);
    assert!(matches!(
        balance.get_weight_stable(),
        Err(DeviceError::Serial(SerialError::Timeout))
    ));
    assert!(matches!(
        balance.zero_stable(),
        Err(DeviceError::Serial(SerialError::IoError(_)))
    ));
}

#[test]
fn test_close_releases_transport() {
    let transport = ScriptedTransport::with_lines("COM3", &[]);
    let log = transport.log();
    let balance = Balance::new(transport);
    assert_eq!(balance.port(), "COM3");
    balance.close().unwrap();
    assert_eq!(log.lock().unwrap().closes, 1);
}
