use crate::error::Error;
use crate::tests::mock::{adapter, MockTransport};

#[test]
fn test_subscribe_matching_topic() {
    let mut transport = MockTransport::new();
    transport.push_incoming(b"topicA -> hello");

    let mut adapter = adapter(transport);
    let message = adapter.mqtt_subscribe("topicA", 500).unwrap().unwrap();

    assert_eq!("topicA", message.topic.as_str());
    assert_eq!(b"hello", message.payload.as_slice());
}

#[test]
fn test_subscribe_topic_mismatch() {
    let mut transport = MockTransport::new();
    transport.push_incoming(b"topicB -> payload");

    let mut adapter = adapter(transport);
    assert!(adapter.mqtt_subscribe("topicA", 500).unwrap().is_none());
    assert_eq!(b"payload", adapter.transport.remaining().as_slice());
}

#[test]
fn test_subscribe_noise_and_line_end() {
    let mut transport = MockTransport::new();
    transport.push_incoming(b"\r\nOK\r\n\r\nsensors/in -> {\"value\": 21}\r\n");

    let mut adapter = adapter(transport);
    let message = adapter.mqtt_subscribe("sensors/in", 500).unwrap().unwrap();

    assert_eq!(b"{\"value\": 21}", message.payload.as_slice());
    assert!(!adapter.transport.is_flow_enabled());
}

#[test]
fn test_subscribe_nothing_received() {
    let mut adapter = adapter(MockTransport::new());
    assert!(adapter.mqtt_subscribe("topicA", 500).unwrap().is_none());
}

#[test]
fn test_subscribe_topic_too_long() {
    let mut adapter = adapter(MockTransport::new());
    let topic = "t".repeat(129);

    assert_eq!(Error::InvalidArgument, adapter.mqtt_subscribe(&topic, 500).unwrap_err());
}

#[test]
fn test_configure_commands() {
    let mut transport = MockTransport::new();
    transport.add_ok();
    transport.add_ok();
    transport.add_ok();
    transport.add_ok();

    let mut adapter = adapter(transport);
    adapter.mqtt_configure("user", "secret", "client-1", 60).unwrap();
    adapter.mqtt_set_qos(1).unwrap();
    adapter.mqtt_set_topic("sensors/out", "sensors/in").unwrap();
    adapter.mqtt_publish("hello").unwrap();

    assert_eq!(
        vec![
            "AT+MQTTSET=\"user\",\"secret\",\"client-1\",60\r\n",
            "AT+MQTTQOS=1\r\n",
            "AT+MQTTTOPIC=\"sensors/out\",\"sensors/in\"\r\n",
            "AT+MQTTPUB=\"hello\"\r\n"
        ],
        adapter.transport.get_commands_as_strings()
    );
}

#[test]
fn test_set_qos_invalid() {
    let mut adapter = adapter(MockTransport::new());

    assert_eq!(Error::InvalidArgument, adapter.mqtt_set_qos(3).unwrap_err());
    assert!(adapter.transport.get_commands_as_strings().is_empty());
}

#[test]
fn test_publish_not_acknowledged() {
    let mut transport = MockTransport::new();
    transport.add_error();

    let mut adapter = adapter(transport);
    let error = adapter.mqtt_publish("hello").unwrap_err();

    assert_eq!(Error::no_acknowledgement("AT+MQTTPUB=\"hello\""), error);
}

#[test]
fn test_connect_and_disconnect() {
    let mut transport = MockTransport::new();
    transport.add_ok();
    transport.add_ok();
    transport.add_reply(b"\r\nCLOSED\r\n");

    let mut adapter = adapter(transport);
    adapter.mqtt_connect(true, "10.0.0.2", 1883, None).unwrap();
    assert!(adapter.session().mqtt_connected);

    adapter.mqtt_connect(false, "10.0.0.2", 1883, Some(0)).unwrap();
    adapter.mqtt_disconnect().unwrap();
    assert!(!adapter.session().mqtt_connected);

    assert_eq!(
        vec![
            "AT+MQTTCON=1,\"10.0.0.2\",1883\r\n",
            "AT+MQTTCON=0,0,\"10.0.0.2\",1883\r\n",
            "AT+MQTTDIS\r\n"
        ],
        adapter.transport.get_commands_as_strings()
    );
}

#[test]
fn test_connect_failed() {
    let mut transport = MockTransport::new();
    transport.add_error();
    transport.add_error();
    transport.add_error();

    let mut adapter = adapter(transport);
    assert!(adapter.mqtt_connect(true, "10.0.0.2", 1883, None).is_err());
    assert!(!adapter.session().mqtt_connected);
    assert_eq!(3, adapter.transport.get_commands_as_strings().len());
}
