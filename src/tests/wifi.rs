use crate::error::{Error, Rejection};
use crate::responses::Encryption;
use crate::session::{SocketStatus, WifiMode};
use crate::tests::mock::{adapter, MockTransport};
use crate::wifi::Credentials;
use core::net::Ipv4Addr;
use core::str::FromStr;

/// Adds the replies of a successful join, starting with the status query
fn add_join_replies(transport: &mut MockTransport) {
    transport.add_status(5);
    transport.add_reply(b"+CWMODE:1\r\n\r\nOK\r\n");
    transport.add_reply(b"WIFI CONNECTED\r\nWIFI GOT IP\r\n\r\nOK\r\n");
    transport.add_reply(b"+CIPSTA_CUR:ip:\"10.0.0.181\"\r\n\r\nOK\r\n");
}

#[test]
fn test_join_correct_commands() {
    let mut transport = MockTransport::new();
    add_join_replies(&mut transport);

    let mut adapter = adapter(transport);
    adapter.join_access_point("home", "pw123", 15_000, 3).unwrap();

    assert_eq!("home", adapter.session().associated_ssid.as_ref().unwrap().as_str());
    assert_eq!(SocketStatus::ApConnectedNoSocket, adapter.session().socket_status);

    let commands = adapter.transport.get_commands_as_strings();
    assert_eq!(
        vec![
            "AT+CIPSTATUS\r\n",
            "AT+CWMODE?\r\n",
            "AT+CWJAP=\"home\",\"pw123\"\r\n",
            "AT+CIPSTA_CUR?\r\n"
        ],
        commands
    );
}

#[test]
fn test_join_twice_no_second_join_command() {
    let mut transport = MockTransport::new();
    add_join_replies(&mut transport);
    transport.add_status(2);
    transport.add_reply(b"+CWJAP:\"home\",\"aa:bb:cc:dd:ee:ff\",6,-50\r\n\r\nOK\r\n");

    let mut adapter = adapter(transport);
    adapter.join_access_point("home", "pw123", 15_000, 3).unwrap();
    adapter.join_access_point("home", "pw123", 15_000, 3).unwrap();

    let commands = adapter.transport.get_commands_as_strings();
    assert_eq!(1, commands.iter().filter(|command| command.starts_with("AT+CWJAP=")).count());
    assert_eq!("AT+CWJAP?\r\n", commands[5]);
    assert_eq!("home", adapter.session().associated_ssid.as_ref().unwrap().as_str());
}

#[test]
fn test_join_other_network() {
    let mut transport = MockTransport::new();
    transport.add_status(2);
    transport.add_reply(b"+CWJAP:\"office\",\"aa:bb:cc:dd:ee:ff\",6,-50\r\n\r\nOK\r\n");
    transport.add_reply(b"+CWMODE:1\r\n\r\nOK\r\n");
    transport.add_reply(b"WIFI CONNECTED\r\nWIFI GOT IP\r\n\r\nOK\r\n");
    transport.add_ok();

    let mut adapter = adapter(transport);
    adapter.join_access_point("home", "pw123", 15_000, 3).unwrap();

    let commands = adapter.transport.get_commands_as_strings();
    assert_eq!("AT+CWJAP=\"home\",\"pw123\"\r\n", commands[3]);
    assert_eq!("home", adapter.session().associated_ssid.as_ref().unwrap().as_str());
}

#[test]
fn test_join_station_mode_enabled() {
    let mut transport = MockTransport::new();
    transport.add_status(5);
    transport.add_reply(b"+CWMODE:2\r\n\r\nOK\r\n");
    transport.add_ok();
    transport.add_reply(b"WIFI CONNECTED\r\nWIFI GOT IP\r\n");
    transport.add_ok();

    let mut adapter = adapter(transport);
    adapter.join_access_point("home", "pw123", 15_000, 3).unwrap();

    let commands = adapter.transport.get_commands_as_strings();
    assert_eq!("AT+CWMODE_CUR=1\r\n", commands[2]);
    assert_eq!("AT+CWJAP=\"home\",\"pw123\"\r\n", commands[3]);
}

#[test]
fn test_join_missing_ip() {
    let mut transport = MockTransport::new();
    transport.add_status(5);
    transport.add_reply(b"+CWMODE:1\r\n\r\nOK\r\n");
    transport.add_reply(b"WIFI CONNECTED\r\n\r\nOK\r\n");

    let mut adapter = adapter(transport);
    let error = adapter.join_access_point("home", "pw123", 1_000, 1).unwrap_err();

    assert_eq!(Error::ConnectionRejected(Rejection::NoIpAddress), error);
    assert!(adapter.session().associated_ssid.is_none());
}

#[test]
fn test_join_not_connected() {
    let mut transport = MockTransport::new();
    transport.add_status(5);
    transport.add_reply(b"+CWMODE:1\r\n\r\nOK\r\n");
    transport.add_ok();

    let mut adapter = adapter(transport);
    let error = adapter.join_access_point("home", "pw123", 1_000, 1).unwrap_err();

    assert_eq!(Error::ConnectionRejected(Rejection::NotConnected), error);
}

#[test]
fn test_join_no_acknowledgement() {
    let mut transport = MockTransport::new();
    transport.add_status(5);
    transport.add_reply(b"+CWMODE:1\r\n\r\nOK\r\n");
    transport.add_reply(b"+CWJAP:1\r\n\r\nFAIL\r\n");

    let mut adapter = adapter(transport);
    let error = adapter.join_access_point("home", "pw123", 1_000, 1).unwrap_err();

    assert_eq!(Error::no_acknowledgement("AT+CWJAP=\"home\",\"pw123\""), error);
}

#[test]
fn test_join_invalid_ssid() {
    let mut adapter = adapter(MockTransport::new());
    let error = adapter.join_access_point(&"x".repeat(33), "pw123", 1_000, 1).unwrap_err();

    assert_eq!(Error::InvalidArgument, error);
    assert!(adapter.transport.get_commands_as_strings().is_empty());
}

#[test]
fn test_join_hex_psk() {
    let psk = "a1".repeat(32);

    let mut transport = MockTransport::new();
    add_join_replies(&mut transport);

    let mut adapter = adapter(transport);
    adapter.join_access_point("home", &psk, 15_000, 3).unwrap();

    let commands = adapter.transport.get_commands_as_strings();
    assert_eq!(format!("AT+CWJAP=\"home\",\"{}\"\r\n", psk), commands[2]);
}

#[test]
fn test_join_invalid_password_length() {
    let mut adapter = adapter(MockTransport::new());

    let no_hex = "x".repeat(64);
    assert_eq!(
        Error::InvalidArgument,
        adapter.join_access_point("home", &no_hex, 1_000, 1).unwrap_err()
    );

    let too_long = "a".repeat(65);
    assert_eq!(
        Error::InvalidArgument,
        adapter.join_access_point("home", &too_long, 1_000, 1).unwrap_err()
    );

    assert!(adapter.transport.get_commands_as_strings().is_empty());
}

#[test]
fn test_connect_with_sntp() {
    let mut transport = MockTransport::new();
    add_join_replies(&mut transport);
    transport.add_ok();

    let mut adapter = adapter(transport);
    adapter
        .connect_access_point(&Credentials {
            ssid: "home",
            password: "pw123",
            timezone: Some(2),
            ntp_server: Some("pool.ntp.org"),
        })
        .unwrap();

    let commands = adapter.transport.get_commands_as_strings();
    assert_eq!("AT+CIPSNTPCFG=1,2,\"pool.ntp.org\"\r\n", commands[4]);
}

#[test]
fn test_connect_without_timezone() {
    let mut transport = MockTransport::new();
    add_join_replies(&mut transport);

    let mut adapter = adapter(transport);
    adapter
        .connect_access_point(&Credentials {
            ssid: "home",
            password: "pw123",
            ..Default::default()
        })
        .unwrap();

    assert_eq!(4, adapter.transport.get_commands_as_strings().len());
}

#[test]
fn test_remote_access_point() {
    let mut transport = MockTransport::new();
    transport.add_status(3);
    transport.add_reply(b"+CWJAP:\"home\",\"aa:bb:cc:dd:ee:ff\",6,-50\r\n\r\nOK\r\n");

    let mut adapter = adapter(transport);
    let remote = adapter.remote_access_point().unwrap().unwrap();

    assert_eq!("home", remote.ssid.as_str());
    assert_eq!("aa:bb:cc:dd:ee:ff", remote.bssid.as_str());
    assert_eq!(6, remote.channel);
    assert_eq!(-50, remote.rssi);
}

#[test]
fn test_remote_access_point_not_associated() {
    let mut transport = MockTransport::new();
    transport.add_status(5);

    let mut adapter = adapter(transport);
    adapter.session.associated_ssid = Some(heapless::String::from_str("home").unwrap());

    assert!(adapter.remote_access_point().unwrap().is_none());
    assert!(adapter.session().associated_ssid.is_none());
    assert_eq!(1, adapter.transport.get_commands_as_strings().len());
}

#[test]
fn test_scan_access_points() {
    let mut transport = MockTransport::new();
    transport.add_reply(b"+CWMODE:1\r\n\r\nOK\r\n");
    transport.add_reply(
        b"+CWLAP:(3,\"home\",-45,\"aa:bb:cc:dd:ee:ff\",6,7,0)\r\n\
          +CWLAP:(0,\"guest, 2nd floor\",-80,\"11:22:33:44:55:66\",11,7,0)\r\n\r\nOK\r\n",
    );

    let mut adapter = adapter(transport);
    let access_points = adapter.scan_access_points(1).unwrap();

    assert_eq!(2, access_points.len());
    assert_eq!(Encryption::Wpa2Psk, access_points[0].encryption);
    assert_eq!("home", access_points[0].ssid.as_str());
    assert_eq!(-45, access_points[0].rssi);
    assert_eq!("aa:bb:cc:dd:ee:ff", access_points[0].mac.as_str());
    assert_eq!(6, access_points[0].channel);

    assert_eq!(Encryption::Open, access_points[1].encryption);
    assert_eq!("guest, 2nd floor", access_points[1].ssid.as_str());
    assert_eq!(11, access_points[1].channel);
}

#[test]
fn test_scan_access_points_retried() {
    let mut transport = MockTransport::new();
    transport.add_reply(b"+CWMODE:1\r\n\r\nOK\r\n");
    transport.add_error();
    transport.add_error();
    transport.add_error();
    transport.add_reply(b"+CWMODE:1\r\n\r\nOK\r\n");
    transport.add_reply(b"+CWLAP:(4,\"home\",-45,\"aa:bb:cc:dd:ee:ff\",1)\r\n\r\nOK\r\n");

    let mut adapter = adapter(transport);
    let access_points = adapter.scan_access_points(2).unwrap();

    assert_eq!(1, access_points.len());
    assert_eq!(Encryption::WpaWpa2Psk, access_points[0].encryption);
    assert_eq!(6, adapter.transport.get_commands_as_strings().len());
}

#[test]
fn test_scan_access_points_malformed() {
    let mut transport = MockTransport::new();
    transport.add_reply(b"+CWMODE:1\r\n\r\nOK\r\n");
    transport.add_reply(b"+CWLAP:3,home\r\n\r\nOK\r\n");

    let mut adapter = adapter(transport);
    let error = adapter.scan_access_points(3).unwrap_err();

    assert_eq!(Error::MalformedResponse("+CWLAP:"), error);
    assert_eq!(2, adapter.transport.get_commands_as_strings().len());
}

#[test]
fn test_mode() {
    let mut transport = MockTransport::new();
    transport.add_reply(b"+CWMODE:3\r\n\r\nOK\r\n");
    transport.add_ok();

    let mut adapter = adapter(transport);
    assert_eq!(WifiMode::SoftApStation, adapter.mode().unwrap());
    assert_eq!(Error::MalformedResponse("+CWMODE:"), adapter.mode().unwrap_err());
}

#[test]
fn test_set_mode() {
    let mut transport = MockTransport::new();
    transport.add_ok();

    let mut adapter = adapter(transport);
    adapter.set_mode(WifiMode::SoftAp).unwrap();

    assert_eq!(vec!["AT+CWMODE_CUR=2\r\n"], adapter.transport.get_commands_as_strings());
    assert_eq!(Error::InvalidArgument, WifiMode::try_from(4).unwrap_err());
}

#[test]
fn test_get_address() {
    let mut transport = MockTransport::new();
    transport.add_reply(b"+CIFSR:STAIP,\"10.0.0.181\"\r\n+CIFSR:STAMAC,\"aa:bb:cc:dd:ee:ff\"\r\n\r\nOK\r\n");

    let mut adapter = adapter(transport);
    let address = adapter.get_address().unwrap();

    assert_eq!(Some(Ipv4Addr::new(10, 0, 0, 181)), address.ipv4);
    assert_eq!("aa:bb:cc:dd:ee:ff", address.mac.unwrap().as_str());
}

#[test]
fn test_local_ip() {
    let mut transport = MockTransport::new();
    transport.add_reply(b"+CIFSR:STAIP,\"10.0.0.181\"\r\n\r\nOK\r\n");
    transport.add_reply(b"+CIFSR:STAMAC,\"aa:bb:cc:dd:ee:ff\"\r\n\r\nOK\r\n");
    transport.add_reply(b"+CIFSR:STAIP,\"10.0.0\"\r\n\r\nOK\r\n");

    let mut adapter = adapter(transport);
    assert_eq!(Ipv4Addr::new(10, 0, 0, 181), adapter.local_ip().unwrap());
    assert_eq!(Error::MalformedResponse("+CIFSR:STAIP"), adapter.local_ip().unwrap_err());
    assert_eq!(Error::MalformedResponse("+CIFSR:"), adapter.local_ip().unwrap_err());
}
