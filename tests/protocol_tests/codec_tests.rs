//! Codec Tests
//!
//! Tests for command and response encoding/decoding.

use std::io::Cursor;
use std::time::{Duration, UNIX_EPOCH};

use atlascache::protocol::{
    decode_command, decode_response, encode_command, encode_response, from_unix_millis,
    read_command, read_response, to_unix_millis, write_command, write_response, Command,
    Response, Status, MAX_PAYLOAD_SIZE,
};

// =============================================================================
// Command Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_decode_set_keeps_ttl() {
    let cmd = Command::Set {
        key: b"session:42".to_vec(),
        value: br#"{"user":"ana"}"#.to_vec(),
        ttl_ms: 3_600_000,
    };
    let decoded = decode_command(&encode_command(&cmd)).unwrap();

    assert_eq!(decoded, cmd);
}

#[test]
fn test_encode_decode_expire_at() {
    let cmd = Command::ExpireAt {
        key: b"p:a".to_vec(),
        at_ms: 1_700_000_000_123,
    };
    let decoded = decode_command(&encode_command(&cmd)).unwrap();

    match decoded {
        Command::ExpireAt { key, at_ms } => {
            assert_eq!(key, b"p:a");
            assert_eq!(at_ms, 1_700_000_000_123);
        }
        _ => panic!("Expected EXPIREAT command"),
    }
}

#[test]
fn test_encode_decode_empty_value() {
    let cmd = Command::Set {
        key: b"key".to_vec(),
        value: vec![],
        ttl_ms: 1,
    };
    let decoded = decode_command(&encode_command(&cmd)).unwrap();

    match decoded {
        Command::Set { key, value, ttl_ms } => {
            assert_eq!(key, b"key");
            assert!(value.is_empty());
            assert_eq!(ttl_ms, 1);
        }
        _ => panic!("Expected SET command"),
    }
}

#[test]
fn test_encode_decode_binary_value() {
    let binary_value: Vec<u8> = (0..=255).collect();

    let cmd = Command::Set {
        key: b"bin".to_vec(),
        value: binary_value.clone(),
        ttl_ms: 10,
    };
    let decoded = decode_command(&encode_command(&cmd)).unwrap();

    match decoded {
        Command::Set { value, .. } => assert_eq!(value, binary_value),
        _ => panic!("Expected SET command"),
    }
}

// =============================================================================
// Response Encoding/Decoding Tests
// =============================================================================

#[test]
fn test_encode_decode_response_not_found() {
    let decoded = decode_response(&encode_response(&Response::not_found())).unwrap();

    assert_eq!(decoded.status, Status::NotFound);
    assert_eq!(decoded.payload, None);
}

#[test]
fn test_encode_decode_response_error_message() {
    let decoded = decode_response(&encode_response(&Response::error("something went wrong"))).unwrap();

    assert_eq!(decoded.status, Status::Error);
    assert_eq!(decoded.message(), "something went wrong");
}

// =============================================================================
// Error Handling Tests
// =============================================================================

#[test]
fn test_incomplete_header() {
    let bytes = [0x01, 0x00, 0x00]; // Only 3 bytes, need 5
    let result = decode_command(&bytes);
    assert!(result.is_err());
    assert!(result.unwrap_err().to_string().contains("Incomplete header"));
}

#[test]
fn test_incomplete_payload() {
    // Header says 10 bytes payload, but only 5 provided
    let bytes = [0x01, 0x00, 0x00, 0x00, 0x0A, 0x00, 0x00, 0x00, 0x05, 0x68];
    let result = decode_command(&bytes);
    assert!(result.unwrap_err().to_string().contains("Incomplete"));
}

#[test]
fn test_unknown_command_type() {
    let bytes = [0xFF, 0x00, 0x00, 0x00, 0x00];
    let result = decode_command(&bytes);
    assert!(result.unwrap_err().to_string().contains("Unknown command type"));
}

#[test]
fn test_unknown_response_status() {
    let bytes = [0xFF, 0x00, 0x00, 0x00, 0x00];
    let result = decode_response(&bytes);
    assert!(result.unwrap_err().to_string().contains("Unknown response status"));
}

#[test]
fn test_payload_too_large() {
    let len = (MAX_PAYLOAD_SIZE + 1).to_be_bytes();
    let bytes = [0x01, len[0], len[1], len[2], len[3]];

    let mut cursor = Cursor::new(bytes.to_vec());
    let result = read_command(&mut cursor);
    assert!(result.unwrap_err().to_string().contains("Payload too large"));
}

#[test]
fn test_set_missing_ttl() {
    // SET with key "k" but no ttl field
    let bytes = [0x02, 0x00, 0x00, 0x00, 0x05, 0x00, 0x00, 0x00, 0x01, b'k'];
    let result = decode_command(&bytes);
    assert!(result.unwrap_err().to_string().contains("missing ttl"));
}

#[test]
fn test_key_length_past_payload() {
    // GET claims a 9 byte key inside a 6 byte payload
    let bytes = [0x01, 0x00, 0x00, 0x00, 0x06, 0x00, 0x00, 0x00, 0x09, b'a', b'b'];
    let result = decode_command(&bytes);
    assert!(result.unwrap_err().to_string().contains("incomplete key"));
}

#[test]
fn test_ping_with_unexpected_payload() {
    let bytes = [0x04, 0x00, 0x00, 0x00, 0x05, 0x68, 0x65, 0x6C, 0x6C, 0x6F];
    let result = decode_command(&bytes);
    assert!(result.unwrap_err().to_string().contains("unexpected trailing"));
}

// =============================================================================
// Stream I/O Tests
// =============================================================================

#[test]
fn test_stream_multiple_commands() {
    let commands = vec![
        Command::Ping,
        Command::Set {
            key: b"k1".to_vec(),
            value: b"v1".to_vec(),
            ttl_ms: 500,
        },
        Command::Get { key: b"k1".to_vec() },
        Command::ExpireAt {
            key: b"k1".to_vec(),
            at_ms: 42,
        },
        Command::Delete { key: b"k1".to_vec() },
    ];

    let mut buffer = Vec::new();
    for cmd in &commands {
        write_command(&mut buffer, cmd).unwrap();
    }

    let mut cursor = Cursor::new(buffer);
    for expected in &commands {
        assert_eq!(&read_command(&mut cursor).unwrap(), expected);
    }
}

#[test]
fn test_stream_multiple_responses() {
    let responses = vec![
        Response::ok(Some(b"data".to_vec())),
        Response::not_found(),
        Response::error("oops"),
        Response::ok(None),
    ];

    let mut buffer = Vec::new();
    for resp in &responses {
        write_response(&mut buffer, resp).unwrap();
    }

    let mut cursor = Cursor::new(buffer);
    for expected in &responses {
        assert_eq!(&read_response(&mut cursor).unwrap(), expected);
    }
}

// =============================================================================
// Wire Format Verification Tests
// =============================================================================

#[test]
fn test_wire_format_expire_at() {
    let cmd = Command::ExpireAt {
        key: b"ab".to_vec(),
        at_ms: 1,
    };
    let encoded = encode_command(&cmd);

    // [0x05][len 14][key_len 2][a b][at_ms 8 bytes BE]
    assert_eq!(encoded[0], 0x05);
    assert_eq!(&encoded[1..5], &[0x00, 0x00, 0x00, 0x0E]);
    assert_eq!(&encoded[5..9], &[0x00, 0x00, 0x00, 0x02]);
    assert_eq!(&encoded[9..11], b"ab");
    assert_eq!(&encoded[11..19], &[0, 0, 0, 0, 0, 0, 0, 1]);
}

#[test]
fn test_unix_millis_conversion() {
    let at = UNIX_EPOCH + Duration::from_millis(1_234_567);
    assert_eq!(to_unix_millis(at), 1_234_567);
    assert_eq!(from_unix_millis(1_234_567), at);

    let before_epoch = UNIX_EPOCH - Duration::from_secs(1);
    assert_eq!(to_unix_millis(before_epoch), 0);
}
