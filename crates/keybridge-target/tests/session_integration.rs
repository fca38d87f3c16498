//! Integration tests for the target session over a real TCP connection.
//!
//! ```text
//! TcpStream (test) ─► serve_single_session ─► InjectKeysUseCase ─► MockVirtualKeyboard
//! ```

use std::time::Duration;

use keybridge_core::keymap::linux_input::{KEY_ENTER, KEY_H, KEY_I, KEY_LEFTSHIFT};
use keybridge_core::{encode_event, KeyEvent, KeyIdentifier, KeyIdentifierTable};
use keybridge_target::application::inject_keys::InjectKeysUseCase;
use keybridge_target::infrastructure::input_emulation::mock::MockVirtualKeyboard;
use keybridge_target::infrastructure::network::{bind, serve_single_session, SessionEnd};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

fn wire(events: &[KeyEvent]) -> Vec<u8> {
    events
        .iter()
        .flat_map(|e| encode_event(e).expect("encode"))
        .collect()
}

#[tokio::test]
async fn test_session_injects_events_in_order_and_releases_device_once() {
    // Arrange
    let listener = bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let device = MockVirtualKeyboard::new();
    let probe = device.probe();
    let use_case = InjectKeysUseCase::new(KeyIdentifierTable::global(), Box::new(device));
    let session = tokio::spawn(serve_single_session(listener, use_case));

    let bytes = wire(&[
        KeyEvent::press(KeyIdentifier::Name("shift_l".into())),
        KeyEvent::press(KeyIdentifier::Char("H".into())),
        KeyEvent::release(KeyIdentifier::Char("H".into())),
        KeyEvent::release(KeyIdentifier::Name("shift_l".into())),
        KeyEvent::press(KeyIdentifier::Char("i".into())),
        KeyEvent::release(KeyIdentifier::Char("i".into())),
        KeyEvent::press(KeyIdentifier::Name("enter".into())),
    ]);

    // Act: write in uneven pieces, then close mid-frame.
    let mut client = TcpStream::connect(addr).await.unwrap();
    for piece in bytes.chunks(7) {
        client.write_all(piece).await.unwrap();
    }
    client.write_all(br#"{"type":"release","key_"#).await.unwrap();
    drop(client);
    let report = session.await.unwrap().expect("session");

    // Assert
    assert!(matches!(report.end, SessionEnd::PeerClosed));
    assert_eq!(report.events, 7);
    assert_eq!(report.injected, 7);
    assert_eq!(
        probe.keys(),
        vec![
            (KEY_LEFTSHIFT, true),
            (KEY_H, true),
            (KEY_H, false),
            (KEY_LEFTSHIFT, false),
            (KEY_I, true),
            (KEY_I, false),
            (KEY_ENTER, true),
        ]
    );
    assert_eq!(probe.drop_count(), 1);
}

#[tokio::test]
async fn test_listener_is_closed_after_first_connection() {
    // Arrange
    let listener = bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let use_case =
        InjectKeysUseCase::new(KeyIdentifierTable::global(), Box::new(MockVirtualKeyboard::new()));
    let session = tokio::spawn(serve_single_session(listener, use_case));
    let first = TcpStream::connect(addr).await.unwrap();

    // Act: give the session time to accept and drop the listener.
    tokio::time::sleep(Duration::from_millis(100)).await;
    let second = TcpStream::connect(addr).await;

    // Assert
    assert!(second.is_err(), "a second controller must be refused");
    drop(first);
    session.await.unwrap().expect("session");
}

#[tokio::test]
async fn test_cancelled_session_releases_device_once() {
    // Arrange
    let listener = bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
    let addr = listener.local_addr().unwrap();
    let device = MockVirtualKeyboard::new();
    let probe = device.probe();
    let use_case = InjectKeysUseCase::new(KeyIdentifierTable::global(), Box::new(device));
    let _client = TcpStream::connect(addr).await.unwrap();

    // Act: the same race main() runs against Ctrl-C.
    tokio::select! {
        _ = serve_single_session(listener, use_case) => panic!("session must still be open"),
        _ = tokio::time::sleep(Duration::from_millis(50)) => {}
    }

    // Assert
    assert_eq!(probe.drop_count(), 1);
}
