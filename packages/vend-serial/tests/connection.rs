use std::time::Duration;

use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};
use vend_serial::{
    commands::Request,
    protocol::{encode, Frame, FrameChecks, HexCase},
    settings::FrameOptions,
    stream::{SerialError, StreamConnection},
    ComState, Connection, MachineState,
};

const TIMEOUT: Duration = Duration::from_millis(100);

fn connect(options: FrameOptions) -> (StreamConnection<DuplexStream>, DuplexStream) {
    let (host, machine) = duplex(1024);
    (StreamConnection::new("pipe", host, options), machine)
}

#[tokio::test]
async fn sends_encoded_frame() {
    let (mut connection, mut machine) = connect(FrameOptions::default());

    let frame = Frame::parse("32", "107", "1").unwrap();
    connection.send(&frame).await.unwrap();

    let mut written = [0u8; 14];
    machine.read_exact(&mut written).await.unwrap();
    assert_eq!(&written[..], b"\x02005 107\x034091");
    assert_eq!(connection.com_state(), ComState::Idle);
    assert_eq!(connection.machine_state(), MachineState::Busy);
}

#[tokio::test]
async fn sends_upper_case_checksum() {
    let (mut connection, mut machine) = connect(FrameOptions {
        hex_case: HexCase::Upper,
        ..Default::default()
    });

    connection
        .send(&Frame::new(1, "200", "ABCDEF").unwrap())
        .await
        .unwrap();

    let mut written = vec![0u8; 19];
    machine.read_exact(&mut written).await.unwrap();
    assert_eq!(&written[15..], b"70D ");
}

#[tokio::test]
async fn receives_split_frames() {
    let (mut connection, mut machine) = connect(FrameOptions::default());

    let mut traffic = b"\r\n".to_vec();
    traffic.extend(encode("1", "100", "").unwrap());
    traffic.extend(encode("3", "200", "ABCDEF").unwrap());

    let writer = tokio::spawn(async move {
        for chunk in traffic.chunks(3) {
            machine.write_all(chunk).await.unwrap();
            tokio::task::yield_now().await;
        }
        machine
    });

    let first = connection.recv(TIMEOUT).await.unwrap();
    let second = connection.recv(TIMEOUT).await.unwrap();
    let _machine = writer.await.unwrap();

    assert_eq!((first.index, first.command.as_str()), (1, "100"));
    assert_eq!((second.index, second.data.as_str()), (3, "ABCDEF"));
    assert_eq!(connection.com_state(), ComState::Idle);
    assert_eq!(connection.machine_state(), MachineState::PowerOn);
}

#[tokio::test]
async fn times_out_mid_frame() {
    let (mut connection, mut machine) = connect(FrameOptions::default());

    let frame = encode("1", "107", "1").unwrap();
    machine.write_all(&frame[..6]).await.unwrap();

    let err = connection.recv(TIMEOUT).await.unwrap_err();
    assert!(matches!(err, SerialError::Timeout));
    assert_eq!(connection.com_state(), ComState::BusyOnReceive);
    assert_eq!(connection.buffered(), 6);

    // The rest of the frame completes it.
    machine.write_all(&frame[6..]).await.unwrap();
    let decoded = connection.recv(TIMEOUT).await.unwrap();
    assert_eq!(decoded.command, "107");
    assert_eq!(connection.com_state(), ComState::Idle);
}

#[tokio::test]
async fn times_out_when_silent() {
    let (mut connection, _machine) = connect(FrameOptions::default());

    let err = connection.recv(TIMEOUT).await.unwrap_err();
    assert!(matches!(err, SerialError::Timeout));
    assert_eq!(connection.com_state(), ComState::Idle);
}

#[tokio::test]
async fn skips_frames_failing_checks() {
    let (mut connection, mut machine) = connect(FrameOptions {
        checks: FrameChecks::CHECKSUM | FrameChecks::MARKERS,
        ..Default::default()
    });

    let mut corrupted = encode("1", "107", "1").unwrap();
    let last = corrupted.len() - 1;
    corrupted[last] = b'0';
    machine.write_all(&corrupted).await.unwrap();
    machine
        .write_all(&encode("2", "107", "2").unwrap())
        .await
        .unwrap();

    let decoded = connection.recv(TIMEOUT).await.unwrap();
    assert_eq!(decoded.index, 2);
}

#[tokio::test]
async fn accepts_unverified_frames_by_default() {
    let (mut connection, mut machine) = connect(FrameOptions::default());

    let mut corrupted = encode("1", "107", "1").unwrap();
    let last = corrupted.len() - 1;
    corrupted[last] = b'0';
    machine.write_all(&corrupted).await.unwrap();

    let decoded = connection.recv(TIMEOUT).await.unwrap();
    assert!(decoded.verify_checksum().is_err());
}

#[tokio::test]
async fn handshake_retries() {
    let (mut connection, mut machine) = connect(FrameOptions::default());

    let responder = tokio::spawn(async move {
        let mut request = [0u8; 14];

        // Ignore the first attempt.
        machine.read_exact(&mut request).await.unwrap();
        machine.read_exact(&mut request).await.unwrap();
        machine
            .write_all(&encode("32", "107", "0").unwrap())
            .await
            .unwrap();
        machine
    });

    let frame = Frame::parse("32", "107", "1").unwrap();
    let reply = connection.handshake(&frame, TIMEOUT, 1).await.unwrap();
    let _machine = responder.await.unwrap();

    assert_eq!(reply.data, "0");
}

#[tokio::test]
async fn handshake_gives_up() {
    let (mut connection, _machine) = connect(FrameOptions::default());

    let frame = Frame::parse("32", "107", "1").unwrap();
    let err = connection.handshake(&frame, TIMEOUT, 2).await.unwrap_err();

    assert!(matches!(err, SerialError::Timeout));
}

#[tokio::test]
async fn request_matches_index() {
    let (mut connection, mut machine) = connect(FrameOptions::default());

    let responder = tokio::spawn(async move {
        let mut request = [0u8; 16];
        machine.read_exact(&mut request).await.unwrap();
        machine
            .write_all(&encode("9", "107", "stale").unwrap())
            .await
            .unwrap();
        machine
            .write_all(&encode("33", "107", "510").unwrap())
            .await
            .unwrap();
        machine
    });

    let request = Request::new(Frame::new(33, "107", "510").unwrap());
    let reply = connection.execute_command(request).await.unwrap();
    let _machine = responder.await.unwrap();

    assert_eq!((reply.index, reply.data.as_str()), (33, "510"));
}

#[tokio::test]
async fn closed_connection() {
    let (mut connection, mut machine) = connect(FrameOptions::default());

    connection.close().await.unwrap();
    assert_eq!(connection.machine_state(), MachineState::PowerOff);

    let mut rest = Vec::new();
    assert_eq!(machine.read_to_end(&mut rest).await.unwrap(), 0);

    let frame = Frame::new(1, "100", "").unwrap();
    assert!(matches!(
        connection.send(&frame).await,
        Err(SerialError::Closed)
    ));
}

#[tokio::test]
async fn peer_hangs_up() {
    let (mut connection, machine) = connect(FrameOptions::default());
    drop(machine);

    assert!(matches!(
        connection.recv(TIMEOUT).await,
        Err(SerialError::Closed)
    ));
}
