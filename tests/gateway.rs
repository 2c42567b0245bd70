// ABOUTME: End-to-end tests driving a real Bridge over TCP against an in-process mock device
// ABOUTME: Covers the gateway's documented request/response/reconnect/translation scenarios

use modbus_gateway::config::{DataBitsConfig, DeviceConfig, ParityConfig, SerialConfig, StopBitsConfig};
use modbus_gateway::Bridge;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

fn device_config(listen_bind: &str, upstream_url: &str) -> DeviceConfig {
    DeviceConfig {
        upstream_url: upstream_url.to_string(),
        listen_bind: listen_bind.to_string(),
        timeout: Some(Duration::from_secs(2)),
        connection_time: Duration::ZERO,
        attempts: 2,
        serial: SerialConfig {
            baud: 19200,
            data_bits: DataBitsConfig::Eight,
            parity: ParityConfig::Even,
            stop_bits: StopBitsConfig::One,
        },
    }
}

async fn start_bridge(upstream_url: &str) -> (Bridge, std::net::SocketAddr) {
    let config = device_config("127.0.0.1:0", upstream_url);
    let mut bridge = Bridge::new(&config).unwrap();
    bridge.start().await.unwrap();
    let addr = bridge.address().unwrap();
    (bridge, addr)
}

fn spawn_accept_loop(bridge: Bridge) {
    let mut bridge = bridge;
    tokio::spawn(async move {
        let _ = bridge.serve_forever().await;
    });
}

/// A mock Modbus TCP device: accepts one connection, reads MBAP requests,
/// and answers each with the next scripted response (echoing the request's
/// transaction id).
async fn mock_device(listener: TcpListener, responses: Vec<Vec<u8>>) {
    let (mut stream, _) = listener.accept().await.unwrap();
    for response_body in responses {
        let mut header = [0u8; 6];
        if stream.read_exact(&mut header).await.is_err() {
            return;
        }
        let size = u16::from_be_bytes([header[4], header[5]]) as usize;
        let mut rest = vec![0u8; size];
        stream.read_exact(&mut rest).await.unwrap();

        let txid = [header[0], header[1]];
        let mut reply = Vec::with_capacity(6 + response_body.len());
        reply.extend_from_slice(&txid);
        reply.extend_from_slice(&[0x00, 0x00]);
        reply.extend_from_slice(&(response_body.len() as u16).to_be_bytes());
        reply.extend_from_slice(&response_body);
        stream.write_all(&reply).await.unwrap();
    }
}

fn read_holding_registers_request(txid: u16, unit: u8, start: u16, count: u16) -> Vec<u8> {
    let mut adu = txid.to_be_bytes().to_vec();
    adu.extend_from_slice(&[0x00, 0x00, 0x00, 0x06]);
    adu.push(unit);
    adu.push(0x03);
    adu.extend_from_slice(&start.to_be_bytes());
    adu.extend_from_slice(&count.to_be_bytes());
    adu
}

async fn read_one_mbap_frame(stream: &mut TcpStream) -> Vec<u8> {
    let mut header = [0u8; 6];
    stream.read_exact(&mut header).await.unwrap();
    let size = u16::from_be_bytes([header[4], header[5]]) as usize;
    let mut rest = vec![0u8; size];
    stream.read_exact(&mut rest).await.unwrap();
    let mut adu = header.to_vec();
    adu.extend_from_slice(&rest);
    adu
}

#[tokio::test]
async fn s1_tcp_read_holding_registers() {
    let device_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let device_addr = device_listener.local_addr().unwrap();
    let response_body = vec![0x11, 0x03, 0x02, 0x00, 0x2a];
    tokio::spawn(mock_device(device_listener, vec![response_body.clone()]));

    let (bridge, bridge_addr) = start_bridge(&format!("tcp://{device_addr}")).await;
    spawn_accept_loop(bridge);

    let mut client = TcpStream::connect(bridge_addr).await.unwrap();
    let request = read_holding_registers_request(1, 0x11, 0, 1);
    client.write_all(&request).await.unwrap();

    let response = read_one_mbap_frame(&mut client).await;
    assert_eq!(&response[0..2], &[0x00, 0x01]);
    assert_eq!(&response[6..], response_body.as_slice());
}

#[tokio::test]
async fn s2_different_request_same_session() {
    let device_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let device_addr = device_listener.local_addr().unwrap();
    let first = vec![0x11, 0x03, 0x02, 0x00, 0x01];
    let second = vec![0x11, 0x03, 0x04, 0x00, 0x02, 0x00, 0x03];
    tokio::spawn(mock_device(device_listener, vec![first.clone(), second.clone()]));

    let (bridge, bridge_addr) = start_bridge(&format!("tcp://{device_addr}")).await;
    spawn_accept_loop(bridge);

    let mut client = TcpStream::connect(bridge_addr).await.unwrap();

    client
        .write_all(&read_holding_registers_request(1, 0x11, 0, 1))
        .await
        .unwrap();
    let response_one = read_one_mbap_frame(&mut client).await;
    assert_eq!(&response_one[6..], first.as_slice());

    client
        .write_all(&read_holding_registers_request(2, 0x11, 10, 2))
        .await
        .unwrap();
    let response_two = read_one_mbap_frame(&mut client).await;
    assert_eq!(&response_two[0..2], &[0x00, 0x02]);
    assert_eq!(&response_two[6..], second.as_slice());
}

#[tokio::test]
async fn s3_concurrent_clients_do_not_mispair() {
    let device_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let device_addr = device_listener.local_addr().unwrap();

    let a_response = vec![0x11, 0x03, 0x02, 0xAA, 0xAA];
    let b_response = vec![0x12, 0x03, 0x02, 0xBB, 0xBB];
    let responses: Vec<Vec<u8>> = (0..22)
        .map(|i| if i % 2 == 0 { a_response.clone() } else { b_response.clone() })
        .collect();
    tokio::spawn(mock_device(device_listener, responses));

    let (bridge, bridge_addr) = start_bridge(&format!("tcp://{device_addr}")).await;
    spawn_accept_loop(bridge);

    let client_a = tokio::spawn({
        let expected = a_response.clone();
        async move {
            let mut client = TcpStream::connect(bridge_addr).await.unwrap();
            for i in 0..10u16 {
                client
                    .write_all(&read_holding_registers_request(i, 0x11, 0, 1))
                    .await
                    .unwrap();
                let response = read_one_mbap_frame(&mut client).await;
                assert_eq!(&response[6..], expected.as_slice());
            }
        }
    });

    let client_b = tokio::spawn({
        let expected = b_response.clone();
        async move {
            let mut client = TcpStream::connect(bridge_addr).await.unwrap();
            for i in 0..12u16 {
                client
                    .write_all(&read_holding_registers_request(i, 0x12, 10, 2))
                    .await
                    .unwrap();
                let response = read_one_mbap_frame(&mut client).await;
                assert_eq!(&response[6..], expected.as_slice());
            }
        }
    });

    client_a.await.unwrap();
    client_b.await.unwrap();
}

#[tokio::test]
async fn s4_misbehaving_clients_do_not_disrupt_well_behaved_ones() {
    let device_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let device_addr = device_listener.local_addr().unwrap();
    let response_body = vec![0x11, 0x03, 0x02, 0x00, 0x01];
    tokio::spawn(mock_device(device_listener, vec![response_body.clone()]));

    let (bridge, bridge_addr) = start_bridge(&format!("tcp://{device_addr}")).await;
    spawn_accept_loop(bridge);

    // Peer A: connects and immediately disconnects.
    {
        let _peer_a = TcpStream::connect(bridge_addr).await.unwrap();
    }

    // Peer B: writes a request then disconnects before reading the response.
    {
        let mut peer_b = TcpStream::connect(bridge_addr).await.unwrap();
        peer_b
            .write_all(&read_holding_registers_request(1, 0x11, 0, 1))
            .await
            .unwrap();
    }

    tokio::time::sleep(Duration::from_millis(50)).await;

    // Peer C: performs a normal exchange and must succeed.
    let mut peer_c = TcpStream::connect(bridge_addr).await.unwrap();
    peer_c
        .write_all(&read_holding_registers_request(2, 0x11, 0, 1))
        .await
        .unwrap();
    let response = read_one_mbap_frame(&mut peer_c).await;
    assert_eq!(&response[6..], response_body.as_slice());
}

#[tokio::test]
async fn s5_device_drop_and_lazy_reconnect() {
    let device_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let device_addr = device_listener.local_addr().unwrap();

    // First device instance accepts one connection, answers nothing, and
    // drops — simulating the upstream going away.
    let first_device = tokio::spawn(async move {
        let (stream, _) = device_listener.accept().await.unwrap();
        drop(stream);
    });

    let (bridge, bridge_addr) = start_bridge(&format!("tcp://{device_addr}")).await;
    spawn_accept_loop(bridge);

    let mut client = TcpStream::connect(bridge_addr).await.unwrap();
    client
        .write_all(&read_holding_registers_request(1, 0x11, 0, 1))
        .await
        .unwrap();
    let mut buf = [0u8; 1];
    let read = client.read(&mut buf).await.unwrap();
    assert_eq!(read, 0, "client observes the bridge closing the connection");
    first_device.await.unwrap();

    // Device comes back; a fresh client request must succeed via reconnect.
    let response_body = vec![0x11, 0x03, 0x02, 0x00, 0x07];
    let second_listener = TcpListener::bind(device_addr).await.unwrap();
    tokio::spawn(mock_device(second_listener, vec![response_body.clone()]));

    let mut client = TcpStream::connect(bridge_addr).await.unwrap();
    client
        .write_all(&read_holding_registers_request(2, 0x11, 0, 1))
        .await
        .unwrap();
    let response = read_one_mbap_frame(&mut client).await;
    assert_eq!(&response[6..], response_body.as_slice());
}

#[tokio::test]
async fn s6_rtu_translation() {
    let device_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let device_addr = device_listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut stream, _) = device_listener.accept().await.unwrap();
        let mut request = [0u8; 8];
        stream.read_exact(&mut request).await.unwrap();
        assert_eq!(request, [0x01, 0x03, 0x00, 0x01, 0x00, 0x04, 0x15, 0xc9]);

        let reply = [0x01, 0x03, 0x08, 0x00, 0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x04, 0x0d, 0x14];
        stream.write_all(&reply).await.unwrap();
    });

    let (bridge, bridge_addr) = start_bridge(&format!("tcp+rtu://{device_addr}")).await;
    spawn_accept_loop(bridge);

    let mut client = TcpStream::connect(bridge_addr).await.unwrap();
    let request = read_holding_registers_request(0x6df5, 1, 1, 4);
    client.write_all(&request).await.unwrap();

    let response = read_one_mbap_frame(&mut client).await;
    assert_eq!(
        response,
        vec![0x6d, 0xf5, 0x00, 0x00, 0x00, 0x0b, 0x01, 0x03, 0x08, 0x00, 0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x04]
    );
}
