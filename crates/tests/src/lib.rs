//! # Integration Tests
//!
//! 集成测试与端到端测试。
//!
//! 负责：
//! - 合约快照测试
//! - 进程内 / 远端 e2e 测试
//! - 配置到端口的装配测试

#[cfg(test)]
mod contract_tests {
    use contracts::{connection, ConnectionDescriptor, Keyword, StreamSri};

    #[test]
    fn test_connection_table_properties() {
        let rule = ConnectionDescriptor::new("c1", "s1", "dataFloat_out");
        let properties = connection::encode(&rule);
        assert_eq!(properties.len(), 3);
        assert_eq!(properties[0].id, connection::CONNECTION_ID_PROPERTY);

        // Unknown properties are ignored
        let mut extended = properties.clone();
        extended.push(Keyword::new("vendor::extra", 1_i64));
        assert_eq!(connection::decode(&extended).unwrap(), rule);
    }

    #[test]
    fn test_default_sri_snapshot() {
        let sri = StreamSri::new("s1");
        assert_eq!(sri.hversion, 1);
        assert_eq!(sri.xdelta, 1.0);
        assert_eq!(sri.xunits, 1);
        assert_eq!(sri.mode, 0);
        assert!(!sri.blocking);
        assert!(sri.keywords.is_empty());
    }
}

/// 进程内 e2e：OutPort -> LocalTransport -> InPort
#[cfg(test)]
mod local_e2e_tests {
    use std::sync::Arc;

    use contracts::{ConnectionDescriptor, ContractError, FloatTraits, Packet, PortTransport};
    use contracts::{PortUsage, PrecisionTime, SharedBuffer, StreamSri, TransportKind};
    use inport::InPort;
    use outport::{OutFloatPort, Peer};
    use parking_lot::Mutex;

    fn consumers(port: &OutFloatPort, ids: &[&str]) -> Vec<Arc<InPort<FloatTraits>>> {
        ids.iter()
            .map(|id| {
                let consumer = Arc::new(InPort::<FloatTraits>::new(format!("in_{id}")));
                port.attach(id, Peer::local(consumer.clone())).unwrap();
                consumer
            })
            .collect()
    }

    fn drain(consumer: &InPort<FloatTraits>) -> Vec<inport::DataTransfer<SharedBuffer<f32>>> {
        std::iter::from_fn(|| consumer.get_packet()).collect()
    }

    #[test]
    fn test_two_connections_one_stream() {
        let port = OutFloatPort::new("dataFloat_out");
        let ins = consumers(&port, &["C1", "C2"]);

        let mut sri = StreamSri::new("S1");
        sri.xdelta = 0.001;
        let stream = port.create_stream_with_sri(sri.clone()).unwrap();
        stream.send(vec![1.0, 2.0, 3.0], PrecisionTime::now()).unwrap();
        stream.send(vec![4.0, 5.0], PrecisionTime::now()).unwrap();
        stream.close().unwrap();

        let c1 = drain(&ins[0]);
        let c2 = drain(&ins[1]);
        for received in [&c1, &c2] {
            assert_eq!(received.len(), 3);
            assert!(received[0].sri_changed);
            assert_eq!(*received[0].sri, sri);
            assert_eq!(received[0].data.as_slice(), &[1.0, 2.0, 3.0]);
            assert_eq!(received[1].data.as_slice(), &[4.0, 5.0]);
            assert!(!received[1].sri_changed);
            assert!(received[2].eos);
            assert!(received[2].data.is_empty());
        }
        // Both consumers hold the producer's buffer
        assert!(c1[0].data.ptr_eq(&c2[0].data));
        assert!(!stream.is_valid());
        assert!(port.get_active_sris().is_empty());
    }

    #[test]
    fn test_routing_filter_scopes_streams() {
        let port = OutFloatPort::new("dataFloat_out");
        let ins = consumers(&port, &["C1", "C2"]);
        port.update_routing_filter(vec![ConnectionDescriptor::new("C1", "S1", "dataFloat_out")])
            .unwrap();

        port.push_packet(vec![1.0], PrecisionTime::now(), false, "S1").unwrap();
        port.push_packet(vec![2.0], PrecisionTime::now(), false, "S2").unwrap();

        let c1 = drain(&ins[0]);
        assert_eq!(c1.len(), 1);
        assert_eq!(c1[0].stream_id, "S1");
        assert!(drain(&ins[1]).is_empty());

        // Rules for another port leave this one open
        port.update_routing_filter(vec![ConnectionDescriptor::new("C1", "S1", "other")])
            .unwrap();
        port.push_packet(vec![3.0], PrecisionTime::now(), false, "S2").unwrap();
        assert_eq!(drain(&ins[0]).len(), 1);
        assert_eq!(drain(&ins[1]).len(), 1);
    }

    /// Transport whose consumer went away
    struct Vanished;

    impl PortTransport<FloatTraits> for Vanished {
        fn connection_id(&self) -> &str {
            "C2"
        }

        fn kind(&self) -> TransportKind {
            TransportKind::Custom
        }

        fn send_sri(&self, _sri: &StreamSri) -> Result<(), ContractError> {
            Err(ContractError::transport("C2", "object does not exist"))
        }

        fn send(&self, _packet: &Packet<SharedBuffer<f32>>) -> Result<(), ContractError> {
            Err(ContractError::transport("C2", "object does not exist"))
        }
    }

    #[test]
    fn test_fault_isolation() {
        let port = OutFloatPort::new("dataFloat_out");
        let c1 = Arc::new(InPort::<FloatTraits>::new("in_C1"));
        let c3 = Arc::new(InPort::<FloatTraits>::new("in_C3"));
        let events = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&events);
        port.set_disconnect_listener(move |id| log.lock().push(id.to_string()));

        port.attach("C1", Peer::local(c1.clone())).unwrap();
        port.attach("C2", Peer::transport(Vanished)).unwrap();
        port.attach("C3", Peer::local(c3.clone())).unwrap();

        port.push_packet(vec![1.0, 2.0], PrecisionTime::now(), false, "S1").unwrap();

        assert_eq!(drain(&c1).len(), 1);
        assert_eq!(drain(&c3).len(), 1);
        let ids: Vec<_> = port
            .get_connections()
            .iter()
            .map(|c| c.connection_id.clone())
            .collect();
        assert_eq!(ids, vec!["C1", "C3"]);
        assert_eq!(*events.lock(), vec!["C2".to_string()]);

        // Later pushes keep flowing
        port.push_packet(vec![3.0], PrecisionTime::now(), false, "S1").unwrap();
        assert_eq!(drain(&c1).len(), 1);
    }

    #[test]
    fn test_sri_round_trip() {
        let port = OutFloatPort::new("dataFloat_out");
        let mut sri = StreamSri::new("S1");
        sri.mode = 1;
        sri.subsize = 1024;
        sri.set_keyword("CHAN_RF", 2.4e9);
        sri.set_keyword("LABEL", "wideband");
        port.push_sri(sri.clone()).unwrap();

        assert_eq!(port.get_current_sri()["S1"], sri);
        assert_eq!(port.get_active_sris(), vec![sri]);
    }

    #[test]
    fn test_sri_not_flushed_without_data() {
        let port = OutFloatPort::new("dataFloat_out");
        let ins = consumers(&port, &["C1"]);
        port.push_sri(StreamSri::new("S1")).unwrap();
        port.detach("C1").unwrap();

        assert!(drain(&ins[0]).is_empty());
        assert!(ins[0].active_sris().is_empty());
    }

    #[test]
    fn test_late_attach_gets_sri_first() {
        let port = OutFloatPort::new("dataFloat_out");
        let mut sri = StreamSri::new("S1");
        sri.xdelta = 0.5;
        port.push_sri(sri.clone()).unwrap();
        port.push_packet(vec![1.0], PrecisionTime::now(), false, "S1").unwrap();

        let ins = consumers(&port, &["C1"]);
        port.push_packet(vec![2.0], PrecisionTime::now(), false, "S1").unwrap();
        let received = drain(&ins[0]);
        assert_eq!(received.len(), 1);
        assert!(received[0].sri_changed);
        assert_eq!(received[0].sri.xdelta, 0.5);
    }

    #[test]
    fn test_idempotent_close_and_state() {
        let port = OutFloatPort::new("dataFloat_out");
        let ins = consumers(&port, &["C1"]);
        assert_eq!(port.state(), PortUsage::Idle);

        let stream = port.create_stream("S1").unwrap();
        stream.send(vec![1.0], PrecisionTime::now()).unwrap();
        assert_eq!(port.state(), PortUsage::Active);
        stream.close().unwrap();
        stream.close().unwrap();

        let eos: Vec<_> = drain(&ins[0]).into_iter().filter(|p| p.eos).collect();
        assert_eq!(eos.len(), 1);
    }

    #[test]
    fn test_consumer_backlog_marks_port_busy() {
        let port = OutFloatPort::new("dataFloat_out");
        let consumer = Arc::new(InPort::<FloatTraits>::with_max_queue_depth("in", 2));
        port.attach("C1", Peer::local(consumer.clone())).unwrap();

        port.push_packet(vec![1.0], PrecisionTime::now(), false, "S1").unwrap();
        port.push_packet(vec![2.0], PrecisionTime::now(), false, "S1").unwrap();
        assert_eq!(port.state(), PortUsage::Busy);

        // Overflow is the consumer's concern; the producer never blocks
        port.push_packet(vec![3.0], PrecisionTime::now(), false, "S1").unwrap();
        let received = consumer.get_packet().unwrap();
        assert!(received.input_queue_flushed);
        assert!(received.sri_changed);
    }
}

/// 并发：管理操作与数据推送同时进行
#[cfg(test)]
mod concurrency_tests {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;

    use contracts::{ConnectionDescriptor, FloatTraits, PrecisionTime};
    use inport::InPort;
    use outport::{OutFloatPort, Peer};

    const PACKETS: usize = 5000;

    #[test]
    fn test_admin_churn_keeps_stream_order() {
        let port = OutFloatPort::new("dataFloat_out");
        let stable = Arc::new(InPort::<FloatTraits>::with_max_queue_depth(
            "stable",
            PACKETS + 1,
        ));
        port.attach("stable", Peer::local(stable.clone())).unwrap();

        let done = Arc::new(AtomicBool::new(false));
        let admin = {
            let port = port.clone();
            let done = Arc::clone(&done);
            thread::spawn(move || {
                // Both tables keep "stable" eligible for S1
                let scoped = vec![
                    ConnectionDescriptor::new("stable", "*", ""),
                    ConnectionDescriptor::new("churn", "S1", "dataFloat_out"),
                ];
                let mut rounds = 0usize;
                loop {
                    let churn = Arc::new(InPort::<FloatTraits>::new("churn"));
                    port.attach("churn", Peer::local(churn)).unwrap();
                    let rules = if rounds % 2 == 0 { scoped.clone() } else { Vec::new() };
                    port.update_routing_filter(rules).unwrap();
                    assert!(!port.statistics().is_empty());
                    port.detach("churn").unwrap();
                    rounds += 1;
                    if done.load(Ordering::Acquire) {
                        break rounds;
                    }
                }
            })
        };

        for i in 0..PACKETS {
            port.push_packet(vec![i as f32], PrecisionTime::now(), false, "S1")
                .unwrap();
        }
        done.store(true, Ordering::Release);
        let rounds = admin.join().unwrap();
        assert!(rounds > 0);

        let mut expected = 0usize;
        while let Some(packet) = stable.get_packet() {
            assert_eq!(packet.sri_changed, expected == 0);
            assert!(!packet.input_queue_flushed);
            assert_eq!(packet.data.as_slice(), &[expected as f32]);
            expected += 1;
        }
        assert_eq!(expected, PACKETS);
        assert_eq!(port.get_connections().len(), 1);
    }

    #[test]
    fn test_producers_on_separate_streams() {
        let port = OutFloatPort::new("dataFloat_out");
        let consumer = Arc::new(InPort::<FloatTraits>::with_max_queue_depth("in", 4 * 1000 + 1));
        port.attach("C1", Peer::local(consumer.clone())).unwrap();

        let producers: Vec<_> = (0..4)
            .map(|n| {
                let port = port.clone();
                thread::spawn(move || {
                    let stream = port.create_stream(&format!("S{n}")).unwrap();
                    for i in 0..1000 {
                        stream.send(vec![i as f32], PrecisionTime::now()).unwrap();
                    }
                })
            })
            .collect();
        for producer in producers {
            producer.join().unwrap();
        }

        for n in 0..4 {
            let id = format!("S{n}");
            let mut expected = 0usize;
            while let Some(packet) = consumer.get_packet_for(&id) {
                assert_eq!(packet.sri_changed, expected == 0);
                assert_eq!(packet.data.as_slice(), &[expected as f32]);
                expected += 1;
            }
            assert_eq!(expected, 1000);
        }
        assert_eq!(port.get_active_sris().len(), 4);
    }
}

/// 远端 e2e：OutPort -> RemoteTransport -> ChannelEndpoint
#[cfg(test)]
mod remote_e2e_tests {
    use bytes::Bytes;
    use contracts::{Packet, PrecisionTime, ShortTraits, StreamSri, WireFormat};
    use contracts::{PortConfig, SharedBuffer, TransportKind};
    use outport::{decode_message, ChannelEndpoint, OutPort, OutShortPort, Peer, WireMessage};
    use tokio::time::{timeout, Duration};

    type Frames = Vec<WireMessage<SharedBuffer<i16>>>;

    async fn collect(
        mut rx: tokio::sync::mpsc::UnboundedReceiver<Bytes>,
        format: WireFormat,
    ) -> Frames {
        let mut frames = Vec::new();
        while let Ok(Some(frame)) = timeout(Duration::from_secs(2), rx.recv()).await {
            frames.push(decode_message(&frame, format).unwrap());
        }
        frames
    }

    #[tokio::test]
    async fn test_metadata_before_data_over_the_wire() {
        let port = OutShortPort::new("dataShort_out");
        let (endpoint, rx) = ChannelEndpoint::new("remote");
        port.attach("R1", Peer::remote(endpoint)).unwrap();
        assert_eq!(port.get_connections()[0].kind, TransportKind::Remote);

        port.push_packet(vec![1i16, 2, 3], PrecisionTime::now(), false, "S1")
            .unwrap();
        port.push_packet(Vec::<i16>::new(), PrecisionTime::now(), true, "S1")
            .unwrap();
        port.detach("R1").unwrap();

        let frames = collect(rx, WireFormat::Json).await;
        assert_eq!(frames.len(), 3);
        match &frames[0] {
            WireMessage::Sri(sri) => assert_eq!(*sri, StreamSri::new("S1")),
            other => panic!("expected SRI first, got {other:?}"),
        }
        match &frames[1] {
            WireMessage::Packet(Packet { data, eos, .. }) => {
                assert_eq!(data.as_slice(), &[1, 2, 3]);
                assert!(!eos);
            }
            other => panic!("unexpected frame: {other:?}"),
        }
        assert!(matches!(&frames[2], WireMessage::Packet(p) if p.eos));
    }

    #[tokio::test]
    async fn test_bincode_from_config() {
        let mut config = PortConfig::new("dataShort_out");
        config.remote.format = WireFormat::Bincode;
        let port: OutShortPort = OutPort::from_config(&config).unwrap();
        let (endpoint, rx) = ChannelEndpoint::new("remote");
        port.attach("R1", Peer::remote(endpoint)).unwrap();

        port.push_packet(vec![7i16], PrecisionTime::now(), false, "S1")
            .unwrap();
        port.detach("R1").unwrap();

        let frames = collect(rx, WireFormat::Bincode).await;
        assert_eq!(frames.len(), 2);
        assert!(matches!(&frames[0], WireMessage::Sri(_)));
    }

    #[tokio::test]
    async fn test_dead_endpoint_is_detached() {
        let port = OutShortPort::new("dataShort_out");
        let (endpoint, rx) = ChannelEndpoint::new("remote");
        port.attach("R1", Peer::remote(endpoint)).unwrap();
        drop(rx);

        port.push_packet(vec![1i16], PrecisionTime::now(), false, "S1")
            .unwrap();
        // Give the worker time to hit the closed receiver
        tokio::time::sleep(Duration::from_millis(50)).await;
        port.push_packet(vec![2i16], PrecisionTime::now(), false, "S1")
            .unwrap();

        assert!(port.get_connections().is_empty());
        assert_eq!(port.statistics().len(), 0);
    }

    #[test]
    fn test_remote_attach_requires_runtime() {
        let port = OutShortPort::new("dataShort_out");
        let (endpoint, _rx) = ChannelEndpoint::new("remote");
        assert!(port.attach("R1", Peer::remote(endpoint)).is_err());
        assert!(port.get_connections().is_empty());
    }
}

/// 配置装配与统计汇总
#[cfg(test)]
mod config_tests {
    use std::sync::Arc;

    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{ConnectionDescriptor, FloatTraits, PrecisionTime};
    use inport::InPort;
    use observability::StatisticsAggregator;
    use outport::{OutFloatPort, OutPort, Peer};

    const PORT_TOML: &str = r#"
name = "dataFloat_out"

[stats]
history_window = 4

[[connection_table]]
connection_id = "C1"
stream_id = "*"
port_name = "dataFloat_out"
"#;

    #[test]
    fn test_port_from_loaded_config() {
        let config = ConfigLoader::load_from_str(PORT_TOML, ConfigFormat::Toml).unwrap();
        let port: OutFloatPort = OutPort::from_config(&config).unwrap();
        assert_eq!(
            port.routing_filter(),
            vec![ConnectionDescriptor::new("C1", "*", "dataFloat_out")]
        );

        let c1 = Arc::new(InPort::<FloatTraits>::new("in_C1"));
        let c2 = Arc::new(InPort::<FloatTraits>::new("in_C2"));
        port.attach("C1", Peer::local(c1.clone())).unwrap();
        port.attach("C2", Peer::local(c2.clone())).unwrap();

        let mut aggregator = StatisticsAggregator::new();
        for i in 0..6 {
            port.push_packet(vec![i as f32; 8], PrecisionTime::now(), false, "S1")
                .unwrap();
            std::thread::sleep(std::time::Duration::from_millis(2));
            aggregator.update(&port.statistics());
        }

        assert_eq!(c1.current_queue_depth(), 6);
        assert_eq!(c2.current_queue_depth(), 0);

        let summary = aggregator.summary();
        assert_eq!(summary.snapshots, 6);
        assert!(summary.links["C1"].bits_per_second.mean > 0.0);
        assert_eq!(summary.links["C2"].bits_per_second.max, 0.0);
        assert!(summary.to_string().contains("Connection C1:"));
    }
}
