use penny_lab_abstract::{CompletionConfig, FlowKey, TraceConfig};
use penny_lab_trace::{FlowReconstructor, TraceError, completion_times, read_flow_records, reconstruct};

/// Two bulk flows from a dumbbell run plus coordination traffic and noise.
const TRACE: &str = "\
+ 1.000000 /NodeList/0/DeviceList/1/$ns3::PointToPointNetDevice/TxQueue/Enqueue ns3::PppHeader (Point-to-Point Protocol: IP (0x0021)) ns3::Ipv4Header (tos 0x0 DSCP Default ECN Not-ECT ttl 64 id 0 protocol 6 offset (bytes) 0 flags [none] length: 60 10.1.1.1 > 10.2.1.1) ns3::TcpHeader (49153 > 5000 [SYN] Seq=0 Ack=0 Win=65535 Options: MSS(536))
- 1.000000 /NodeList/0/DeviceList/1/$ns3::PointToPointNetDevice/TxQueue/Dequeue ns3::PppHeader (Point-to-Point Protocol: IP (0x0021)) ns3::Ipv4Header (tos 0x0 DSCP Default ECN Not-ECT ttl 64 id 0 protocol 6 offset (bytes) 0 flags [none] length: 60 10.1.1.1 > 10.2.1.1) ns3::TcpHeader (49153 > 5000 [SYN] Seq=0 Ack=0 Win=65535 Options: MSS(536))
- 1.000500 /NodeList/0/DeviceList/1/$ns3::PointToPointNetDevice/TxQueue/Dequeue ns3::PppHeader (Point-to-Point Protocol: IP (0x0021)) ns3::Ipv4Header (tos 0x0 DSCP Default ECN Not-ECT ttl 64 id 1 protocol 6 offset (bytes) 0 flags [none] length: 60 10.1.1.1 > 10.2.1.1) ns3::TcpHeader (20001 > 20002 [SYN] Seq=0 Ack=0 Win=65535)
- 1.250000 /NodeList/0/DeviceList/1/$ns3::PointToPointNetDevice/TxQueue/Dequeue ns3::PppHeader (Point-to-Point Protocol: IP (0x0021)) ns3::Ipv4Header (tos 0x0 DSCP Default ECN Not-ECT ttl 64 id 2 protocol 6 offset (bytes) 0 flags [none] length: 60 10.1.1.2 > 10.2.1.1) ns3::TcpHeader (49154 > 5000 [SYN] Seq=0 Ack=0 Win=65535)
r 1.040000 /NodeList/0/DeviceList/1/$ns3::PointToPointNetDevice/MacRx ns3::Ipv4Header (tos 0x0 DSCP Default ECN Not-ECT ttl 63 id 0 protocol 6 offset (bytes) 0 flags [none] length: 60 10.2.1.1 > 10.1.1.1) ns3::TcpHeader (5000 > 49153 [SYN|ACK] Seq=0 Ack=1 Win=65535)
r 1.080000 /NodeList/0/DeviceList/1/$ns3::PointToPointNetDevice/MacRx ns3::Ipv4Header (tos 0x0 DSCP Default ECN Not-ECT ttl 63 id 1 protocol 6 offset (bytes) 0 flags [none] length: 52 10.2.1.1 > 10.1.1.1) ns3::TcpHeader (5000 > 49153 [ACK] Seq=1 Ack=1025 Win=65535)
r 1.090000 /NodeList/0/DeviceList/1/$ns3::PointToPointNetDevice/MacRx ns3::Ipv4Header (tos 0x0 DSCP Default ECN Not-ECT ttl 63 id 2 protocol 6 offset (bytes) 0 flags [none] length: 52 10.2.1.1 > 10.1.1.1) ns3::TcpHeader (5000 > 49153 [ACK] Seq=1 Ack=1025 Win=65535)
r 1.100000 /NodeList/0/DeviceList/1/$ns3::PointToPointNetDevice/MacRx ns3::ArpHeader (reply source mac: 00-06-00:00:00:00:00:03)
r 1.120000 /NodeList/0/DeviceList/1/$ns3::PointToPointNetDevice/MacRx ns3::Ipv4Header (tos 0x0 ttl 63 id 3 protocol 6 offset (bytes) 0 flags [none] length: 52 10.2.1.1 > 10.1.1.1) ns3::TcpHeader (5000 > 49153 [ACK] Seq=1 Ack=2050 Win=65535)
r 1.290000 /NodeList/0/DeviceList/1/$ns3::PointToPointNetDevice/MacRx ns3::Ipv4Header (tos 0x0 ttl 63 id 4 protocol 6 offset (bytes) 0 flags [none] length: 60 10.2.1.1 > 10.1.1.2) ns3::TcpHeader (5000 > 49154 [SYN|ACK] Seq=0 Ack=1 Win=65535)
r 1.300000 /NodeList/0/DeviceList/1/$ns3::PointToPointNetDevice/MacRx ns3::Ipv4Header (tos 0x0 ttl 63 id 5 protocol 6 offset (bytes) 0 flags [none] length: 52 10.2.1.1 > 10.1.1.3) ns3::TcpHeader (5000 > 49155 [ACK] Seq=1 Ack=1025 Win=65535)
r 1.310000 /NodeList/0/DeviceList/1/$ns3::PointToPointNetDevice/MacRx ns3::Ipv4Header (tos 0x0 ttl 63 id 6 protocol 6 offset (bytes) 0 flags [none] length: 52 10.2.1.2 > 10.1.1.1) ns3::TcpHeader (20002 > 20001 [ACK] Seq=1 Ack=9 Win=65535)
";

#[test]
fn reconstructs_every_measured_flow() {
    let (table, summary) = reconstruct(TRACE, TraceConfig::default());

    let keys: Vec<String> = table.keys().map(ToString::to_string).collect();
    assert_eq!(keys, ["49153-5000", "49154-5000"]);

    let first = table.get(&FlowKey::new(49153, 5000)).unwrap();
    assert_eq!(first.start, "1.000000");
    let acks: Vec<(u32, &str)> = first.acks.iter().map(|(a, t)| (*a, t.as_str())).collect();
    assert_eq!(acks, [(1, "1.040000"), (1025, "1.080000"), (2050, "1.120000")]);

    assert_eq!(summary.control, 2);
    assert_eq!(summary.repeated_acks, 1);
    assert_eq!(summary.malformed, 0);
    assert_eq!(summary.unmatched.len(), 1);
    assert_eq!(summary.unmatched[0].key, FlowKey::new(49155, 5000));
    assert_eq!(summary.unmatched[0].line, 11);
}

#[test]
fn serialized_flows_read_back_identically() {
    let (table, _) = reconstruct(TRACE, TraceConfig::default());
    let text = table.to_records_string().unwrap();
    assert!(text.starts_with("49153-5000\t{\"s\":\"1.000000\",\"acks\":{\"1\":"));
    assert_eq!(read_flow_records(&text).unwrap(), table);
}

#[test]
fn completion_times_follow_the_records() {
    let (table, _) = reconstruct(TRACE, TraceConfig::default());
    let text = table.to_records_string().unwrap();
    let table = read_flow_records(&text).unwrap();

    let config = CompletionConfig {
        segment_size: 1024,
        ack_offset: 2,
    };
    let samples = completion_times(&table, &config, 2).unwrap();
    assert_eq!(samples.samples.len(), 1);
    assert!((samples.samples[0] - 0.12).abs() < 1e-9);
    assert_eq!(samples.incomplete, vec![FlowKey::new(49154, 5000)]);
}

#[test]
fn traces_split_across_files_merge_first_write_wins() {
    let lines: Vec<&str> = TRACE.lines().collect();
    let (head, tail) = lines.split_at(6);

    let mut first = FlowReconstructor::new(TraceConfig::default());
    first.ingest_lines(head.iter());
    let (mut merged, _) = first.finish();

    // The tail alone has no SYNs, so its acks cannot be attributed on their own.
    let mut second = FlowReconstructor::new(TraceConfig::default());
    let err = tail
        .iter()
        .find_map(|line| second.ingest(line).err())
        .unwrap();
    assert!(matches!(err, TraceError::UnmatchedAck { .. }));

    let (whole, _) = reconstruct(TRACE, TraceConfig::default());
    let (again, _) = reconstruct(TRACE, TraceConfig::default());
    merged.merge(again);
    assert_eq!(merged, whole);
}
