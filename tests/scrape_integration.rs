//! Scrape integration tests
//!
//! End-to-end tests for the poll pipeline that verify:
//! - Fetch, decode and extraction against a mock endpoint
//! - Rendered exposition output
//! - Error handling and last-known-good behavior

use hadoop_exporter::collector::{AuthMode, Fetcher};
use hadoop_exporter::extractor::TargetKind;
use hadoop_exporter::poller::Poller;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// A NameNode /jmx answer covering every rule family.
const NAMENODE_BODY: &str = r#"{"beans":[
    {
        "name": "Hadoop:service=NameNode,name=FSNamesystem",
        "modelerType": "FSNamesystem",
        "MissingBlocks": 0,
        "UnderReplicatedBlocks": 5,
        "CapacityTotal": 52844687360,
        "CapacityUsed": 24576,
        "CapacityRemaining": 42917969920,
        "CapacityUsedNonDFS": 9926692864,
        "BlocksTotal": 18,
        "FilesTotal": 37,
        "CorruptBlocks": 0,
        "ExcessBlocks": 0,
        "StaleDataNodes": 0,
        "tag.HAState": "active"
    },
    {
        "name": "Hadoop:service=NameNode,name=NameNodeStatus",
        "modelerType": "org.apache.hadoop.hdfs.server.namenode.NameNode",
        "LastHATransitionTime": 0
    },
    {
        "name": "Hadoop:service=NameNode,name=JvmMetrics",
        "modelerType": "JvmMetrics",
        "GcCountParNew": 14,
        "GcCountConcurrentMarkSweep": 2,
        "GcTimeMillisParNew": 808,
        "GcTimeMillisConcurrentMarkSweep": 41
    },
    {
        "name": "java.lang:type=Memory",
        "modelerType": "sun.management.MemoryImpl",
        "HeapMemoryUsage": {"committed": 1060372480, "init": 1073741824,
                            "max": 1060372480, "used": 124571232}
    },
    {
        "name": "Hadoop:service=NameNode,name=RpcActivityForPort8020",
        "modelerType": "RpcActivityForPort8020",
        "tag.port": "8020",
        "ReceivedBytes": 3911772,
        "SentBytes": 1195664,
        "RpcQueueTimeNumOps": 18515,
        "RpcQueueTimeAvgTime": 0.05,
        "RpcProcessingTimeAvgTime": 0.25,
        "NumOpenConnections": 2,
        "CallQueueLength": 0
    },
    {
        "name": "Hadoop:service=NameNode,name=RpcActivityForPort8061",
        "modelerType": "RpcActivityForPort8061",
        "tag.port": "8061",
        "ReceivedBytes": 120,
        "SentBytes": 88,
        "RpcQueueTimeNumOps": 3,
        "RpcQueueTimeAvgTime": 0.0,
        "RpcProcessingTimeAvgTime": 0.0,
        "NumOpenConnections": 1,
        "CallQueueLength": 0
    }
]}"#;

async fn mock_endpoint(body: &str, status: u16) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jmx"))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(&server)
        .await;
    server
}

fn poller_for(server: &MockServer, kind: TargetKind) -> Poller {
    Poller::new(
        Fetcher::new(2000).unwrap(),
        AuthMode::Anonymous,
        format!("{}/jmx", server.uri()),
        kind,
    )
}

#[tokio::test]
async fn test_namenode_pipeline_renders_all_families() {
    let server = mock_endpoint(NAMENODE_BODY, 200).await;
    let poller = poller_for(&server, TargetKind::NameNode);

    let report = poller.poll().await.unwrap();
    assert_eq!(report.matched, 6);
    assert_eq!(report.suppressed, 0);

    let output = poller.render();

    // FSNamesystem
    assert!(output.contains("hdfs_namenode_fsname_system_missing_blocks 0\n"));
    assert!(output.contains("hdfs_namenode_fsname_system_under_replicated_blocks 5\n"));
    assert!(output.contains("hdfs_namenode_fsname_system_capacity_bytes{mode=\"Total\"} 52844687360"));
    assert!(output.contains("hdfs_namenode_fsname_system_capacity_bytes{mode=\"UsedNonDFS\"} 9926692864"));
    assert!(output.contains("hdfs_namenode_fsname_system_hastate 1\n"));

    // JVM and memory
    assert!(output.contains("hdfs_namenode_jvm_metrics_gc_count{type=\"ParNew\"} 14"));
    assert!(output.contains("hdfs_namenode_jvm_metrics_gc_time_milliseconds{type=\"ConcurrentMarkSweep\"} 41"));
    assert!(output.contains("hdfs_namenode_memory_heap_memory_usage_bytes{mode=\"used\"} 124571232"));

    // RPC activity, one series per port
    assert!(output.contains("hdfs_namenode_rpc_activity_received_bytes{port=\"8020\"} 3911772"));
    assert!(output.contains("hdfs_namenode_rpc_activity_received_bytes{port=\"8061\"} 120"));
    assert!(output.contains("hdfs_namenode_rpc_activity_call_count{port=\"8020\",method=\"QueueTime\"} 18515"));
    assert!(output.contains("hdfs_namenode_rpc_activity_avg_time_milliseconds{port=\"8020\",method=\"RpcProcessingTime\"} 0.25"));

    // Exporter health block is appended
    assert!(output.contains("hadoop_exporter_scrapes_total 1\n"));
    assert!(output.contains("hadoop_exporter_scrape_failures_total 0\n"));

    // HELP/TYPE emitted once per family
    assert_eq!(
        output.matches("# TYPE hdfs_namenode_rpc_activity_received_bytes").count(),
        1
    );
}

#[tokio::test]
async fn test_datanode_pipeline() {
    let body = r#"{"beans":[
        {
            "name": "Hadoop:service=DataNode,name=FSDatasetState-null",
            "modelerType": "org.apache.hadoop.hdfs.server.datanode.fsdataset.impl.FsDatasetImpl",
            "Capacity": 52844687360,
            "DfsUsed": 24576,
            "Remaining": 42917969920,
            "CacheCapacity": 0,
            "CacheUsed": 0,
            "NumFailedVolumes": 0,
            "EstimatedCapacityLostTotal": 0,
            "NumBlocksCached": 0,
            "NumBlocksFailedToCache": 0,
            "NumBlocksFailedToUncache": 0
        },
        {
            "name": "java.lang:type=Memory",
            "modelerType": "sun.management.MemoryImpl",
            "HeapMemoryUsage": {"committed": 100, "init": 90, "max": 200, "used": 50}
        }
    ]}"#;

    let server = mock_endpoint(body, 200).await;
    let poller = poller_for(&server, TargetKind::DataNode);

    let report = poller.poll().await.unwrap();
    assert_eq!(report.matched, 2);

    let output = poller.render();
    assert!(output.contains("hadoop_datanode_fsdataset_capacity_bytes{mode=\"Total\"} 52844687360"));
    assert!(output.contains("hadoop_datanode_fsdataset_failed_volumes 0\n"));
    assert!(output.contains("hadoop_datanode_memory_heap_memory_usage_bytes{mode=\"max\"} 200"));
}

#[tokio::test]
async fn test_journalnode_pipeline() {
    let body = r#"{"beans":[
        {
            "name": "java.lang:type=GarbageCollector,name=ParNew",
            "modelerType": "sun.management.GarbageCollectorImpl",
            "CollectionCount": 21,
            "CollectionTime": 1010
        },
        {
            "name": "java.lang:type=GarbageCollector,name=ConcurrentMarkSweep",
            "modelerType": "sun.management.GarbageCollectorImpl",
            "CollectionCount": 3,
            "CollectionTime": 99
        },
        {
            "name": "java.lang:type=Memory",
            "modelerType": "sun.management.MemoryImpl",
            "HeapMemoryUsage": {"committed": 100, "init": 90, "max": 200, "used": 50}
        }
    ]}"#;

    let server = mock_endpoint(body, 200).await;
    let poller = poller_for(&server, TargetKind::JournalNode);

    poller.poll().await.unwrap();

    let output = poller.render();
    assert!(output.contains("hadoop_journalnode_jvm_gc_count{type=\"ParNew\"} 21"));
    assert!(output.contains("hadoop_journalnode_jvm_gc_time_milliseconds{type=\"ConcurrentMarkSweep\"} 99"));
    assert!(output.contains("hadoop_journalnode_memory_heap_memory_usage_bytes{mode=\"used\"} 50"));
}

#[tokio::test]
async fn test_endpoint_failure_keeps_last_known_good_values() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jmx"))
        .respond_with(ResponseTemplate::new(200).set_body_string(NAMENODE_BODY))
        .expect(1)
        .mount(&server)
        .await;

    let poller = poller_for(&server, TargetKind::NameNode);
    poller.poll().await.unwrap();

    server.reset().await;
    Mock::given(method("GET"))
        .and(path("/jmx"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    assert!(poller.poll().await.is_err());

    // Values from the first poll are still served, and the failure shows up
    // in the exporter's own counters.
    let output = poller.render();
    assert!(output.contains("hdfs_namenode_fsname_system_under_replicated_blocks 5"));
    assert!(output.contains("hadoop_exporter_scrapes_total 2\n"));
    assert!(output.contains("hadoop_exporter_scrape_failures_total 1\n"));
}

#[tokio::test]
async fn test_malformed_body_fails_without_mutating_gauges() {
    let server = mock_endpoint(r#"{"not_beans": []}"#, 200).await;
    let poller = poller_for(&server, TargetKind::NameNode);

    let err = poller.poll().await.unwrap_err();
    assert_eq!(err.stage(), "decode");

    // No target gauge was written; only the health block renders.
    let output = poller.render();
    assert!(!output.contains("hdfs_namenode_"));
    assert!(output.contains("hadoop_exporter_scrape_failures_total 1\n"));
}

#[tokio::test]
async fn test_anonymous_401_is_an_error_not_empty_data() {
    let server = mock_endpoint("", 401).await;
    let poller = poller_for(&server, TargetKind::NameNode);

    let err = poller.poll().await.unwrap_err();
    assert!(err.to_string().contains("requires authentication"));
}

#[tokio::test]
async fn test_slow_endpoint_surfaces_as_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/jmx"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"beans":[]}"#)
                .set_delay(std::time::Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let poller = Poller::new(
        Fetcher::new(50).unwrap(),
        AuthMode::Anonymous,
        format!("{}/jmx", server.uri()),
        TargetKind::NameNode,
    );

    let err = poller.poll().await.unwrap_err();
    assert_eq!(err.stage(), "fetch");
    assert!(err.to_string().contains("timed out"));
}

#[tokio::test]
async fn test_empty_beans_is_a_successful_empty_scrape() {
    let server = mock_endpoint(r#"{"beans":[]}"#, 200).await;
    let poller = poller_for(&server, TargetKind::NameNode);

    let report = poller.poll().await.unwrap();
    assert_eq!(report.matched, 0);

    let output = poller.render();
    assert!(output.contains("hadoop_exporter_scrape_failures_total 0\n"));
}
