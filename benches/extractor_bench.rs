//! Decode and extraction benchmarks

use criterion::{criterion_group, criterion_main, Criterion};

use hadoop_exporter::collector::decode;
use hadoop_exporter::extractor::{self, RuleTable, TargetKind};
use hadoop_exporter::registry::Registry;

fn sample_body() -> Vec<u8> {
    let mut beans = vec![
        r#"{
            "name": "Hadoop:service=NameNode,name=FSNamesystem",
            "modelerType": "FSNamesystem",
            "MissingBlocks": 0, "UnderReplicatedBlocks": 5,
            "CapacityTotal": 52844687360, "CapacityUsed": 24576,
            "CapacityRemaining": 42917969920, "CapacityUsedNonDFS": 9926692864,
            "BlocksTotal": 18, "FilesTotal": 37, "CorruptBlocks": 0,
            "ExcessBlocks": 0, "StaleDataNodes": 0, "tag.HAState": "active"
        }"#
            .to_string(),
        r#"{
            "name": "java.lang:type=Memory",
            "modelerType": "sun.management.MemoryImpl",
            "HeapMemoryUsage": {"committed": 1060372480, "init": 1073741824,
                                "max": 1060372480, "used": 124571232}
        }"#
            .to_string(),
    ];

    // Pad with unmatched beans the way a real /jmx answer does.
    for i in 0..60 {
        beans.push(format!(
            r#"{{"name":"java.lang:type=MemoryPool,name=Pool{i}","modelerType":"sun.management.MemoryPoolImpl","Usage":{{"used":{i}}}}}"#
        ));
    }

    format!(r#"{{"beans":[{}]}}"#, beans.join(",")).into_bytes()
}

fn bench_decode(c: &mut Criterion) {
    let body = sample_body();
    c.bench_function("decode_namenode_body", |b| {
        b.iter(|| decode(std::hint::black_box(&body)).unwrap())
    });
}

fn bench_extract(c: &mut Criterion) {
    let body = sample_body();
    let beans = decode(&body).unwrap();
    let table = RuleTable::for_target(TargetKind::NameNode);
    let registry = Registry::new(table.namespace);

    c.bench_function("extract_namenode_beans", |b| {
        b.iter(|| extractor::apply(std::hint::black_box(&beans), &table, &registry))
    });
}

fn bench_render(c: &mut Criterion) {
    let body = sample_body();
    let beans = decode(&body).unwrap();
    let table = RuleTable::for_target(TargetKind::NameNode);
    let registry = Registry::new(table.namespace);
    extractor::apply(&beans, &table, &registry);

    c.bench_function("render_exposition", |b| b.iter(|| registry.render()));
}

criterion_group!(benches, bench_decode, bench_extract, bench_render);
criterion_main!(benches);
