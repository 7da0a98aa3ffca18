use cfgdiff_common::{AppConfig, ComparisonTarget};
use cfgdiff_core::{compare_ini_str, DirectoryWalker, HashCache};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

// Helper to create a tree of INI files
fn create_config_tree(root: &Path, depth: usize, files_per_dir: usize, variant: &str) {
    if depth == 0 {
        return;
    }

    for i in 0..files_per_dir {
        let content = ini_document(20, variant);
        fs::write(root.join(format!("service_{}.conf", i)), content).unwrap();
    }

    if depth > 1 {
        for i in 0..3 {
            let dir_path = root.join(format!("subdir_{}", i));
            fs::create_dir(&dir_path).unwrap();
            create_config_tree(&dir_path, depth - 1, files_per_dir, variant);
        }
    }
}

fn ini_document(sections: usize, variant: &str) -> String {
    let mut content = String::from("[DEFAULT]\ndebug = false\n");
    for s in 0..sections {
        content.push_str(&format!("[section_{}]\n", s));
        for k in 0..10 {
            content.push_str(&format!("key_{} = value_{}_{}\n", k, k, variant));
        }
    }
    content
}

fn bench_walker_identical(c: &mut Criterion) {
    c.bench_function("walker_identical_trees", |b| {
        let temp = TempDir::new().unwrap();
        let origin = temp.path().join("origin");
        let destination = temp.path().join("destination");
        fs::create_dir(&origin).unwrap();
        fs::create_dir(&destination).unwrap();
        create_config_tree(&origin, 2, 10, "a");
        create_config_tree(&destination, 2, 10, "a");

        let walker = DirectoryWalker::new(AppConfig::default())
            .with_hash_cache(HashCache::in_memory())
            .with_report_dir(temp.path().join("reports"));

        b.iter(|| {
            let state = walker
                .process_directories(black_box(&origin), black_box(&destination))
                .unwrap();
            black_box(state);
        });
    });
}

fn bench_walker_all_different(c: &mut Criterion) {
    c.bench_function("walker_all_different_trees", |b| {
        let temp = TempDir::new().unwrap();
        let origin = temp.path().join("origin");
        let destination = temp.path().join("destination");
        fs::create_dir(&origin).unwrap();
        fs::create_dir(&destination).unwrap();
        create_config_tree(&origin, 2, 10, "a");
        create_config_tree(&destination, 2, 10, "b");

        let walker = DirectoryWalker::new(AppConfig::default())
            .with_report_dir(temp.path().join("reports"));

        b.iter(|| {
            let state = walker
                .process_directories(black_box(&origin), black_box(&destination))
                .unwrap();
            black_box(state);
        });
    });
}

fn bench_ini_differ(c: &mut Criterion) {
    let target = ComparisonTarget::new("origin.conf", "destination.conf");
    let mut group = c.benchmark_group("ini_differ");

    for sections in [10, 100, 500].iter() {
        let origin = ini_document(*sections, "a");
        let destination = ini_document(*sections, "b");
        group.bench_with_input(BenchmarkId::from_parameter(sections), sections, |b, _| {
            b.iter(|| {
                let report = compare_ini_str(&target, black_box(&origin), black_box(&destination)).unwrap();
                black_box(report);
            });
        });
    }

    group.finish();
}

criterion_group!(walker_benches, bench_walker_identical, bench_walker_all_different);
criterion_group!(differ_benches, bench_ini_differ);

criterion_main!(walker_benches, differ_benches);
