use criterion::{black_box, criterion_group, criterion_main, Criterion};
use diffnote::{annotate_files, patch_from_texts, FileChange, LineTable};
use indoc::indoc;

// --- Building Benchmarks ---

fn building_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("Building");

    let simple_patch = indoc! {"
        @@ -1,3 +1,3 @@
         fn main() {
        -    println!(\"Hello, world!\");
        +    println!(\"Hello, diffnote!\");
         }"};
    group.bench_function("simple_patch", |b| {
        b.iter(|| LineTable::build(black_box(simple_patch)))
    });

    // Many small hunks, so header parsing dominates.
    let mut many_hunks = String::new();
    for i in 0..100 {
        many_hunks.push_str(&format!(
            "@@ -{},3 +{},3 @@\n context line {}\n-old line {}\n+new line {}\n",
            i * 5 + 1,
            i * 5 + 1,
            i,
            i,
            i
        ));
    }
    group.bench_function("patch_100_hunks", |b| {
        b.iter(|| LineTable::build(black_box(&many_hunks)))
    });

    // A single long hunk, so the per-line counters dominate.
    let mut long_hunk = "@@ -1,10000 +1,10000 @@\n".to_string();
    for i in 0..10000 {
        long_hunk.push_str(&format!(" This is line number {}\n", i));
    }
    group.bench_function("hunk_10000_lines", |b| {
        b.iter(|| LineTable::build(black_box(&long_hunk)))
    });

    let files: Vec<FileChange> = (0..64)
        .map(|i| FileChange {
            filename: format!("src/file_{}.rs", i),
            blob_url: format!("https://example.com/blob/abc/src/file_{}.rs", i),
            patch: Some(long_hunk.clone()),
        })
        .collect();
    group.bench_function("annotate_64_files", |b| {
        b.iter(|| annotate_files(black_box(&files)))
    });

    let old_text: String = (0..2000).map(|i| format!("line {}\n", i)).collect();
    let new_text = old_text.replace("line 1000\n", "LINE 1000\n");
    group.bench_function("patch_from_texts_2000_lines", |b| {
        b.iter(|| patch_from_texts(black_box(&old_text), black_box(&new_text), 3))
    });

    group.finish();
}

// --- Rendering Benchmarks ---

fn rendering_benches(c: &mut Criterion) {
    let mut group = c.benchmark_group("Rendering");

    let mut long_hunk = "@@ -1,10000 +1,10000 @@\n".to_string();
    for i in 0..10000 {
        long_hunk.push_str(&format!(" This is line number {}\n", i));
    }
    let table = LineTable::build(&long_hunk);

    group.bench_function("default_context", |b| {
        b.iter(|| table.render(black_box(5000), 4).unwrap())
    });
    group.bench_function("wide_context", |b| {
        b.iter(|| table.render(black_box(5000), 500).unwrap())
    });

    group.finish();
}

criterion_group!(benches, building_benches, rendering_benches);
criterion_main!(benches);
