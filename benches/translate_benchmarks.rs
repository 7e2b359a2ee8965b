//! Benchmarks for the translator front end.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use op2_translator::frontend::{extract_loops, scan_unit};
use op2_translator::prelude::*;
use std::path::Path;

fn synthetic_unit(loops: usize) -> String {
    let mut source = String::from("#include \"op_seq.h\"\n#define NVAR 4\n\nint main(int argc, char **argv) {\n");
    source.push_str("  op_init(argc, argv, 2);\n  op_decl_const(1, \"double\", &gam);\n");
    for i in 0..loops {
        source.push_str(&format!(
            "  // loop {i}\n  op_par_loop(res_calc_{k}, \"res_calc\", edges,\n\
             \x20             op_arg_dat(p_x, 0, pedge, 2, \"double\", OP_READ),\n\
             \x20             op_arg_dat(p_x, 1, pedge, 2, \"double\", OP_READ),\n\
             \x20             op_arg_dat(p_res, 0, pecell, NVAR, \"double\", OP_INC),\n\
             \x20             op_arg_gbl(&rms, 1, \"double\", OP_INC));\n",
            i = i,
            k = i % 8
        ));
    }
    source.push_str("  op_exit();\n}\n");
    source
}

/// Benchmark construct scanning and extraction.
fn bench_scanning(c: &mut Criterion) {
    let source = synthetic_unit(200);

    c.bench_function("extract_loops_200", |b| {
        b.iter(|| extract_loops(black_box(&source)))
    });

    c.bench_function("scan_unit_200", |b| {
        b.iter(|| scan_unit(black_box(&source)))
    });
}

/// Benchmark whole-unit translation (IR, registries, rewrite).
fn bench_translation(c: &mut Criterion) {
    let source = synthetic_unit(200);

    c.bench_function("translate_unit_200", |b| {
        b.iter(|| {
            let mut translator = Translator::new(TranslatorConfig::new());
            translator.prepare_sources([(Path::new("bench.cpp"), source.as_str())]);
            translator
                .translate_source(Path::new("bench.cpp"), black_box(&source))
                .unwrap()
        })
    });
}

criterion_group!(benches, bench_scanning, bench_translation);
criterion_main!(benches);
