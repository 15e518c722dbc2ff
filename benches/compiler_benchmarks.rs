//! Performance benchmarks for overload resolution and unit compilation.
//!
//! ## Profiling with Puffin
//!
//! Run with the `profile-with-puffin` feature to record scopes for the
//! passes and the driver:
//!
//! ```bash
//! cargo bench --features profile-with-puffin -- --profile-time 5
//! ```

use bumpalo::Bump;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use ixion::ast::{BinaryOp, Item};
use ixion::compiler::overload::{self, ArgInfo, Policy};
use ixion::prelude::*;
use std::hint::black_box;

#[cfg(feature = "profile-with-puffin")]
static FRAME_VIEW: std::sync::OnceLock<puffin::GlobalFrameView> = std::sync::OnceLock::new();

#[cfg(feature = "profile-with-puffin")]
fn setup_profiler() {
    puffin::set_scopes_on(true);
    FRAME_VIEW.get_or_init(puffin::GlobalFrameView::default);
}

#[cfg(not(feature = "profile-with-puffin"))]
fn setup_profiler() {}

/// Call at the end of each benchmark iteration to flush profiling data.
#[cfg(feature = "profile-with-puffin")]
fn end_profiling_frame() {
    puffin::GlobalProfiler::lock().new_frame();
}

#[cfg(not(feature = "profile-with-puffin"))]
fn end_profiling_frame() {}

/// `fn f<i>(a: int, b: double): double { var c = a * b; return c + i; }`
fn arithmetic_functions<'ast>(b: &AstBuilder<'ast>, count: usize) -> Vec<Item<'ast>> {
    (0..count)
        .map(|i| {
            let name = format!("f{i}");
            let body = b.block(&[
                b.var("c", b.binary(b.ident("a"), BinaryOp::Mul, b.ident("b"))),
                b.ret(Some(b.binary(b.ident("c"), BinaryOp::Add, b.int(i as i32)))),
            ]);
            b.function_item(b.function(
                &name,
                &[b.param("a", b.ty("int")), b.param("b", b.ty("double"))],
                Some(b.ty("double")),
                body,
            ))
        })
        .collect()
}

fn overload_benchmarks(c: &mut Criterion) {
    setup_profiler();
    let registry = HostRegistry::with_prelude();
    let print_stream = registry.resolve_host_class("java/io/PrintStream").unwrap();
    let println: Vec<_> = print_stream.declared_methods("println").cloned().collect();

    let mut group = c.benchmark_group("overload/println");
    let cases = [
        ("exact_int", ArgInfo::new(SemanticType::INT)),
        ("widen_short", ArgInfo::new(SemanticType::SHORT)),
        ("unbox_integer", ArgInfo::new(SemanticType::reference("java/lang/Integer"))),
        ("string", ArgInfo::new(SemanticType::string())),
    ];
    for (name, arg) in &cases {
        let args = std::slice::from_ref(arg);
        group.bench_function(*name, |b| {
            b.iter(|| {
                let ranked = overload::resolve(
                    &registry,
                    "println",
                    black_box(&println),
                    black_box(args),
                    Policy::HOST,
                    Span::default(),
                )
                .unwrap();
                end_profiling_frame();
                black_box(ranked.cost)
            });
        });
    }
    group.finish();
}

fn unit_benchmarks(c: &mut Criterion) {
    setup_profiler();
    let registry = HostRegistry::with_prelude();
    let compiler = Compiler::new(&registry, CompilerOptions::default());

    let mut group = c.benchmark_group("unit/functions");
    for count in [10usize, 100, 500] {
        let arena = Bump::new();
        let b = AstBuilder::new(&arena);
        let items = arithmetic_functions(&b, count);
        let unit = b.unit("bench", &[], &items);

        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &unit, |bench, unit| {
            bench.iter(|| {
                let compiled = compiler.compile_unit(black_box(unit)).unwrap();
                end_profiling_frame();
                black_box(compiled.classes.len())
            });
        });
    }
    group.finish();
}

fn program_benchmarks(c: &mut Criterion) {
    setup_profiler();
    let registry = HostRegistry::with_prelude();
    let compiler = Compiler::new(&registry, CompilerOptions::default());

    let arena = Bump::new();
    let b = AstBuilder::new(&arena);
    let names: Vec<String> = (0..16).map(|i| format!("unit{i}")).collect();
    let item_sets: Vec<Vec<Item<'_>>> = names.iter().map(|_| arithmetic_functions(&b, 50)).collect();
    let units: Vec<_> = names
        .iter()
        .zip(&item_sets)
        .map(|(name, items)| b.unit(name, &[], items))
        .collect();

    let mut group = c.benchmark_group("program");
    group.throughput(Throughput::Elements(units.len() as u64));
    group.bench_function("parallel_16_units", |bench| {
        bench.iter(|| {
            let output = compiler.compile_program(black_box(&units));
            end_profiling_frame();
            black_box(output.units.len())
        });
    });
    group.finish();
}

criterion_group!(benches, overload_benchmarks, unit_benchmarks, program_benchmarks);
criterion_main!(benches);
