//! Benchmarks for the bytecode compiler and VM.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use opal::ast::Program;
use opal::bytecode::{Compiler, Vm};
use opal::lexer::Scanner;
use opal::parser::Parser;

/// Parse source into an AST.
fn parse(source: &str) -> Program {
    let tokens = Scanner::new(source).scan_tokens().expect("lexer error");
    Parser::new(tokens).parse().expect("parser error")
}

/// Compile and execute, end to end.
fn run_vm(program: &Program) {
    let mut compiler = Compiler::new();
    compiler.compile(program).expect("compile error");
    let mut vm = Vm::new(compiler.bytecode());
    vm.run().expect("runtime error");
}

fn fib_source(n: u32) -> String {
    format!(
        r#"
let fib = fn(x) {{
    if (x < 2) {{
        x
    }} else {{
        fib(x - 1) + fib(x - 2)
    }}
}};
fib({});
"#,
        n
    )
}

fn fib_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("fib_scaling");

    for n in [10, 15, 20].iter() {
        let program = parse(&fib_source(*n));
        group.bench_with_input(BenchmarkId::new("vm", n), &program, |b, program| {
            b.iter(|| run_vm(black_box(program)))
        });
    }

    group.finish();
}

fn closure_calls(c: &mut Criterion) {
    let source = r#"
let newAdder = fn(a) { fn(b) { a + b } };
let addOne = newAdder(1);
let apply = fn(f, n) {
    if (n == 0) { 0 } else { f(n) + apply(f, n - 1) }
};
apply(addOne, 100);
"#;
    let program = parse(source);

    c.bench_function("closure_calls", |b| b.iter(|| run_vm(black_box(&program))));
}

fn builtin_array_pipeline(c: &mut Criterion) {
    let source = r#"
let build = fn(n, acc) {
    if (n == 0) { acc } else { build(n - 1, push(acc, n)) }
};
let arr = build(100, []);
len(arr) + len(rest(arr));
"#;
    let program = parse(source);

    c.bench_function("builtin_array_pipeline", |b| {
        b.iter(|| run_vm(black_box(&program)))
    });
}

/// Benchmark compilation time alone (not execution).
fn compilation_overhead(c: &mut Criterion) {
    let mut group = c.benchmark_group("compilation_overhead");

    let program = parse(&fib_source(20));
    group.bench_function("compile_fib", |b| {
        b.iter(|| {
            let mut compiler = Compiler::new();
            compiler.compile(black_box(&program)).expect("compile error");
            compiler.bytecode()
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    fib_scaling,
    closure_calls,
    builtin_array_pipeline,
    compilation_overhead,
);

criterion_main!(benches);
