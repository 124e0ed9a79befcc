//! treeglob CLI entry point.
//!
//! Usage:
//!   treeglob <pattern>...        # print paths matching the patterns
//!   treeglob --dot <pattern>     # print the compiled automaton (GraphViz)

use std::io::Write;
use std::process::ExitCode;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use treeglob::{multi_glob, ParseConfig, Pattern, WalkControl, WalkFn, WalkOptions};

fn main() -> ExitCode {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut cfg = ParseConfig::default();
    let mut opts = WalkOptions::default();
    let mut dot = false;
    let mut patterns = Vec::new();

    for arg in &args {
        match arg.as_str() {
            "--help" | "-h" => {
                print_help();
                return Ok(ExitCode::SUCCESS);
            }
            "--version" | "-V" => {
                println!("treeglob {}", env!("CARGO_PKG_VERSION"));
                return Ok(ExitCode::SUCCESS);
            }
            "--dot" => dot = true,
            "--extglob" => cfg.enable_extglob = true,
            "--no-symlinks" => opts.traverse_symlinks = false,
            "--intermediate" => opts.walk_intermediate_dirs = true,
            "--trace" => {
                opts = opts.with_trace(Arc::new(Mutex::new(std::io::stderr())));
            }
            other if other.starts_with('-') => bail!("unknown option: {other}"),
            pattern => patterns.push(pattern.to_string()),
        }
    }

    if patterns.is_empty() {
        print_help();
        return Ok(ExitCode::FAILURE);
    }

    let compiled = patterns
        .iter()
        .map(|p| Pattern::parse_with(p, &cfg).with_context(|| format!("invalid pattern {p:?}")))
        .collect::<Result<Vec<_>>>()?;

    if dot {
        let mut out = std::io::stdout();
        for p in &compiled {
            p.write_dot(&mut out, None).context("writing digraph")?;
        }
        out.flush()?;
        return Ok(ExitCode::SUCCESS);
    }

    let errors = Arc::new(AtomicUsize::new(0));
    let errors_in_cb = errors.clone();
    let callback: WalkFn = Arc::new(move |path, _entry, err| {
        if let Some(err) = err {
            eprintln!("treeglob: {path}: {err}");
            errors_in_cb.fetch_add(1, Ordering::Relaxed);
            return WalkControl::Continue;
        }
        println!("{path}");
        WalkControl::Continue
    });

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(multi_glob(
        CancellationToken::new(),
        &compiled,
        callback,
        opts,
    ))
    .context("walk failed")?;

    if errors.load(Ordering::Relaxed) > 0 {
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_help() {
    println!(
        r#"treeglob v{}

Usage:
  treeglob [OPTIONS] <pattern>...   Print paths matching the glob patterns
  treeglob --dot <pattern>...       Print compiled automata in GraphViz syntax

Options:
  --extglob                         Recognise ?( ) *( ) +( ) @( ) forms
  --no-symlinks                     Do not traverse directory symlinks
  --intermediate                    Report partially-matching directories too
  --trace                           Write walk trace lines to stderr
  --dot                             Emit the automaton instead of walking
  -h, --help                        Show this help
  -V, --version                     Show version

Examples:
  treeglob 'src/**/*.rs'            # every Rust file under src
  treeglob '~/notes/{{2024,2025}}-*'  # brace alternation, tilde expansion
  treeglob --dot 'a/**/b'           # inspect the compiled machine
"#,
        env!("CARGO_PKG_VERSION")
    );
}
