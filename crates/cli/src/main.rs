//! CPrime compiler CLI (SPEC_FULL.md §1/§2).
//!
//! Command-line front end for `cprime-compiler`: argument parsing, severity
//! policy loading, diagnostic rendering, and process exit codes (§6: 0
//! success, 1 compilation error, 2 fatal internal error).

use std::path::{Path, PathBuf};
use std::process;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use cprime_compiler::{CompilationUnit, PipelineError};
use cprime_core::{BodyElement, Footer, ScopeArena};

#[derive(Parser)]
#[command(name = "cprimec")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "CPrime compiler front end: tokenise, structure, and expand a .cp/.cprime source file", long_about = None)]
struct Cli {
    /// Increase log verbosity; repeat for more detail (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a single .cp/.cprime source file
    Compile {
        /// Input source file
        input: PathBuf,

        /// Write a summary report to this path instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the raw token stream produced by Layer 1
        #[arg(long)]
        dump_tokens: bool,

        /// Print the scope tree produced by Layer 2A-2D
        #[arg(long)]
        dump_scopes: bool,

        /// TOML file overlaying the error-kind severity policy
        #[arg(long)]
        severity_config: Option<PathBuf>,
    },

    /// Generate shell completion scripts
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Compile {
            input,
            output,
            dump_tokens,
            dump_scopes,
            severity_config,
        } => run_compile(&input, output.as_deref(), dump_tokens, dump_scopes, severity_config.as_deref()),
        Commands::Completions { shell } => run_completions(shell),
    }
}

fn init_tracing(verbose: u8) {
    let default_directive = match verbose {
        0 => "cprime_cli=info,cprime_compiler=warn",
        1 => "cprime_cli=debug,cprime_compiler=info",
        _ => "cprime_cli=trace,cprime_compiler=trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directive.into()))
        .with_writer(std::io::stderr)
        .init();
}

fn run_completions(shell: Shell) {
    let mut cmd = Cli::command();
    generate(shell, &mut cmd, "cprimec", &mut std::io::stdout());
}

fn run_compile(input: &Path, output: Option<&Path>, dump_tokens: bool, dump_scopes: bool, severity_config: Option<&Path>) {
    let config = match severity_config {
        Some(path) => match cprime_compiler::load_severity_config(path) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("error: {e}");
                process::exit(2);
            }
        },
        None => Default::default(),
    };

    let unit = match cprime_compiler::compile_file_with_config(input, &config) {
        Ok(unit) => unit,
        Err(e @ (PipelineError::Io { .. } | PipelineError::InvalidUtf8 { .. })) => {
            eprintln!("error: {e}");
            process::exit(2);
        }
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };

    let report = render_report(&unit, input, dump_tokens, dump_scopes);
    match output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, &report) {
                eprintln!("error: failed to write {}: {e}", path.display());
                process::exit(2);
            }
        }
        None => print!("{report}"),
    }

    if unit.errors.has_errors_at_or_above(cprime_core::ErrorSeverity::Error) {
        process::exit(1);
    }
}

fn render_report(unit: &CompilationUnit, input: &Path, dump_tokens: bool, dump_scopes: bool) -> String {
    let mut out = String::new();
    let file_name = input.display().to_string();

    out.push_str(&format!(
        "{file_name}: {} scope(s), {} type(s), {} function declaration(s), {} error(s)\n",
        unit.arena.len(),
        unit.types.total_registered_types(),
        unit.functions.total_registered_functions(),
        unit.errors.errors().len(),
    ));

    if dump_tokens {
        out.push_str("\n-- tokens --\n");
        for raw in unit.streams.stream(0) {
            out.push_str(&format!("{:?} @ {}:{}\n", raw.token, raw.line, raw.column));
        }
    }

    if dump_scopes {
        out.push_str("\n-- scopes --\n");
        dump_scope(&mut out, ScopeArena::ROOT, &unit.arena, 0);
    }

    for error in unit.errors.errors() {
        out.push_str(&format!("{}\n", unit.errors.format_error_message(error, &file_name)));
    }

    out
}

fn dump_scope(out: &mut String, index: u32, arena: &ScopeArena, depth: usize) {
    let indent = "  ".repeat(depth);
    let scope = arena.get(index);
    out.push_str(&format!(
        "{indent}scope {index} (parent {}, namespace {:?}, {} instruction(s))\n",
        scope.parent_index,
        scope.namespace_context,
        scope.instructions.len()
    ));
    for element in &scope.instructions {
        if let BodyElement::ScopeRef(child) = element {
            dump_scope(out, *child, arena, depth + 1);
        }
    }
    if let Footer::ScopeRef(child) = &scope.footer {
        dump_scope(out, *child, arena, depth + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_report_includes_scope_and_error_counts() {
        let unit = cprime_compiler::compile_source("int32_t x = 0;").unwrap();
        let report = render_report(&unit, Path::new("main.cp"), false, false);
        assert!(report.contains("scope(s)"));
        assert!(report.contains("0 error(s)"));
    }

    #[test]
    fn dump_tokens_lists_every_raw_token() {
        let unit = cprime_compiler::compile_source("x;").unwrap();
        let report = render_report(&unit, Path::new("main.cp"), true, false);
        assert!(report.contains("-- tokens --"));
    }
}
