use std::path::PathBuf;

use clap::Parser;

use tcclc::{run, Config, Options};

/// Compiler for the TCCL teaching language, emitting stack-machine assembly.
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// The file to compile
    #[clap(value_parser)]
    file: PathBuf,

    /// Where to write the assembly; defaults to the input with an `.il` extension
    #[clap(short, long, value_parser)]
    output: Option<PathBuf>,

    /// Assembly name in the prelude; defaults to the input file stem
    #[clap(long, value_parser)]
    assembly: Option<String>,

    /// Methods with this name become the program entry point
    #[clap(long, value_parser, default_value = "main")]
    entry_point: String,

    /// Value of `.maxstack` in every method body
    #[clap(long, value_parser, default_value_t = 32)]
    max_stack: u32,

    /// Print the annotated tree after analysis
    #[clap(long)]
    print_ast: bool,

    /// Stop after semantic analysis
    #[clap(long)]
    check: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let assembly = args.assembly.unwrap_or_else(|| {
        args.file
            .file_stem()
            .map_or_else(|| "program".to_owned(), |s| s.to_string_lossy().into_owned())
    });
    let config = Config {
        file: args.file,
        output: args.output,
        options: Options {
            assembly,
            entry_point: args.entry_point,
            max_stack: args.max_stack,
        },
        print_ast: args.print_ast,
        check_only: args.check,
    };
    run(&config)
}
