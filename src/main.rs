use std::fs::File;
use std::io::BufReader;
use std::io::Read;
use std::path::PathBuf;
use std::process;

use rustlox as lox;

use clap::Parser as ClapParser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use lox::ast_printer::AstPrinter;
use lox::error::Reporter;
use lox::interpreter::Interpreter;
use lox::parser::Parser;
use lox::resolver::Resolver;
use lox::scanner::scan;

#[derive(ClapParser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Script to execute; omit it for an interactive prompt.
    script: Vec<PathBuf>,

    /// Print the parsed syntax tree instead of executing.
    #[arg(long)]
    ast: bool,
}

fn main() -> anyhow::Result<()> {
    let args: Cli = Cli::parse();

    if args.script.len() > 1 {
        eprintln!("Usage: rustlox [script]");
        process::exit(64);
    }

    match args.script.first() {
        Some(path) => {
            run_file(path, args.ast)?;
            Ok(())
        }
        None => run_prompt(args.ast),
    }
}

fn run_file(path: &PathBuf, show_ast: bool) -> lox::error::Result<()> {
    let mut buf: Vec<u8> = Vec::new();
    let mut reader: BufReader<File> = BufReader::new(File::open(path)?);
    reader.read_to_end(&mut buf)?;

    let mut reporter = Reporter::new();
    let mut interpreter = Interpreter::new();

    run(buf, &mut interpreter, &mut reporter, false, show_ast);

    if reporter.had_error() {
        process::exit(65);
    }

    if reporter.had_runtime_error() {
        process::exit(70);
    }

    Ok(())
}

fn run_prompt(show_ast: bool) -> anyhow::Result<()> {
    let mut reporter = Reporter::new();
    let mut interpreter = Interpreter::new();
    let mut editor = DefaultEditor::new()?;

    loop {
        match editor.readline("> ") {
            Ok(line) => {
                let _ = editor.add_history_entry(line.as_str());

                run(
                    line.into_bytes(),
                    &mut interpreter,
                    &mut reporter,
                    true,
                    show_ast,
                );

                // Compile errors are forgotten between lines.
                reporter.reset();
            }

            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,

            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

fn run(
    source: Vec<u8>,
    interpreter: &mut Interpreter,
    reporter: &mut Reporter,
    repl: bool,
    show_ast: bool,
) {
    let tokens = scan(source, reporter);

    let statements = {
        let mut parser = Parser::new(tokens, reporter);
        parser.parse(repl)
    };

    if reporter.had_error() {
        return;
    }

    if show_ast {
        let printer = AstPrinter;
        for statement in &statements {
            println!("{}", printer.print_stmt(statement));
        }
        return;
    }

    let mut resolver = Resolver::new(interpreter, reporter);
    resolver.resolve(&statements);

    if reporter.had_error() {
        return;
    }

    interpreter.interpret(&statements, reporter);
}
