use crate::{interpreter::Runtime, lexer::Lexer, parser::ast::Program};
use std::{env, fs, io, path::PathBuf, process};
use structopt::StructOpt;

mod errors;
mod interpreter;
mod lexer;
mod parser;

#[derive(StructOpt, Debug)]
#[structopt(name = "hawk", about = "A pattern scanning and processing language")]
struct Cli {
    /// Initial value of the FS field separator
    #[structopt(short = "F", value_name = "sep")]
    field_separator: Option<String>,
    /// Set a variable before the program starts; repeatable
    #[structopt(short = "v", number_of_values = 1, value_name = "var=value")]
    assignments: Vec<String>,
    /// Read program text from a file; repeatable, concatenated in order
    #[structopt(
        short = "f",
        number_of_values = 1,
        parse(from_os_str),
        value_name = "progfile"
    )]
    program_files: Vec<PathBuf>,
    /// The program (when no -f is given), then input files and VAR=VALUE
    /// operands
    #[structopt(value_name = "program | file | var=value")]
    operands: Vec<String>,
}

fn main() {
    let cli = Cli::from_args();

    let mut program_text = String::new();
    for path in &cli.program_files {
        match fs::read_to_string(path) {
            Ok(text) => program_text.push_str(&text),
            Err(_) => {
                eprintln!("bad file: {}", path.display());
                process::exit(1);
            },
        }
    }
    let mut operands = cli.operands.clone();
    if program_text.is_empty() {
        if operands.is_empty() {
            let _ = Cli::clap().print_help();
            println!();
            process::exit(exitcode::OK);
        }
        program_text = operands.remove(0);
    }

    let program = get_program(&program_text);
    process::exit(run_program(program, &cli, operands));
}

fn get_program(source: &str) -> Program {
    let tokens = match Lexer::lex(source) {
        Ok(tokens) => tokens,
        Err(e) => {
            eprintln!("{}", e.pretty(source));
            process::exit(1);
        },
    };
    match parser::parse_program(tokens) {
        Ok(program) => program,
        Err(e) => {
            eprintln!("{}", e.pretty(source));
            process::exit(1);
        },
    }
}

fn run_program(program: Program, cli: &Cli, operands: Vec<String>) -> i32 {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    let stdin = io::stdin();

    let mut argv = vec![String::from("hawk")];
    argv.extend(operands);
    let environ = env::vars().collect();

    let mut rt = match Runtime::new(program, argv, environ, Box::new(stdin.lock()), &mut handle)
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("{}", e);
            return 1;
        },
    };
    if let Some(sep) = &cli.field_separator {
        if let Err(e) = rt.set_var("FS", sep) {
            eprintln!("{}", e);
            return 1;
        }
    }
    for assignment in &cli.assignments {
        let mut parts = assignment.splitn(2, '=');
        match (parts.next(), parts.next()) {
            (Some(name), Some(value)) if !name.is_empty() => {
                if let Err(e) = rt.assign_escaped(name, value) {
                    // Warn and carry on with an empty value.
                    eprintln!("{}: {}", e, assignment);
                    let _ = rt.set_var(name, "");
                }
            },
            _ => {
                eprintln!("bad variable, want VAR=VAL: {}", assignment);
                return 1;
            },
        }
    }
    match rt.execute() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e);
            1
        },
    }
}
