// langur - A bytecode-compiled scripting language written in Rust
// Copyright (c) 2025 Tom Waddington. MIT licensed.

use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::process;

use langur_core::value::Object;
use langur_core::BUILTINS;
use langur_parser::parse;
use langur_vm::{new_globals_store, Compiler, SymbolTable, VM};

fn main() {
    let args: Vec<String> = env::args().collect();

    // Handle --version flag
    if args.len() == 2 && (args[1] == "--version" || args[1] == "-v") {
        println!("Langur v0.1.0");
        return;
    }

    // If files provided, run them; otherwise start the REPL
    if args.len() > 1 {
        run_files(&args[1..]);
    } else {
        run_repl();
    }
}

/// Run a sequence of source files
fn run_files(files: &[String]) {
    for file_path in files {
        if let Err(e) = run_file(file_path) {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}

/// Compile and execute a single source file
fn run_file(file_path: &str) -> Result<(), String> {
    let path = Path::new(file_path);

    // Validate file extension
    match path.extension().and_then(|e| e.to_str()) {
        Some("lgr") => {}
        Some(ext) => {
            return Err(format!(
                "Error: unsupported file extension '.{}' for '{}' (expected .lgr)",
                ext, file_path
            ));
        }
        None => {
            return Err(format!(
                "Error: file '{}' has no extension (expected .lgr)",
                file_path
            ));
        }
    }

    let source =
        fs::read_to_string(path).map_err(|e| format!("Error reading '{}': {}", file_path, e))?;

    let program = parse(&source).map_err(|errors| {
        let mut out = format!("Parse errors in '{}':\n", file_path);
        for error in &errors {
            out.push_str("  ");
            out.push_str(error);
            out.push('\n');
        }
        out
    })?;

    let mut compiler = Compiler::new();
    compiler
        .compile(&program)
        .map_err(|e| format!("Compilation failed in '{}': {}", file_path, e))?;

    let mut vm = VM::new(compiler.bytecode());
    vm.run()
        .map_err(|e| format!("Error in '{}': {}", file_path, e))?;

    // A builtin error that survived to the end of the program is fatal too
    if let Object::Error(message) = vm.last_popped_stack_item() {
        return Err(format!("Error in '{}': {}", file_path, message));
    }

    Ok(())
}

/// Run the interactive REPL
fn run_repl() {
    println!("Langur v0.1.0");

    // Bindings, constants, and globals persist across inputs
    let mut symbol_table = SymbolTable::new();
    for (index, builtin) in BUILTINS.iter().enumerate() {
        symbol_table.define_builtin(index, builtin.name);
    }
    let mut constants = Vec::new();
    let globals = new_globals_store();

    loop {
        print!(">> ");
        io::stdout().flush().expect("failed to flush stdout");

        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) => {
                println!();
                break;
            }
            Ok(_) => {
                let input = input.trim();
                if input.is_empty() {
                    continue;
                }

                let program = match parse(input) {
                    Ok(program) => program,
                    Err(errors) => {
                        eprintln!("Parse errors:");
                        for error in &errors {
                            eprintln!("  {}", error);
                        }
                        continue;
                    }
                };

                let mut compiler = Compiler::new_with_state(
                    std::mem::take(&mut symbol_table),
                    std::mem::take(&mut constants),
                );
                let compiled = compiler.compile(&program);
                let bytecode = compiler.bytecode();
                (symbol_table, constants) = compiler.into_state();

                if let Err(e) = compiled {
                    eprintln!("Compilation failed: {}", e);
                    continue;
                }

                let mut vm = VM::new_with_globals_store(bytecode, globals.clone());
                match vm.run() {
                    Ok(()) => println!("{}", vm.last_popped_stack_item()),
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
            Err(e) => {
                eprintln!("Read error: {}", e);
                break;
            }
        }
    }
}
