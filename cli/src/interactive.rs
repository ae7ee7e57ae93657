//! The TTY step-by-step driver.
//!
//! Line editing comes from rustyline; the commands themselves are parsed by
//! clap with `no_binary_name`, so `help` and abbreviations come for free.

use clap::Parser;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use rv32_emulator::runtime::{Cpu, StepOutcome};

use crate::display::print_registers;

static HELP: &str = r#"An empty line steps once. Run "help" for the command list."#;

#[derive(Parser, Clone, Debug)]
#[clap(
    about = "Interactive mode commands",
    disable_version_flag = true,
    infer_subcommands = true,
    no_binary_name = true
)]
enum Command {
    /// Execute the next instructions
    #[clap(alias = "s")]
    Step {
        /// Number of steps to execute
        #[clap(default_value = "1")]
        number: usize,
    },

    /// Show the state of the registers
    #[clap(alias = "r")]
    Registers,

    /// Show a block of memory words
    Memory {
        /// First word index to show
        index: usize,

        /// Number of words to show
        #[clap(default_value = "8")]
        number: usize,
    },

    /// Exit the emulator
    Exit,
}

pub fn run_interactive(cpu: &mut Cpu) -> anyhow::Result<()> {
    let mut editor = DefaultEditor::new()?;
    let mut previous = cpu.registers.clone();

    println!("{HELP}");
    print_registers(&mut std::io::stdout().lock(), cpu, None)?;

    loop {
        let line = match editor.readline("> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => return Ok(()),
            Err(e) => return Err(e.into()),
        };

        let command = if line.trim().is_empty() {
            // re-run the implicit step
            Command::Step { number: 1 }
        } else {
            editor.add_history_entry(&line)?;
            let words = match shell_words::split(&line) {
                Ok(words) => words,
                Err(e) => {
                    println!("{e}");
                    continue;
                }
            };
            match Command::try_parse_from(words) {
                Ok(command) => command,
                Err(e) => {
                    println!("{e}");
                    continue;
                }
            }
        };

        match command {
            Command::Step { number } => {
                for _ in 0..number {
                    // a processor error is fatal: it bubbles up and ends the run
                    match cpu.step()? {
                        StepOutcome::Executed(instruction) => println!("executed: {instruction}"),
                        StepOutcome::Halted => {
                            println!("halted: zero word at pc {:#010x}", cpu.pc());
                            break;
                        }
                    }
                }
                print_registers(&mut std::io::stdout().lock(), cpu, Some(&previous))?;
                previous = cpu.registers.clone();
            }

            Command::Registers => {
                print_registers(&mut std::io::stdout().lock(), cpu, Some(&previous))?;
            }

            Command::Memory { index, number } => {
                for i in index..index.saturating_add(number) {
                    match cpu.memory.get(i) {
                        Some(word) => println!("{:#010x}: {word:#010x}", i * 4),
                        None => {
                            println!("word {i} is outside memory");
                            break;
                        }
                    }
                }
            }

            Command::Exit => return Ok(()),
        }
    }
}
