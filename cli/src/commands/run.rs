use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{ArgAction, Parser, ValueHint};
use rv32_emulator::constants::{Word, MEMORY_WORDS};
use rv32_emulator::runtime::Cpu;
use tracing::info;

use crate::display::print_registers;
use crate::interactive::run_interactive;

#[derive(Parser, Debug)]
pub struct RunOpt {
    /// Input binary
    #[clap(value_name = "FILE", value_hint = ValueHint::FilePath)]
    input: Utf8PathBuf,

    /// Word index at which to load the program
    #[clap(long, default_value = "0")]
    offset: usize,

    /// Pause for a command between steps
    #[clap(short, long, action = ArgAction::SetTrue)]
    interactive: bool,
}

impl RunOpt {
    pub fn exec(self) -> anyhow::Result<()> {
        info!(path = %self.input, "Loading binary");
        let bytes = std::fs::read(&self.input)
            .with_context(|| format!("could not read {}", self.input))?;
        anyhow::ensure!(
            bytes.len() % 4 == 0,
            "binary size is not a multiple of 4 bytes"
        );

        let program: Vec<Word> = bytes
            .chunks_exact(4)
            .map(|chunk| Word::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
            .collect();

        let mut cpu = Cpu::new(MEMORY_WORDS);
        cpu.load_program(self.offset, &program)?;
        info!(words = program.len(), offset = self.offset, "Program loaded");

        if self.interactive {
            run_interactive(&mut cpu)?;
        } else {
            cpu.run()?;
            info!(cycles = cpu.cycles(), "Program halted");
            print_registers(&mut std::io::stdout().lock(), &cpu, None)?;
        }

        Ok(())
    }
}
