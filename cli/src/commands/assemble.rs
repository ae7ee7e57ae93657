use anyhow::Context;
use camino::Utf8PathBuf;
use clap::{Parser, ValueHint};
use tracing::info;

#[derive(Parser, Debug)]
pub struct AssembleOpt {
    /// Input assembly file
    #[clap(short = 'i', value_name = "FILE", value_hint = ValueHint::FilePath)]
    input: Utf8PathBuf,

    /// Output binary file
    #[clap(short = 'o', value_name = "FILE", default_value = "a.bin", value_hint = ValueHint::FilePath)]
    output: Utf8PathBuf,
}

impl AssembleOpt {
    pub fn exec(self) -> anyhow::Result<()> {
        info!(path = %self.input, "Assembling program");
        let source = std::fs::read_to_string(&self.input)
            .with_context(|| format!("could not read {}", self.input))?;

        let program = rv32_emulator::assemble(&source)?;

        let mut bytes = Vec::with_capacity(program.len() * 4);
        for word in &program {
            bytes.extend_from_slice(&word.to_le_bytes());
        }
        std::fs::write(&self.output, bytes)
            .with_context(|| format!("could not write {}", self.output))?;

        info!(words = program.len(), path = %self.output, "Wrote binary");
        Ok(())
    }
}
