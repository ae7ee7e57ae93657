mod assemble;
mod run;

#[derive(clap::Subcommand)]
pub enum Subcommand {
    /// Assemble a source file into a flat binary
    Assemble(self::assemble::AssembleOpt),

    /// Load a binary and execute it
    Run(self::run::RunOpt),
}

impl Subcommand {
    /// Run a subcommand
    pub fn exec(self) -> anyhow::Result<()> {
        match self {
            Subcommand::Assemble(opt) => opt.exec(),
            Subcommand::Run(opt) => opt.exec(),
        }
    }
}
