//! Register dump rendering, shared by the run command and the interactive
//! prompt.

use std::io::Write;

use anstyle::{AnsiColor, Style};
use rv32_emulator::runtime::{Cpu, Registers};

/// Prints the register file, one register per line with its ABI alias,
/// decimal and hexadecimal value. When a previous snapshot is given, the
/// registers that changed since are painted red.
pub fn print_registers(
    out: &mut dyn Write,
    cpu: &Cpu,
    previous: Option<&Registers>,
) -> std::io::Result<()> {
    let changed = Style::new().fg_color(Some(AnsiColor::Red.into()));
    let plain = Style::new();

    writeln!(
        out,
        "pc   = {0:11} / {0:#010x}     |     cycles = {1}",
        cpu.pc(),
        cpu.cycles()
    )?;

    for (reg, value) in cpu.registers.iter() {
        let style = match previous {
            Some(snapshot) if snapshot.get(reg) != value => changed,
            _ => plain,
        };
        writeln!(
            out,
            "{:4} = {style}{:11} / {value:#010x}{style:#}",
            reg.abi_name(),
            value as i32,
            value = value,
        )?;
    }

    Ok(())
}
