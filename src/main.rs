use elytra::logger::{log, LogSeverity::*};
use elytra::{upgrade_chunk, NBTFile, Result};
use std::env;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::process::ExitCode;

/// Upgrades one gzip-compressed chunk NBT file, writing to `output` or back over `input`.
fn run(input: &str, output: &str) -> Result<bool> {
    let mut file = NBTFile::read_gzip(&mut BufReader::new(File::open(input)?))?;
    if !upgrade_chunk(&mut file.root)? {
        return Ok(false);
    }
    let mut writer = BufWriter::new(File::create(output)?);
    file.write_gzip(&mut writer)?;
    writer.flush()?;
    Ok(true)
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let Some(input) = args.get(1) else {
        let program = args.first().map(String::as_str).unwrap_or("elytra");
        eprintln!("usage: {} <chunk.nbt> [output.nbt]", program);
        return ExitCode::FAILURE;
    };
    let output = args.get(2).unwrap_or(input);

    match run(input, output) {
        Ok(true) => {
            log(format!("Upgraded {} into {}", input, output), Info);
            ExitCode::SUCCESS
        }
        Ok(false) => {
            log(format!("{} has no legacy sections, nothing to do", input), Warning);
            ExitCode::SUCCESS
        }
        Err(err) => {
            log(format!("Failed to upgrade {}: {}", input, err), Error);
            ExitCode::FAILURE
        }
    }
}
