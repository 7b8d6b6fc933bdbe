use anyhow::Result;
use std::io::{BufRead, Write};

/// Ask a yes/no question. Only `y` counts as yes; `n`, anything else and EOF
/// are all no.
pub fn confirm<R: BufRead, W: Write>(mut input: R, mut output: W, question: &str) -> Result<bool> {
    write!(output, "{} (y/n): ", question)?;
    output.flush()?;

    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(line.trim().to_lowercase() == "y")
}
