//! Article input: a whole file, or console lines up to a sentinel.

use std::io::BufRead;
use std::path::Path;

use plagscan_core::{Error, Result};

/// Lines that end console input. Both spellings have been in use.
pub const SENTINELS: [&str; 2] = ["endinput", "end input"];

pub fn read_article(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| Error::Io(format!("{}: {e}", path.display())))
}

/// Read lines until a sentinel line or end of input; lines are joined with `\n`.
pub fn read_until_sentinel<R: BufRead>(reader: R) -> Result<String> {
    let mut lines = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(|e| Error::Io(format!("stdin: {e}")))?;
        let line = line.trim_end_matches('\r');
        if SENTINELS.contains(&line.trim()) {
            break;
        }
        lines.push(line.to_string());
    }
    Ok(lines.join("\n"))
}
