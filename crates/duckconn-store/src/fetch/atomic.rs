//! Atomic staging primitives
//!
//! Data is streamed into a temp file and renamed into place, so a staged
//! source is either complete or absent.

use crate::errors::{io_error, Result};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

const TEMP_NAME: &str = ".partial.tmp";
const HEAD_LEN: u64 = 8;

/// Stream `reader` into `dir`, then rename to the name `name_for` picks
/// from the payload's leading bytes.
///
/// Returns the final path and the number of bytes written.
pub fn atomic_stream<F>(dir: &Path, reader: &mut dyn Read, name_for: F) -> Result<(PathBuf, u64)>
where
    F: FnOnce(&[u8]) -> String,
{
    fs::create_dir_all(dir).map_err(|e| io_error("create_staging_dir", dir, e))?;

    let temp_path = dir.join(TEMP_NAME);
    let written = write_temp(&temp_path, reader);
    let bytes = match written {
        Ok(n) => n,
        Err(e) => {
            fs::remove_file(&temp_path).ok();
            return Err(io_error("write_staging_temp", &temp_path, e));
        }
    };

    let mut head = Vec::new();
    File::open(&temp_path)
        .and_then(|f| f.take(HEAD_LEN).read_to_end(&mut head))
        .map_err(|e| io_error("read_staging_head", &temp_path, e))?;

    let target = dir.join(name_for(&head));
    fs::rename(&temp_path, &target).map_err(|e| io_error("rename_staging_temp", &target, e))?;

    Ok((target, bytes))
}

fn write_temp(path: &Path, reader: &mut dyn Read) -> io::Result<u64> {
    let mut file = File::create(path)?;
    let n = io::copy(reader, &mut file)?;
    file.flush()?;
    file.sync_all()?;
    Ok(n)
}
