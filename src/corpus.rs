//! Reading and writing compatibility corpora.
//!
//! A corpus holds one fixture as two files: [`TEXT_FILE`] and [`BINARY_FILE`].

use std::io::Write;

use log::{debug, info};

use crate::error::{CompatError, Result};
use crate::model::IndexState;
use crate::storage::{Storage, StorageOutput};
use crate::verifier::{CompatibilityVerifier, Fixture};

/// Name of the structured-text encoding inside a corpus.
pub const TEXT_FILE: &str = "values.json";

/// Name of the compact-binary encoding inside a corpus.
pub const BINARY_FILE: &str = "index_state.bin";

/// Generate a fixture and persist both encodings to `storage`.
///
/// Each file is flushed, synced and closed before the next one is opened.
pub fn write_corpus(storage: &dyn Storage, verifier: &mut CompatibilityVerifier) -> Result<Fixture> {
    let fixture = verifier.verify_write()?;

    write_file(storage, TEXT_FILE, fixture.text.as_bytes())?;
    write_file(storage, BINARY_FILE, &fixture.binary)?;

    info!(
        "corpus written: {TEXT_FILE} ({} bytes), {BINARY_FILE} ({} bytes)",
        fixture.text.len(),
        fixture.binary.len()
    );
    Ok(fixture)
}

/// Load both encodings from `storage` and verify they agree.
pub fn read_corpus(storage: &dyn Storage, verifier: &CompatibilityVerifier) -> Result<IndexState> {
    let text = read_file(storage, TEXT_FILE)?;
    let binary = read_file(storage, BINARY_FILE)?;

    let text = String::from_utf8(text)
        .map_err(|e| CompatError::decode_text(format!("{TEXT_FILE} is not valid UTF-8: {e}")))?;

    verifier.verify_read(&binary, &text)
}

fn write_file(storage: &dyn Storage, name: &str, data: &[u8]) -> Result<()> {
    let mut output = storage.create_output(name)?;
    output.write_all(data)?;
    output.flush_and_sync()?;
    output.close()?;

    debug!("wrote {} bytes to {name}", data.len());
    Ok(())
}

fn read_file(storage: &dyn Storage, name: &str) -> Result<Vec<u8>> {
    let mut input = storage.open_input(name)?;
    let data = input.read_all()?;
    input.close()?;

    debug!("read {} bytes from {name}", data.len());
    Ok(data)
}
