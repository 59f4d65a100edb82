//! Command implementations for the index-compat CLI.

use std::path::Path;
use std::time::Instant;

use log::info;

use crate::cli::args::*;
use crate::cli::output::*;
use crate::corpus::{self, BINARY_FILE, TEXT_FILE};
use crate::error::Result;
use crate::matrix::{CompatMatrix, Manifest};
use crate::storage::Storage;
use crate::storage::file::{FileStorage, FileStorageConfig};
use crate::verifier::{CompatibilityVerifier, VerifierConfig};

/// Execute a CLI command.
pub fn execute_command(args: IndexCompatArgs) -> Result<()> {
    match &args.command {
        Command::WriteCorpus(write_args) => write_corpus(write_args.clone(), &args),
        Command::ReadCorpus(read_args) => read_corpus(read_args.clone(), &args),
        Command::SelfCheck(check_args) => self_check(check_args.clone(), &args),
        Command::Plan(plan_args) => plan(plan_args.clone(), &args),
    }
}

fn corpus_config(dir: &Path) -> FileStorageConfig {
    FileStorageConfig {
        sync_writes: true,
        ..FileStorageConfig::new(dir)
    }
}

/// Generate a fixture and persist it.
fn write_corpus(args: WriteCorpusArgs, cli_args: &IndexCompatArgs) -> Result<()> {
    info!("writing corpus to {}", args.corpus_dir.display());

    let mut storage = FileStorage::new(&args.corpus_dir, corpus_config(&args.corpus_dir))?;
    let mut verifier = CompatibilityVerifier::new(args.generator.verifier_config())?;

    let fixture = corpus::write_corpus(&storage, &mut verifier)?;
    let result = CorpusWriteResult {
        directory: args.corpus_dir.to_string_lossy().to_string(),
        seed: args.generator.seed,
        samples: crate::codec::binary::from_bytes(&fixture.binary)?.len(),
        text_bytes: storage.file_size(TEXT_FILE)?,
        binary_bytes: storage.file_size(BINARY_FILE)?,
    };
    storage.close()?;

    output_result("Corpus written successfully", &result, cli_args)
}

/// Verify a persisted fixture.
fn read_corpus(args: ReadCorpusArgs, cli_args: &IndexCompatArgs) -> Result<()> {
    info!("reading corpus from {}", args.corpus_dir.display());

    let mut storage = FileStorage::open(&args.corpus_dir, corpus_config(&args.corpus_dir))?;
    let verifier = CompatibilityVerifier::new(VerifierConfig::default())?;

    let st = corpus::read_corpus(&storage, &verifier)?;
    storage.close()?;

    output_result(
        "Corpus verified successfully",
        &CorpusReadResult {
            directory: args.corpus_dir.to_string_lossy().to_string(),
            samples: st.len(),
            bitflags: st.bitflags,
            base_offset: st.base_offset.value(),
            max_offset: st.max_offset.value(),
            base_timestamp: st.base_timestamp.value(),
            max_timestamp: st.max_timestamp.value(),
        },
        cli_args,
    )
}

/// Round-trip many generated states.
fn self_check(args: SelfCheckArgs, cli_args: &IndexCompatArgs) -> Result<()> {
    let mut verifier = CompatibilityVerifier::new(args.generator.verifier_config())?;
    let start = Instant::now();
    let mut total_samples = 0u64;

    for i in 0..args.iterations {
        let st = verifier.check_generated()?;
        total_samples += st.len() as u64;

        if cli_args.verbosity() > 1 && (i + 1) % 10 == 0 {
            println!("Checked {} of {} states", i + 1, args.iterations);
        }
    }

    output_result(
        "Self check passed",
        &SelfCheckResult {
            iterations: args.iterations,
            seed: args.generator.seed,
            total_samples,
            duration_ms: start.elapsed().as_millis() as u64,
        },
        cli_args,
    )
}

/// Expand a manifest into cross-version checks.
fn plan(args: PlanArgs, cli_args: &IndexCompatArgs) -> Result<()> {
    let manifest = Manifest::load(&args.manifest)?;
    let matrix = CompatMatrix::from_manifest(&manifest)?;

    let checks = matrix
        .plan()
        .into_iter()
        .filter(|check| !args.incompatible_only || !check.expect_compatible)
        .collect();

    output_plan(
        &PlanResult {
            versions: matrix.versions().to_vec(),
            checks,
        },
        cli_args,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn parse(argv: &[&str]) -> IndexCompatArgs {
        IndexCompatArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_write_then_read_commands() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("corpus");
        let dir = dir.to_str().unwrap();

        execute_command(parse(&[
            "index-compat",
            "-q",
            "write-corpus",
            dir,
            "--seed",
            "8",
            "--max-entries",
            "50",
        ]))
        .unwrap();
        assert!(temp_dir.path().join("corpus").join(TEXT_FILE).is_file());
        assert!(temp_dir.path().join("corpus").join(BINARY_FILE).is_file());

        execute_command(parse(&["index-compat", "-q", "read-corpus", dir])).unwrap();
    }

    #[test]
    fn test_read_missing_corpus_fails() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().to_str().unwrap();
        let err = execute_command(parse(&["index-compat", "-q", "read-corpus", dir])).unwrap_err();
        assert!(err.to_string().contains(TEXT_FILE));
    }

    #[test]
    fn test_read_of_unknown_directory_has_no_side_effects() {
        let temp_dir = TempDir::new().unwrap();
        let typo = temp_dir.path().join("typo");

        let err = execute_command(parse(&["index-compat", "-q", "read-corpus", typo.to_str().unwrap()]))
            .unwrap_err();
        assert!(matches!(err, crate::error::CompatError::Storage(_)));
        assert!(err.to_string().contains("does not exist"));
        assert!(!typo.exists());
    }

    #[test]
    fn test_self_check_command() {
        execute_command(parse(&[
            "index-compat",
            "-q",
            "self-check",
            "--iterations",
            "5",
            "--seed",
            "3",
            "--max-entries",
            "20",
        ]))
        .unwrap();
    }

    #[test]
    fn test_plan_command_rejects_bad_manifest() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("compat.json");
        std::fs::write(
            &path,
            r#"{"all_versions": ["v1"], "not_compatible": {"v1": ["? v1"]}}"#,
        )
        .unwrap();

        let err = execute_command(parse(&["index-compat", "-q", "plan", path.to_str().unwrap()]))
            .unwrap_err();
        assert!(err.to_string().contains("unknown indicator"));
    }
}
