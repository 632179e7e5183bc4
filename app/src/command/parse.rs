use std::path::PathBuf;

use lncd_core::RecordField;

/// Input parameters for the Parse command strategy.
#[derive(Debug, Clone)]
pub struct ParseInput {
    pub file: PathBuf,
    /// Print JSON instead of labeled lines.
    pub json: bool,
}

/// Strategy for validating a dataset record file.
///
/// Prints the parsed fields, or fails with the parser's error naming the
/// missing label or offending line.
#[derive(Debug, Clone, Copy)]
pub struct ParseStrategy;

impl super::CommandStrategy for ParseStrategy {
    type Input = ParseInput;

    async fn execute(&self, input: Self::Input) -> anyhow::Result<()> {
        let record = super::read_record(&input.file)?;

        if input.json {
            println!("{}", serde_json::to_string_pretty(&record)?);
            return Ok(());
        }

        for field in RecordField::ALL {
            println!("{}:", field.label());
            for line in record.get(field).lines() {
                println!("  {line}");
            }
        }
        println!("Keywords (split): {}", record.keyword_list().join(" | "));
        Ok(())
    }
}
