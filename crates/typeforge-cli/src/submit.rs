//! Submit command implementation.

use std::fs;
use std::io::Read;

use typeforge_core::{
    ForgeConfig, SchemaPipeline, SchemaSubmission, SubmissionResponse, ValidationMode,
};

/// Execute the submit command.
///
/// Prints the JSON response and returns whether the type was published.
/// Every pipeline failure is reported in the response; only a schema
/// file that cannot be read is returned as an error.
pub fn execute(config: &ForgeConfig, schema: &str, embedded: bool) -> anyhow::Result<bool> {
    let payload = if schema == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        fs::read_to_string(schema)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {}", schema, e))?
    };

    let mut config = config.clone();
    if embedded {
        config.validation.mode = ValidationMode::Embedded;
    }

    let result = SchemaSubmission::from_json(&payload).and_then(|submission| {
        let pipeline = SchemaPipeline::new(&config)?;
        pipeline.submit(submission)
    });

    if let Err(e) = &result {
        if e.kind() == typeforge_core::ErrorKind::Internal {
            tracing::error!("{}", e.with_hint());
        }
    }

    let response = SubmissionResponse::from_result(&result);
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(response.is_success())
}
