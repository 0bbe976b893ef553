//! CLI subcommands: compile, validate and schema.

use crate::core::{emit, manifest, types};
use clap::Subcommand;
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compile a manifest into a deployment template on stdout
    Compile {
        /// Path to the deployment manifest
        #[arg(short, long, default_value = "deploy.yaml")]
        file: PathBuf,

        /// Override the manifest's location
        #[arg(short, long)]
        location: Option<String>,

        /// Emit single-line JSON
        #[arg(long)]
        compact: bool,
    },

    /// Parse, finalize and convert a manifest without emitting it
    Validate {
        /// Path to the deployment manifest
        #[arg(short, long, default_value = "deploy.yaml")]
        file: PathBuf,
    },

    /// Print the JSON Schema of the manifest format
    Schema,
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Compile {
            file,
            location,
            compact,
        } => {
            let text = compile_file(&file, location.as_deref(), !compact)?;
            println!("{}", text);
            Ok(())
        }
        Commands::Validate { file } => cmd_validate(&file),
        Commands::Schema => cmd_schema(),
    }
}

/// Compile a manifest file to template JSON text.
pub fn compile_file(file: &Path, location: Option<&str>, pretty: bool) -> Result<String, String> {
    let parsed = manifest::parse_manifest_file(file).map_err(|e| e.to_string())?;
    let deployment =
        manifest::lower(&parsed, location.map(types::Location::new)).map_err(|e| e.to_string())?;
    let template = deployment.compile();
    emit::to_json(&template, pretty).map_err(|e| format!("cannot serialize template: {}", e))
}

fn cmd_validate(file: &Path) -> Result<(), String> {
    let parsed = manifest::parse_manifest_file(file).map_err(|e| e.to_string())?;
    let deployment = manifest::lower(&parsed, None).map_err(|e| e.to_string())?;
    let template = deployment.compile();
    println!(
        "OK: {} ({} resources, {} parameters, {} outputs)",
        file.display(),
        template.resources.len(),
        template.parameters.len(),
        template.outputs.len()
    );
    Ok(())
}

fn cmd_schema() -> Result<(), String> {
    let schema = manifest::manifest_schema();
    let text = serde_json::to_string_pretty(&schema)
        .map_err(|e| format!("cannot serialize schema: {}", e))?;
    println!("{}", text);
    Ok(())
}
