use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use aaz_core::config::{self, AazConfig, CONFIG_FILE_NAME, EmitOperation};
use aaz_core::diagnostics::Diagnostics;
use aaz_core::graph::{self, TypeGraph};
use aaz_core::resources::{
    ListResourcesEmitter, ResourcesOperationsEmitter, get_resources_operations, list_resources,
};
use aaz_core::{EmittedFile, Emitter};

#[derive(Parser)]
#[command(name = "aaz", about = "Type-graph to aaz wire-schema emitter", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the configured emitter
    Emit {
        /// Type graph files (YAML or JSON), one per API version
        #[arg(short, long)]
        input: Vec<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a type graph by converting every operation in it
    Validate {
        /// Path to the type graph file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Inspect the declarations and operations of a type graph
    Inspect {
        /// Path to the type graph file
        #[arg(short, long)]
        input: PathBuf,

        /// Output format
        #[arg(long, default_value = "yaml")]
        format: InspectFormat,
    },

    /// Initialize a new aaz configuration
    Init {
        /// Overwrite existing files
        #[arg(long)]
        force: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

#[derive(Clone, ValueEnum)]
enum InspectFormat {
    Yaml,
    Json,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Emit { input, output } => cmd_emit(input, output),

        Commands::Validate { input } => cmd_validate(input),

        Commands::Inspect { input, format } => cmd_inspect(input, format),

        Commands::Init { force } => cmd_init(force),

        Commands::Completions { shell } => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            clap_complete::generate(shell, &mut cmd, "aaz", &mut std::io::stdout());
            Ok(())
        }
    }
}

/// Try to load the project config file from the current directory.
fn try_load_config() -> Result<Option<AazConfig>> {
    let config_path = PathBuf::from(CONFIG_FILE_NAME);
    config::load_config(&config_path).map_err(|e| anyhow::anyhow!(e))
}

fn load_graph(path: &Path) -> Result<TypeGraph> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;

    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("yaml");

    let graph = match ext {
        "json" => graph::from_json(&content),
        _ => graph::from_yaml(&content),
    }
    .with_context(|| format!("failed to load {}", path.display()))?;
    Ok(graph)
}

/// Write emitted files to disk under the given base directory.
fn write_files(base: &Path, files: &[EmittedFile]) -> Result<()> {
    for file in files {
        let path = base.join(&file.path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory {}", parent.display()))?;
        }
        fs::write(&path, &file.content)
            .with_context(|| format!("failed to write {}", path.display()))?;
        eprintln!("  wrote {}", path.display());
    }
    Ok(())
}

fn report_diagnostics(diagnostics: &Diagnostics) {
    if diagnostics.is_empty() {
        return;
    }
    eprintln!("{} diagnostics:", diagnostics.len());
    for diagnostic in diagnostics.items() {
        eprintln!("  {diagnostic}");
    }
}

fn cmd_emit(input: Vec<PathBuf>, output: Option<PathBuf>) -> Result<()> {
    let cfg = try_load_config()?.unwrap_or_default();
    let inputs = if input.is_empty() {
        cfg.input.iter().map(PathBuf::from).collect()
    } else {
        input
    };
    let graphs = inputs
        .iter()
        .map(|path| load_graph(path))
        .collect::<Result<Vec<_>>>()?;
    log::debug!("loaded {} type graphs", graphs.len());

    let mut diagnostics = Diagnostics::new();
    let files = match cfg.operation {
        EmitOperation::ListResources => {
            eprintln!("Listing resources of {} graphs", graphs.len());
            ListResourcesEmitter.emit(&graphs, &mut diagnostics)?
        }
        EmitOperation::GetResourcesOperations => {
            eprintln!("Converting {} resources", cfg.resources.len());
            let emitter = ResourcesOperationsEmitter {
                api_version: cfg.api_version.clone(),
                resources: cfg.resources.clone(),
            };
            emitter.emit(&graphs, &mut diagnostics)?
        }
    };

    let output_dir = output.unwrap_or_else(|| PathBuf::from(&cfg.output));
    fs::create_dir_all(&output_dir)
        .with_context(|| format!("failed to create output directory {}", output_dir.display()))?;
    write_files(&output_dir, &files)?;
    report_diagnostics(&diagnostics);

    eprintln!("Emitted {} files in {}", files.len(), output_dir.display());
    Ok(())
}

fn cmd_validate(input: PathBuf) -> Result<()> {
    let graph = load_graph(&input)?;

    eprintln!(
        "Valid type graph {}: {}",
        graph.version, graph.service.title
    );
    if let Some(ref api_version) = graph.service.api_version {
        eprintln!("  API version: {api_version}");
    }
    eprintln!("  Types: {}", graph.types.len());
    eprintln!("  Operations: {}", graph.operations.len());

    // Also validate that every resource converts
    let ids: Vec<String> = list_resources(std::slice::from_ref(&graph))
        .into_iter()
        .map(|entry| entry.id)
        .collect();
    let mut diagnostics = Diagnostics::new();
    let converted = get_resources_operations(&graph, &ids, &mut diagnostics)?;
    eprintln!("  Resources: {}", converted.len());
    report_diagnostics(&diagnostics);

    eprintln!("Validation successful.");
    Ok(())
}

fn cmd_inspect(input: PathBuf, format: InspectFormat) -> Result<()> {
    let graph = load_graph(&input)?;

    let summary = build_inspect_summary(&graph);

    match format {
        InspectFormat::Yaml => {
            let yaml = serde_yaml_ng::to_string(&summary)?;
            print!("{}", yaml);
        }
        InspectFormat::Json => {
            let json = serde_json::to_string_pretty(&summary)?;
            println!("{}", json);
        }
    }

    Ok(())
}

fn build_inspect_summary(graph: &TypeGraph) -> serde_json::Value {
    let types: Vec<serde_json::Value> = graph
        .types
        .iter()
        .map(|(key, node)| {
            serde_json::json!({
                "key": key,
                "kind": node.kind_name(),
            })
        })
        .collect();

    let operations: Vec<serde_json::Value> = graph
        .operations
        .iter()
        .map(|op| {
            serde_json::json!({
                "name": op.name,
                "container": op.container,
                "verb": op.verb.as_str(),
                "path": op.path,
                "long_running": op.lro.is_some(),
            })
        })
        .collect();

    serde_json::json!({
        "service": {
            "title": graph.service.title,
            "api_version": graph.service.api_version,
        },
        "types": types,
        "operations": operations,
    })
}

fn cmd_init(force: bool) -> Result<()> {
    let config_path = PathBuf::from(CONFIG_FILE_NAME);

    if config_path.exists() && !force {
        anyhow::bail!(
            "{} already exists. Use --force to overwrite.",
            config_path.display()
        );
    }

    fs::write(&config_path, config::default_config_content())?;
    eprintln!("Created {}", config_path.display());
    Ok(())
}
