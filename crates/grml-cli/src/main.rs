//! GrML command line tools.
//!
//! Provides the `grml` binary for working with models saved in a document
//! store directory:
//! - `check` validates a model and prints its diagnostics
//! - `render` prints the code or block representation of a model
//! - `fmt` re-serializes a model through the store
//! - `list` shows the stored documents

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use uuid::Uuid;

use grml_check::{validate, Severity};
use grml_core::graph::ModelGraph;
use grml_core::id::{FunctionId, ModelId};
use grml_core::registry::Registry;
use grml_core::serialize::ModelSerialization;
use grml_storage::{DocumentId, DocumentStore, FileStore, SaveOutcome, StorageError};
use grml_view::{Editor, GraphicalEditor, OrderingStrategy, Selection, TextEditor};

/// GrML model tools.
#[derive(Parser)]
#[command(name = "grml", about = "GrML model tools")]
struct Cli {
    /// Document store directory.
    #[arg(short, long, global = true, default_value = "./models")]
    dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum View {
    Code,
    Block,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Validate a model and print its diagnostics.
    Check {
        /// Document id.
        doc: String,

        /// Print diagnostics as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print a representation of a model.
    Render {
        /// Document id.
        doc: String,

        #[arg(short, long, value_enum, default_value = "code")]
        view: View,

        /// Snippet ordering for the code view: scan or topological.
        #[arg(short, long, default_value = "scan")]
        ordering: OrderingStrategy,

        /// Render the submodel of this model function instead of the root.
        #[arg(short, long)]
        function: Option<Uuid>,
    },

    /// Re-serialize a model through the store.
    Fmt {
        /// Document id.
        doc: String,

        /// Read the model from this JSON file instead of the store.
        #[arg(long)]
        from: Option<PathBuf>,
    },

    /// List stored documents.
    List,
}

fn main() {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let store = match FileStore::open(&cli.dir) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Error: failed to open store '{}': {}", cli.dir.display(), e);
            process::exit(3);
        }
    };

    let exit_code = match cli.command {
        Commands::Check { doc, json } => run_check(&store, &doc, json),
        Commands::Render {
            doc,
            view,
            ordering,
            function,
        } => run_render(&store, &doc, view, ordering, function.map(FunctionId)),
        Commands::Fmt { doc, from } => run_fmt(store, &doc, from),
        Commands::List => run_list(&store),
    };
    process::exit(exit_code);
}

/// Exit code for a storage failure: 1 for a missing or invalid document,
/// 3 for I/O.
fn storage_failure(e: &StorageError) -> i32 {
    eprintln!("Error: {}", e);
    match e {
        StorageError::Io(_) => 3,
        _ => 1,
    }
}

fn load(store: &FileStore, registry: &Registry, doc: &str) -> Result<ModelGraph, i32> {
    let id = DocumentId::new(doc).map_err(|e| storage_failure(&e))?;
    store
        .load_graph(registry, &id)
        .map_err(|e| storage_failure(&e))
}

/// Returns 0 when there are no errors, 2 when there are.
fn run_check(store: &FileStore, doc: &str, json: bool) -> i32 {
    let registry = Registry::with_builtins();
    let graph = match load(store, &registry, doc) {
        Ok(graph) => graph,
        Err(code) => return code,
    };
    let diagnostics = match validate(&graph) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };

    if json {
        match serde_json::to_string_pretty(&diagnostics) {
            Ok(text) => println!("{}", text),
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        }
    } else {
        for d in &diagnostics {
            let label = match d.severity() {
                Severity::Error => "error",
                Severity::Warning => "warning",
            };
            println!("{}: {}", label, d);
        }
        println!("{} diagnostic(s)", diagnostics.len());
    }

    let errors = diagnostics
        .iter()
        .filter(|d| d.severity() == Severity::Error)
        .count();
    tracing::debug!(doc, errors, total = diagnostics.len(), "check finished");
    if errors > 0 {
        2
    } else {
        0
    }
}

fn run_render(
    store: &FileStore,
    doc: &str,
    view: View,
    ordering: OrderingStrategy,
    function: Option<FunctionId>,
) -> i32 {
    let registry = Registry::with_builtins();
    let graph = match load(store, &registry, doc) {
        Ok(graph) => graph,
        Err(code) => return code,
    };
    let model: ModelId = match function {
        None => graph.root(),
        Some(f) => match graph.submodel_of(f) {
            Ok(model) => model,
            Err(e) => {
                eprintln!("Error: {}", e);
                return 1;
            }
        },
    };

    let selection = Selection::new();
    let rendered = match view {
        View::Code => {
            let mut editor = TextEditor::new(ordering);
            editor
                .update(&graph, model, &selection)
                .map(|_| editor.text())
        }
        View::Block => {
            let mut editor = GraphicalEditor::new();
            editor
                .update(&graph, model, &selection)
                .map(|_| render_blocks(&editor))
        }
    };
    match rendered {
        Ok(text) => {
            print!("{}", text);
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn render_blocks(editor: &GraphicalEditor) -> String {
    let mut out = String::new();
    for block in editor.blocks() {
        out.push_str(&format!("[{}] at ({}, {})\n", block.title, block.x, block.y));
        for port in &block.inputs {
            out.push_str(&format!("  in  {}: {}\n", display_name(&port.name), port.data_type));
        }
        for port in &block.outputs {
            out.push_str(&format!("  out {}: {}\n", display_name(&port.name), port.data_type));
        }
        for warning in &block.warnings {
            out.push_str(&format!("  ! {}\n", warning));
        }
    }
    out.push_str(&format!("{} wire(s)\n", editor.wires().len()));
    out
}

fn display_name(name: &str) -> &str {
    if name.is_empty() {
        "_"
    } else {
        name
    }
}

fn run_fmt(mut store: FileStore, doc: &str, from: Option<PathBuf>) -> i32 {
    let registry = Registry::with_builtins();
    let id = match DocumentId::new(doc) {
        Ok(id) => id,
        Err(e) => return storage_failure(&e),
    };

    let graph = match from {
        Some(path) => {
            let text = match std::fs::read_to_string(&path) {
                Ok(text) => text,
                Err(e) => {
                    eprintln!("Error: failed to read '{}': {}", path.display(), e);
                    return 3;
                }
            };
            let parsed = serde_json::from_str::<ModelSerialization>(&text)
                .map_err(StorageError::from)
                .and_then(|model| Ok(ModelGraph::load(&registry, &model)?));
            match parsed {
                Ok(graph) => graph,
                Err(e) => return storage_failure(&e),
            }
        }
        None => match store.load_graph(&registry, &id) {
            Ok(graph) => graph,
            Err(e) => return storage_failure(&e),
        },
    };

    match store.save_graph(&id, &graph) {
        Ok(SaveOutcome::Written) => {
            println!("{}: written to {}", id, store.path(&id).display());
            0
        }
        Ok(SaveOutcome::Unchanged) => {
            println!("{}: unchanged", id);
            0
        }
        Err(e) => storage_failure(&e),
    }
}

fn run_list(store: &FileStore) -> i32 {
    match store.list() {
        Ok(documents) => {
            for d in documents {
                println!("{}\t{}\t{}", d.id, d.name, &d.hash[..12]);
            }
            0
        }
        Err(e) => storage_failure(&e),
    }
}
