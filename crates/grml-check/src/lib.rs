pub mod diagnostics;
pub mod order;
pub mod validate;

// Re-export commonly used types
pub use diagnostics::{CheckError, Diagnostic, Severity};
pub use order::{cycles, dependency_graph, has_cycle, topological_order, DependencyGraph};
pub use validate::validate;
