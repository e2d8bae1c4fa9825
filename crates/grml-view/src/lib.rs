pub mod error;
pub mod selection;
pub mod render;
pub mod panel;
pub mod library;
pub mod editor;
pub mod graphical;
pub mod text;
pub mod infer;

// Re-export commonly used types
pub use error::ViewError;
pub use selection::{Selection, SelectionChange, SelectionMode, SelectionState};
pub use render::{BlockView, PortView, SnippetView};
pub use panel::{EntryTarget, NameChangeKind, PanelEdit, PanelEntry, PropertyPanel};
pub use library::{Library, LibraryCategory, LibraryItem};
pub use editor::{Editor, UpdateReport};
pub use graphical::{BrushOutcome, GraphicalEditor, WireMirror};
pub use text::{LineEnumeration, OrderingStrategy, TextEditor};
pub use infer::{infer_from_code, parse_code, Inference, NameChange, ParsedCode};
