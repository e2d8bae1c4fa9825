//! Block library listing for the graphical editor.

use grml_core::registry::Registry;
use serde::Serialize;

use crate::error::ViewError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibraryItem {
    /// Registry name, used when the item is dropped on the editor.
    pub name: String,
    pub label: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LibraryCategory {
    pub name: String,
    /// Heading anchor: lowercase with whitespace runs replaced by `-`.
    pub id: String,
    pub items: Vec<LibraryItem>,
}

/// The categories a model kind offers, in the model's declared order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Library {
    pub categories: Vec<LibraryCategory>,
}

impl Library {
    pub fn for_model(registry: &Registry, model_kind: &str) -> Result<Self, ViewError> {
        let spec = registry.model(model_kind)?;
        let mut categories = Vec::new();
        for category in &spec.library {
            let items = registry
                .category(category)
                .iter()
                .map(|name| {
                    let f = registry.function(name)?;
                    Ok(LibraryItem {
                        name: f.name.clone(),
                        label: f.verbose_name.clone(),
                        description: f.description.clone(),
                    })
                })
                .collect::<Result<Vec<_>, ViewError>>()?;
            categories.push(LibraryCategory {
                name: category.clone(),
                id: anchor(category),
                items,
            });
        }
        Ok(Library { categories })
    }

    /// Items whose label or name contains `query`, ignoring case.
    pub fn search(&self, query: &str) -> Vec<&LibraryItem> {
        let query = query.to_lowercase();
        self.categories
            .iter()
            .flat_map(|c| c.items.iter())
            .filter(|i| {
                i.label.to_lowercase().contains(&query) || i.name.to_lowercase().contains(&query)
            })
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.categories
            .iter()
            .any(|c| c.items.iter().any(|i| i.name == name))
    }
}

fn anchor(category: &str) -> String {
    category
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
}
