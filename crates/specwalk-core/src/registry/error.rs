use thiserror::Error;

/// Registry contract violations.
///
/// These signal a caller ordering bug, never bad user input: parents must be
/// registered before their children.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Parent {parent} of '{name}' is not registered")]
    MissingParent { parent: String, name: String },

    #[error("{parent} cannot own test declarations ('{name}')")]
    InvalidParent { parent: String, name: String },
}
