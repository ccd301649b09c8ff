//! Human-readable warnings returned by the indexing entry points.

use std::fmt;

/// A recoverable failure met while updating or pruning indexes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexWarning {
    /// The expression referenced something this document does not have.
    UnresolvedExpression { expression: String, error: String },
    /// Any other failure inside a branch, including store errors.
    UpdateFailed { expression: String, error: String },
    /// The root definitions could not be read at all.
    DefinitionsUnavailable(String),
    /// Detaching the document from an instance failed.
    DeleteFailed(String),
    MirrorDirectory(String),
    MirrorLink(String),
    MirrorUnlink(String),
    MirrorCleanup(String),
}

impl fmt::Display for IndexWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexWarning::UnresolvedExpression { expression, error } => write!(
                f,
                "Error in document indexing update expression: {}; {}",
                expression, error
            ),
            IndexWarning::UpdateFailed { expression, error } => write!(
                f,
                "Error updating document index, expression: {}; {}",
                expression, error
            ),
            IndexWarning::DefinitionsUnavailable(error) => {
                write!(f, "Unable to read index definitions; {}", error)
            }
            IndexWarning::DeleteFailed(error) => {
                write!(f, "Unable to delete document indexing node; {}", error)
            }
            IndexWarning::MirrorDirectory(error) => {
                write!(f, "Unable to create indexing directory; {}", error)
            }
            IndexWarning::MirrorLink(error) => write!(f, "Unable to create document link; {}", error),
            IndexWarning::MirrorUnlink(error) => write!(f, "Unable to remove document link; {}", error),
            IndexWarning::MirrorCleanup(error) => {
                write!(f, "Unable to remove indexing directory; {}", error)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_templates() {
        let warning = IndexWarning::UnresolvedExpression {
            expression: "metadata['missing_key']".into(),
            error: "'metadata' has no key 'missing_key'".into(),
        };
        assert_eq!(
            warning.to_string(),
            "Error in document indexing update expression: metadata['missing_key']; 'metadata' has no key 'missing_key'"
        );

        let warning = IndexWarning::UpdateFailed {
            expression: "1 / 0".into(),
            error: "division by zero".into(),
        };
        assert_eq!(
            warning.to_string(),
            "Error updating document index, expression: 1 / 0; division by zero"
        );

        assert_eq!(
            IndexWarning::DeleteFailed("Index instance not found: 3".into()).to_string(),
            "Unable to delete document indexing node; Index instance not found: 3"
        );
    }
}
