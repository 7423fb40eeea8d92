use crate::id::ExtensionId;

/// A state transition guarded by one of the `can_*` predicates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Install,
    Uninstall,
    Enable,
    Disable,
}

impl std::fmt::Display for Transition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Install => "install",
            Self::Uninstall => "uninstall",
            Self::Enable => "enable",
            Self::Disable => "disable",
        })
    }
}

/// HTTP-style status a caller can surface for a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    NotFound,
    BadRequest,
    Forbidden,
    Internal,
}

impl Status {
    pub fn code(&self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::BadRequest => 400,
            Self::Forbidden => 403,
            Self::Internal => 500,
        }
    }
}

/// Errors that can occur in the extension registry.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No descriptor exists for the extension.
    #[error("extension not found: {0}")]
    NotFound(ExtensionId),

    /// The operation needs an installation record and there is none.
    #[error("extension is not installed: {0}")]
    NotInstalled(ExtensionId),

    /// Malformed slug.
    #[error("invalid extension slug '{slug}': {reason}")]
    InvalidSlug { slug: String, reason: String },

    /// Descriptor payload is missing required fields or has the wrong shape.
    #[error("invalid descriptor for extension '{id}': {reason}")]
    InvalidDescriptor { id: String, reason: String },

    #[error("extension is already installed: {0}")]
    AlreadyInstalled(ExtensionId),

    /// A `can_*` predicate declined the requested transition.
    #[error("cannot {transition} extension '{id}'")]
    GuardViolation {
        transition: Transition,
        id: ExtensionId,
    },

    #[error("no update available for extension '{0}'")]
    NoUpdateAvailable(ExtensionId),

    #[error("invalid version '{version}': {source}")]
    InvalidVersion {
        version: String,
        source: semver::Error,
    },

    /// Migration runner failure; aborts the enclosing lifecycle operation.
    #[error("migrations failed for '{bundle}': {reason}")]
    Migration { bundle: String, reason: String },

    /// Bundle binder refused to register or start a bundle.
    #[error("failed to bind bundle '{bundle}': {reason}")]
    Binder { bundle: String, reason: String },

    #[error(transparent)]
    Fs(#[from] ext_fs::Error),
}

impl Error {
    /// Status the web layer reports for this failure.
    pub fn status(&self) -> Status {
        match self {
            Self::NotFound(_) | Self::NotInstalled(_) => Status::NotFound,
            Self::InvalidSlug { .. }
            | Self::InvalidDescriptor { .. }
            | Self::NoUpdateAvailable(_)
            | Self::InvalidVersion { .. } => Status::BadRequest,
            Self::AlreadyInstalled(_) | Self::GuardViolation { .. } => Status::Forbidden,
            Self::Migration { .. } | Self::Binder { .. } | Self::Fs(_) => Status::Internal,
        }
    }

    pub(crate) fn invalid_descriptor(id: impl ToString, reason: impl Into<String>) -> Self {
        Self::InvalidDescriptor {
            id: id.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_violation_message_names_transition() {
        let id = ExtensionId::new("platform", "menus").unwrap();
        let err = Error::GuardViolation {
            transition: Transition::Uninstall,
            id,
        };
        assert_eq!(err.to_string(), "cannot uninstall extension 'platform.menus'");
        assert_eq!(err.status().code(), 403);
    }

    #[test]
    fn status_mapping() {
        let id = ExtensionId::new("acme", "blog").unwrap();
        assert_eq!(Error::NotInstalled(id.clone()).status(), Status::NotFound);
        assert_eq!(Error::NoUpdateAvailable(id.clone()).status(), Status::BadRequest);
        assert_eq!(Error::AlreadyInstalled(id).status(), Status::Forbidden);
        assert_eq!(
            Error::Migration {
                bundle: "acme/blog".into(),
                reason: "boom".into()
            }
            .status(),
            Status::Internal
        );
        let io = std::io::Error::new(std::io::ErrorKind::InvalidData, "bad ledger");
        let err = Error::from(ext_fs::Error::io("state/extensions.toml", io));
        assert_eq!(err.status(), Status::Internal);
    }
}
