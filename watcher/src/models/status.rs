//! Status enumerations decoded from loosely typed wire strings

use std::fmt;

/// Defines a status enum backed by wire strings.
///
/// Unrecognized strings decode into `Unknown(raw)` instead of failing, and
/// `Unknown` is never terminal.
macro_rules! wire_status {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($variant:ident => $wire:literal),+ $(,)?
        }
        terminal: [$($terminal:ident),+ $(,)?]
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant,)+
            Unknown(String),
        }

        impl $name {
            pub fn as_str(&self) -> &str {
                match self {
                    $($name::$variant => $wire,)+
                    $name::Unknown(raw) => raw.as_str(),
                }
            }

            pub fn is_terminal(&self) -> bool {
                matches!(self, $($name::$terminal)|+)
            }

            pub fn is_unknown(&self) -> bool {
                matches!(self, $name::Unknown(_))
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                match raw.trim().to_ascii_lowercase().as_str() {
                    $($wire => $name::$variant,)+
                    _ => $name::Unknown(raw.to_string()),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let raw = String::deserialize(deserializer)?;
                Ok($name::from(raw.as_str()))
            }
        }
    };
}

wire_status! {
    /// Build status: `queued -> building -> {success | failed}`
    BuildStatus {
        Queued => "queued",
        Building => "building",
        Success => "success",
        Failed => "failed",
    }
    terminal: [Success, Failed]
}

wire_status! {
    /// Deployment status: `{deploying | updating} -> {deployed | failed}`
    DeploymentStatus {
        Deploying => "deploying",
        Updating => "updating",
        Deployed => "deployed",
        Failed => "failed",
    }
    terminal: [Deployed, Failed]
}

wire_status! {
    /// Pipeline status: `processing -> {deployed | failed}`
    PipelineStatus {
        Processing => "processing",
        Deployed => "deployed",
        Failed => "failed",
    }
    terminal: [Deployed, Failed]
}
