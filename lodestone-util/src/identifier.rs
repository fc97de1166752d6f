use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Visitor};
use thiserror::Error;

/// A namespaced resource location, written `namespace:path`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier {
    pub namespace: String,
    pub path: String,
}

pub const DEFAULT_NAMESPACE: &str = "minecraft";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("invalid identifier namespace: {0}")]
    InvalidNamespace(String),
    #[error("invalid identifier path: {0}")]
    InvalidPath(String),
}

impl Identifier {
    pub fn vanilla(path: &str) -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            path: path.to_string(),
        }
    }

    /// Parses an identifier string. A missing namespace (no `:`) defaults to
    /// `minecraft`, the way data packs are read.
    pub fn try_parse(identifier: &str) -> Result<Self, IdentifierError> {
        let (namespace, path) = match identifier.split_once(':') {
            Some(("", path)) => (DEFAULT_NAMESPACE, path),
            Some((namespace, path)) => (namespace, path),
            None => (DEFAULT_NAMESPACE, identifier),
        };
        if !namespace.chars().all(valid_namespace_char) {
            return Err(IdentifierError::InvalidNamespace(identifier.to_string()));
        }
        if !path.chars().all(valid_path_char) {
            return Err(IdentifierError::InvalidPath(identifier.to_string()));
        }
        Ok(Self {
            namespace: namespace.to_string(),
            path: path.to_string(),
        })
    }
}

fn valid_namespace_char(c: char) -> bool {
    matches!(c, 'a'..='z' | '0'..='9' | '_' | '.' | '-')
}

fn valid_path_char(c: char) -> bool {
    matches!(c, 'a'..='z' | '0'..='9' | '_' | '.' | '-' | '/')
}

impl Serialize for Identifier {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Identifier {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct IdentifierVisitor;

        impl Visitor<'_> for IdentifierVisitor {
            type Value = Identifier;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("a valid identifier (namespace:path)")
            }

            fn visit_string<E>(self, v: String) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                self.visit_str(&v)
            }

            fn visit_str<E>(self, identifier: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Identifier::try_parse(identifier).map_err(serde::de::Error::custom)
            }
        }
        deserializer.deserialize_str(IdentifierVisitor)
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.namespace, self.path)
    }
}
