//! Identifier management using string interning.
//!
//! Schema names, prefixes, namespace URIs and file names are all stored as
//! [`Id`] values. Comparing two identifiers is a symbol comparison; resolving
//! the text goes through a process-wide interner.
//!
//! On top of [`Id`] this module provides:
//! - [`QualifiedName`]: a reference as written in a schema (`prefix:name`).
//! - [`Identifier`]: the declared name of a node plus the namespace it is
//!   linked into.

use std::{
    fmt,
    sync::{Mutex, OnceLock},
};

use string_interner::{DefaultStringInterner, DefaultSymbol};

/// Global string interner for identifier storage.
///
/// # Thread Safety
///
/// This uses `Mutex` for thread-safe access to the string interner.
static INTERNER: OnceLock<Mutex<DefaultStringInterner>> = OnceLock::new();

fn with_interner<R>(f: impl FnOnce(&mut DefaultStringInterner) -> R) -> R {
    let mut interner = INTERNER
        .get_or_init(|| Mutex::new(DefaultStringInterner::new()))
        .lock()
        .expect("Failed to acquire interner lock");
    f(&mut interner)
}

/// Interned identifier.
///
/// # Examples
///
/// ```
/// use yanglink_core::identifier::Id;
///
/// let a = Id::new("interfaces");
/// let b: Id = "interfaces".into();
/// assert_eq!(a, b);
/// assert_eq!(a, "interfaces");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Id(DefaultSymbol);

impl Id {
    /// Creates an `Id` from a string slice, interning it if needed.
    pub fn new(name: &str) -> Self {
        Self(with_interner(|interner| interner.get_or_intern(name)))
    }

    /// Returns the interned text as an owned `String`.
    pub fn as_string(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = with_interner(|interner| {
            interner
                .resolve(self.0)
                .expect("Symbol should exist in interner")
                .to_owned()
        });
        f.write_str(&text)
    }
}

impl From<&str> for Id {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl PartialEq<str> for Id {
    fn eq(&self, other: &str) -> bool {
        with_interner(|interner| {
            interner
                .resolve(self.0)
                .expect("Symbol should exist in interner")
                == other
        })
    }
}

impl PartialEq<&str> for Id {
    fn eq(&self, other: &&str) -> bool {
        self == *other
    }
}

/// A possibly prefixed reference such as `if:interface-ref`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QualifiedName {
    prefix: Option<Id>,
    name: Id,
}

impl QualifiedName {
    /// Creates a qualified name from its parts.
    pub fn new(prefix: Option<Id>, name: Id) -> Self {
        Self { prefix, name }
    }

    /// Creates an unprefixed name.
    pub fn local(name: impl Into<Id>) -> Self {
        Self::new(None, name.into())
    }

    /// Parses `prefix:name` or `name`.
    ///
    /// ```
    /// use yanglink_core::identifier::QualifiedName;
    ///
    /// let qn = QualifiedName::parse("ietf:percent");
    /// assert_eq!(qn.prefix().unwrap(), "ietf");
    /// assert_eq!(qn.name(), "percent");
    /// ```
    pub fn parse(text: &str) -> Self {
        match text.split_once(':') {
            Some((prefix, name)) => Self::new(Some(Id::new(prefix.trim())), Id::new(name.trim())),
            None => Self::new(None, Id::new(text.trim())),
        }
    }

    /// Returns the prefix, if any.
    pub fn prefix(&self) -> Option<Id> {
        self.prefix
    }

    /// Returns the local name.
    pub fn name(&self) -> Id {
        self.name
    }
}

impl fmt::Display for QualifiedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.prefix {
            Some(prefix) => write!(f, "{prefix}:{}", self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// The declared name of a schema node and the namespace it belongs to.
///
/// The namespace is unset while parsing and filled in once the node's
/// defining file has been linked to its module namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identifier {
    name: Id,
    namespace: Option<Id>,
}

impl Identifier {
    /// Creates an identifier without a namespace.
    pub fn new(name: impl Into<Id>) -> Self {
        Self {
            name: name.into(),
            namespace: None,
        }
    }

    pub fn name(&self) -> Id {
        self.name
    }

    pub fn namespace(&self) -> Option<Id> {
        self.namespace
    }

    pub fn set_namespace(&mut self, namespace: Id) {
        self.namespace = Some(namespace);
    }

    /// Returns `true` if this identifier matches `name` and, when a namespace
    /// is requested, that namespace as well.
    pub fn matches(&self, name: Id, namespace: Option<Id>) -> bool {
        self.name == name && namespace.is_none_or(|ns| self.namespace == Some(ns))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
