//! Keyword namespace
//!
//! The Namespace holds keyword libraries. Like a command registry it is
//! stateless config: one namespace can serve many test runs.

use std::collections::HashMap;
use std::fmt;

use crate::error::DataError;
use crate::keywords::Context;
use crate::utils::normalize;
use crate::value::Value;

/// Usage information for a keyword
#[derive(Debug, Clone, Default)]
pub struct KeywordUsage {
    /// One-line summary
    pub summary: String,
    /// Argument syntax
    pub args: String,
    /// Deprecation note; running a deprecated keyword logs a warning
    pub deprecated: Option<String>,
}

/// A keyword implementation
pub trait Handler: Send + Sync {
    /// Execute the keyword with already resolved arguments
    fn run(&self, ctx: &mut Context<'_>, args: &[Value]) -> anyhow::Result<Value>;

    /// Return usage information
    fn usage(&self) -> KeywordUsage;
}

/// A boxed handler
pub type BoxedHandler = Box<dyn Handler>;

type HandlerFn = dyn Fn(&mut Context<'_>, &[Value]) -> anyhow::Result<Value> + Send + Sync;

/// Handler backed by a closure
pub struct FnHandler {
    usage: KeywordUsage,
    run_fn: Box<HandlerFn>,
}

impl FnHandler {
    pub fn new<F>(summary: impl Into<String>, args: impl Into<String>, run_fn: F) -> Self
    where
        F: Fn(&mut Context<'_>, &[Value]) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            usage: KeywordUsage {
                summary: summary.into(),
                args: args.into(),
                deprecated: None,
            },
            run_fn: Box::new(run_fn),
        }
    }

    /// Mark the keyword deprecated
    pub fn deprecated(mut self, reason: impl Into<String>) -> Self {
        self.usage.deprecated = Some(reason.into());
        self
    }
}

impl Handler for FnHandler {
    fn run(&self, ctx: &mut Context<'_>, args: &[Value]) -> anyhow::Result<Value> {
        (self.run_fn)(ctx, args)
    }

    fn usage(&self) -> KeywordUsage {
        self.usage.clone()
    }
}

/// A named collection of keywords
pub struct Library {
    name: String,
    /// normalized name -> (display name, handler)
    handlers: HashMap<String, (String, BoxedHandler)>,
}

impl Library {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handlers: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a keyword, replacing one with the same normalized name
    pub fn register(&mut self, name: impl Into<String>, handler: BoxedHandler) {
        let name = name.into();
        self.handlers.insert(normalize(&name), (name, handler));
    }

    /// Builder-style [`Library::register`]
    pub fn with(mut self, name: impl Into<String>, handler: impl Handler + 'static) -> Self {
        self.register(name, Box::new(handler));
        self
    }

    pub fn get(&self, name: &str) -> Option<&dyn Handler> {
        self.handlers.get(&normalize(name)).map(|(_, h)| h.as_ref())
    }

    /// Display names of all keywords, sorted
    pub fn keyword_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.values().map(|(n, _)| n.as_str()).collect();
        names.sort_unstable();
        names
    }

    fn lookup(&self, name: &str) -> Option<ResolvedHandler<'_>> {
        self.handlers.get(&normalize(name)).map(|(display, handler)| ResolvedHandler {
            longname: format!("{}.{}", self.name, display),
            handler: handler.as_ref(),
        })
    }
}

/// A handler found by name, with its `Library.Keyword` name
#[derive(Clone)]
pub struct ResolvedHandler<'a> {
    pub handler: &'a dyn Handler,
    pub longname: String,
}

impl fmt::Debug for ResolvedHandler<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedHandler").field("longname", &self.longname).finish_non_exhaustive()
    }
}

/// Keyword libraries available to a run
pub struct Namespace {
    libraries: Vec<Library>,
}

impl Namespace {
    /// Namespace with the BuiltIn library imported
    pub fn new() -> Self {
        Self {
            libraries: vec![crate::builtin::library()],
        }
    }

    /// Namespace with no libraries at all
    pub fn empty() -> Self {
        Self { libraries: Vec::new() }
    }

    /// Import a library; a library with the same name is replaced
    pub fn import_library(&mut self, library: Library) {
        let key = normalize(library.name());
        self.libraries.retain(|lib| normalize(lib.name()) != key);
        self.libraries.push(library);
    }

    pub fn libraries(&self) -> impl Iterator<Item = &Library> {
        self.libraries.iter()
    }

    /// Find the handler for `name`, either `Keyword Name` or `Library.Keyword Name`.
    pub fn get_handler(&self, name: &str) -> Result<ResolvedHandler<'_>, DataError> {
        if let Some(found) = self.get_explicit(name) {
            return Ok(found);
        }
        let mut found: Vec<ResolvedHandler<'_>> = self.libraries.iter().filter_map(|lib| lib.lookup(name)).collect();
        match found.len() {
            0 => Err(DataError::new(format!("No keyword with name '{}' found.", name))),
            1 => Ok(found.remove(0)),
            _ => {
                let mut names: Vec<String> = found.iter().map(|h| h.longname.clone()).collect();
                names.sort();
                Err(DataError::new(format!(
                    "Multiple keywords with name '{}' found.\nGive the full name of the keyword you want to use.\nFound: {}",
                    name,
                    crate::utils::seq2str(&names)
                )))
            }
        }
    }

    fn get_explicit(&self, name: &str) -> Option<ResolvedHandler<'_>> {
        let (lib_name, kw_name) = name.rsplit_once('.')?;
        let key = normalize(lib_name);
        self.libraries
            .iter()
            .find(|lib| normalize(lib.name()) == key)
            .and_then(|lib| lib.lookup(kw_name))
    }
}

impl Default for Namespace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo() -> FnHandler {
        FnHandler::new("Return the first argument", "value", |_ctx, args| {
            Ok(args.first().cloned().unwrap_or_default())
        })
    }

    #[test]
    fn test_lookup_is_normalized() {
        let mut ns = Namespace::empty();
        ns.import_library(Library::new("MyLib").with("Echo Value", echo()));
        let found = ns.get_handler("echo_value").unwrap();
        assert_eq!(found.longname, "MyLib.Echo Value");
        assert!(ns.get_handler("mylib.ECHO VALUE").is_ok());
    }

    #[test]
    fn test_unknown_keyword() {
        let ns = Namespace::empty();
        let err = ns.get_handler("Nope").unwrap_err();
        assert_eq!(err.message, "No keyword with name 'Nope' found.");
    }

    #[test]
    fn test_duplicate_names_need_full_name() {
        let mut ns = Namespace::empty();
        ns.import_library(Library::new("A").with("Echo", echo()));
        ns.import_library(Library::new("B").with("Echo", echo()));
        let err = ns.get_handler("Echo").unwrap_err();
        assert!(err.message.starts_with("Multiple keywords with name 'Echo' found."));
        assert!(err.message.ends_with("Found: 'A.Echo' and 'B.Echo'"));
        assert_eq!(ns.get_handler("B.Echo").unwrap().longname, "B.Echo");
    }

    #[test]
    fn test_builtin_is_imported_by_default() {
        let ns = Namespace::new();
        assert_eq!(ns.get_handler("log").unwrap().longname, "BuiltIn.Log");
    }

    #[test]
    fn test_deprecated_usage() {
        let handler = echo().deprecated("Use something else.");
        assert_eq!(handler.usage().deprecated.as_deref(), Some("Use something else."));
        assert_eq!(handler.usage().args, "value");
    }

    #[test]
    fn test_resolved_handler_debug_shows_longname() {
        let ns = Namespace::new();
        let found = ns.get_handler("Log").unwrap();
        assert_eq!(format!("{:?}", found), "ResolvedHandler { longname: \"BuiltIn.Log\", .. }");
    }
}
