//! Keywords defined from other keywords

use anyhow::bail;

use super::{run_user_keyword_keywords, Context, Keyword};
use crate::namespace::{Handler, KeywordUsage};
use crate::value::Value;
use crate::variables::is_scalar_var;

/// A keyword whose body is a list of steps
///
/// Runs in its own scope: a copy of the caller's variables with the
/// arguments bound, so assignments inside the body do not leak out.
#[derive(Debug, Clone)]
pub struct UserKeyword {
    pub doc: String,
    /// `${name}` argument variables
    pub args: Vec<String>,
    pub keywords: Vec<Keyword>,
    /// Values returned, variable-substituted in the keyword's scope
    pub return_value: Vec<String>,
}

impl UserKeyword {
    pub fn new(args: Vec<String>, keywords: Vec<Keyword>) -> Self {
        Self {
            doc: String::new(),
            args,
            keywords,
            return_value: Vec::new(),
        }
    }

    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = doc.into();
        self
    }

    pub fn returning(mut self, values: Vec<String>) -> Self {
        self.return_value = values;
        self
    }
}

impl Handler for UserKeyword {
    fn run(&self, ctx: &mut Context<'_>, args: &[Value]) -> anyhow::Result<Value> {
        if args.len() != self.args.len() {
            bail!(
                "Keyword expected {} argument{}, got {}.",
                self.args.len(),
                crate::utils::plural_or_not(self.args.len()),
                args.len()
            );
        }
        let mut scope = ctx.variables.copy();
        for (name, value) in self.args.iter().zip(args) {
            if !is_scalar_var(name) {
                bail!("Invalid argument '{}'.", name);
            }
            scope.set(name, value.clone())?;
        }

        let mut body = self.keywords.clone();
        let mut child = ctx.with_scope(&mut scope);
        run_user_keyword_keywords(&mut body, &mut child)?;

        let mut values = scope.replace_strings(&self.return_value)?;
        Ok(match values.len() {
            0 => Value::None,
            1 => values.remove(0),
            _ => Value::List(values),
        })
    }

    fn usage(&self) -> KeywordUsage {
        KeywordUsage {
            summary: self.doc.lines().next().unwrap_or_default().to_string(),
            args: self.args.join(" | "),
            deprecated: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::namespace::Library;
    use crate::variables::Variables;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn namespace_with(name: &str, uk: UserKeyword) -> (crate::namespace::Namespace, std::sync::Arc<std::sync::Mutex<Vec<String>>>) {
        let (mut ns, calls) = namespace();
        ns.import_library(Library::new("Resource").with(name, uk));
        (ns, calls)
    }

    #[test]
    fn test_arguments_and_return_value() {
        let body = vec![
            Keyword::plain("Record", strings(&["${name}"])),
            Keyword::set(strings(&["${greeting}"]), "Catenate", strings(&["Hello,", "${name}!"])),
        ];
        let uk = UserKeyword::new(strings(&["${name}"]), body).returning(strings(&["${greeting}"]));
        let (ns, calls) = namespace_with("Greet", uk);
        let mut vars = Variables::new();
        let mut out = RecordingOutput::default();
        let mut ctx = Context::new(&ns, &mut vars, &mut out);
        let ret = ctx.run_keyword("Greet", vec![Value::from("World")]).unwrap();
        assert_eq!(ret, Value::from("Hello, World!"));
        assert_eq!(journal(&calls), vec!["World"]);
        assert!(!vars.contains("${greeting}"));
    }

    #[test]
    fn test_body_failures_are_aggregated() {
        let body = vec![
            Keyword::plain("Soft Fail", strings(&["one"])),
            Keyword::plain("Soft Fail", strings(&["two"])),
        ];
        let (ns, _) = namespace_with("Twice", UserKeyword::new(vec![], body));
        let mut vars = Variables::new();
        let mut out = RecordingOutput::default();
        let mut ctx = Context::new(&ns, &mut vars, &mut out);
        let err = ctx.run_keyword("Twice", vec![]).unwrap_err();
        assert_eq!(err.message, "Several failures occurred:\n\n1) one\n\n2) two");
        assert!(err.can_continue());
    }

    #[test]
    fn test_wrong_argument_count() {
        let (ns, _) = namespace_with("Takes One", UserKeyword::new(strings(&["${a}"]), vec![]));
        let mut vars = Variables::new();
        let mut out = RecordingOutput::default();
        let mut ctx = Context::new(&ns, &mut vars, &mut out);
        let err = ctx.run_keyword("Takes One", vec![]).unwrap_err();
        assert_eq!(err.message, "Keyword expected 1 argument, got 0.");
    }
}
