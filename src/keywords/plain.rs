//! Plain keyword invocation

use tracing::{debug, warn};

use super::set::Assignment;
use super::{Context, KeywordKind, KeywordResult};
use crate::error::ExecutionFailed;
use crate::namespace::ResolvedHandler;
use crate::output::KeywordEvent;
use crate::value::Value;

/// A call of a library keyword
#[derive(Debug, Clone)]
pub struct PlainKeyword {
    /// Name as resolved, `Library.Keyword` once the handler is known
    pub name: String,
    /// Name as written
    pub handler_name: String,
    /// Argument tokens as written
    pub args: Vec<String>,
    /// Arguments given as values, bypassing variable substitution
    values: Option<Vec<Value>>,
    pub doc: String,
    pub result: KeywordResult,
    pub return_value: Option<Value>,
}

impl PlainKeyword {
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        let name = name.into();
        Self {
            handler_name: name.clone(),
            name,
            args,
            values: None,
            doc: String::new(),
            result: KeywordResult::default(),
            return_value: None,
        }
    }

    /// Call with resolved argument values; used for nested keyword calls.
    pub fn with_values(name: impl Into<String>, values: Vec<Value>) -> Self {
        let args = values.iter().map(Value::to_string).collect();
        Self {
            values: Some(values),
            ..Self::new(name, args)
        }
    }

    pub fn run(&mut self, ctx: &mut Context<'_>) -> Result<Value, ExecutionFailed> {
        self.run_as(ctx, KeywordKind::Keyword, None)
    }

    /// Run inside the start/end bracket, optionally assigning the return
    /// value to variables before the step ends.
    pub(super) fn run_as(
        &mut self,
        ctx: &mut Context<'_>,
        kind: KeywordKind,
        assign: Option<&Assignment>,
    ) -> Result<Value, ExecutionFailed> {
        let namespace = ctx.namespace;
        let lookup = namespace.get_handler(&self.handler_name);
        let longname = match &lookup {
            Ok(found) => found.longname.clone(),
            Err(_) => self.handler_name.clone(),
        };
        self.name = match assign {
            Some(assign) if !assign.is_empty() => format!("{} = {}", assign.targets().join(", "), longname),
            _ => longname.clone(),
        };
        let usage = lookup.as_ref().ok().map(|found| found.handler.usage()).unwrap_or_default();
        self.doc = usage.summary;

        self.result.start();
        debug!(keyword = %self.name, "keyword started");
        ctx.output.start_keyword(&self.event(kind));
        if let Some(reason) = &usage.deprecated {
            let message = format!("Keyword '{}' is deprecated. {}", longname, reason);
            warn!("{}", message);
            ctx.output.warn(message.trim_end());
        }

        let outcome = match lookup {
            Ok(found) => self.call_handler(&found, ctx),
            Err(err) => {
                ctx.output.fail(&err.message);
                Err(ExecutionFailed::from(err))
            }
        };
        let outcome = match assign {
            Some(assign) => assign.apply(outcome, &longname, ctx),
            None => outcome,
        };
        if let Ok(value) = &outcome {
            ctx.output.trace(&format!("Return: {}", value.repr()));
            self.return_value = Some(value.clone());
        }

        self.result.finish(outcome.is_ok());
        ctx.output.end_keyword(&self.event(kind));
        debug!(keyword = %self.name, status = %self.result.status, "keyword ended");
        outcome
    }

    fn event(&self, kind: KeywordKind) -> KeywordEvent<'_> {
        KeywordEvent {
            kind,
            name: &self.name,
            args: &self.args,
            result: &self.result,
        }
    }

    fn call_handler(&self, found: &ResolvedHandler<'_>, ctx: &mut Context<'_>) -> Result<Value, ExecutionFailed> {
        let args = match &self.values {
            Some(values) => values.clone(),
            None => match ctx.variables.replace_strings(&self.args) {
                Ok(args) => args,
                Err(err) => {
                    ctx.output.fail(&err.message);
                    return Err(err.into());
                }
            },
        };
        let outcome = found.handler.run(ctx, &args);
        if let Some(timeout) = ctx.timeout_failure() {
            let already_timed_out = matches!(&outcome, Err(e) if e.downcast_ref::<ExecutionFailed>().map_or(false, |f| f.timeout));
            if !already_timed_out {
                ctx.output.fail(&timeout.message);
                return Err(timeout);
            }
        }
        outcome.map_err(|err| match err.downcast::<ExecutionFailed>() {
            Ok(failed) => failed,
            Err(other) => report_failure(other, ctx),
        })
    }
}

/// Log an error raised by a handler and turn it into a fatal failure.
fn report_failure(err: anyhow::Error, ctx: &mut Context<'_>) -> ExecutionFailed {
    let message = match err.to_string() {
        m if m.is_empty() => "Keyword failed without a message".to_string(),
        m => m,
    };
    ctx.output.fail(&message);
    let causes: Vec<String> = err.chain().skip(1).map(ToString::to_string).collect();
    if !causes.is_empty() {
        ctx.output.debug(&format!("Caused by:\n{}", causes.join("\n")));
    }
    ExecutionFailed::new(message)
}
