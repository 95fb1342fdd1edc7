//! FOR loops
//!
//! `:FOR    ${i}    IN    @{items}` and `:FOR    ${i}    IN RANGE    10`.
//! Each round binds one chunk of values to the loop variables and runs a
//! fresh copy of the body, recorded as a [`ForIteration`].

use super::{Context, Keyword, KeywordKind, KeywordResult};
use crate::error::{DataError, ExecutionFailed};
use crate::output::KeywordEvent;
use crate::utils::{cut_long_assign_msg, plural_or_not, seq2str};
use crate::value::Value;

/// One round of a loop
#[derive(Debug, Clone)]
pub struct ForIteration {
    /// `${i} = 1, ${j} = 2`
    pub name: String,
    pub result: KeywordResult,
    pub keywords: Vec<Keyword>,
}

#[derive(Debug, Clone)]
pub struct ForLoop {
    pub name: String,
    pub vars: Vec<String>,
    pub items: Vec<String>,
    pub is_range: bool,
    /// Body as written; every round runs its own copy
    pub keywords: Vec<Keyword>,
    pub iterations: Vec<ForIteration>,
    pub result: KeywordResult,
}

impl ForLoop {
    pub fn new(vars: Vec<String>, items: Vec<String>, is_range: bool, keywords: Vec<Keyword>) -> Self {
        let name = format!(
            "{} {} [ {} ]",
            vars.join(" | "),
            if is_range { "IN RANGE" } else { "IN" },
            items.join(" | ")
        );
        Self {
            name,
            vars,
            items,
            is_range,
            keywords,
            iterations: Vec::new(),
            result: KeywordResult::default(),
        }
    }

    pub fn run(&mut self, ctx: &mut Context<'_>) -> Result<(), ExecutionFailed> {
        self.result.start();
        ctx.output.start_keyword(&KeywordEvent {
            kind: KeywordKind::For,
            name: &self.name,
            args: &[],
            result: &self.result,
        });
        let error = match self.run_rounds(ctx) {
            Ok(()) => None,
            Err(LoopError::Failed(err)) => Some(err),
            Err(LoopError::Data(err)) => {
                ctx.output.fail(&err.message);
                Some(ExecutionFailed::from(err))
            }
        };
        self.result.finish(error.is_none());
        ctx.output.end_keyword(&KeywordEvent {
            kind: KeywordKind::For,
            name: &self.name,
            args: &[],
            result: &self.result,
        });
        match error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn run_rounds(&mut self, ctx: &mut Context<'_>) -> Result<(), LoopError> {
        let items = self.loop_items(ctx)?;
        for values in items.chunks(self.vars.len()) {
            self.run_one_round(ctx, values)?;
        }
        Ok(())
    }

    fn run_one_round(&mut self, ctx: &mut Context<'_>, values: &[Value]) -> Result<(), LoopError> {
        let name = self
            .vars
            .iter()
            .zip(values)
            .map(|(var, value)| format!("{} = {}", var, cut_long_assign_msg(&value.to_string())))
            .collect::<Vec<_>>()
            .join(", ");
        let mut iteration = ForIteration {
            name,
            result: KeywordResult::default(),
            keywords: self.keywords.clone(),
        };
        iteration.result.start();
        ctx.output.start_keyword(&KeywordEvent {
            kind: KeywordKind::ForItem,
            name: &iteration.name,
            args: &[],
            result: &iteration.result,
        });

        let mut error = None;
        for (var, value) in self.vars.iter().zip(values) {
            if let Err(err) = ctx.variables.set(var, value.clone()) {
                ctx.output.fail(&err.message);
                error = Some(ExecutionFailed::from(err));
                break;
            }
        }
        if error.is_none() {
            for kw in iteration.keywords.iter_mut() {
                if let Err(err) = kw.run(ctx) {
                    error = Some(err);
                    break;
                }
            }
        }

        iteration.result.finish(error.is_none());
        ctx.output.end_keyword(&KeywordEvent {
            kind: KeywordKind::ForItem,
            name: &iteration.name,
            args: &[],
            result: &iteration.result,
        });
        self.iterations.push(iteration);
        match error {
            Some(err) => Err(LoopError::Failed(err)),
            None => Ok(()),
        }
    }

    /// Values to loop over, already substituted and checked against the
    /// number of loop variables.
    fn loop_items(&self, ctx: &Context<'_>) -> Result<Vec<Value>, DataError> {
        if self.vars.is_empty() {
            return Err(DataError::new("FOR loop has no loop variables."));
        }
        let mut items = ctx.variables.replace_strings(&self.items)?;
        if self.is_range {
            items = range_items(&items)?;
        }
        if items.len() % self.vars.len() == 0 {
            return Ok(items);
        }
        Err(DataError::new(format!(
            "Number of FOR loop values should be multiple of variables. Got {} variables ({}) but {} value{}.",
            self.vars.len(),
            seq2str(&self.vars),
            items.len(),
            plural_or_not(items.len())
        )))
    }
}

enum LoopError {
    Failed(ExecutionFailed),
    Data(DataError),
}

impl From<DataError> for LoopError {
    fn from(e: DataError) -> Self {
        LoopError::Data(e)
    }
}

/// `IN RANGE` arguments to the integers they produce.
fn range_items(items: &[Value]) -> Result<Vec<Value>, DataError> {
    let mut bounds = Vec::with_capacity(items.len());
    for item in items {
        let bound = match item {
            Value::Int(i) => Some(*i),
            Value::Bool(b) => Some(i64::from(*b)),
            Value::Float(f) if f.is_finite() => Some(f.trunc() as i64),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        };
        match bound {
            Some(bound) => bounds.push(bound),
            None => {
                return Err(DataError::new(format!(
                    "FOR IN RANGE expected integer arguments, got {} instead.",
                    item.type_name()
                )))
            }
        }
    }
    let (start, stop, step) = match bounds.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => {
            return Err(DataError::new(format!(
                "FOR IN RANGE expected 1-3 arguments, got {} instead.",
                bounds.len()
            )))
        }
    };
    if step == 0 {
        return Err(DataError::new("FOR IN RANGE step cannot be zero."));
    }
    let mut values = Vec::new();
    let mut current = start;
    while (step > 0 && current < stop) || (step < 0 && current > stop) {
        values.push(Value::Int(current));
        current = match current.checked_add(step) {
            Some(next) => next,
            None => break,
        };
    }
    Ok(values)
}
