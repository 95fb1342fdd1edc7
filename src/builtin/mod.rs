//! BuiltIn keyword library
//!
//! The keywords every namespace has without importing anything: logging,
//! variables, verification and running other keywords.

mod logging;
mod run;
mod variables;
mod verify;

use anyhow::bail;

use crate::namespace::Library;
use crate::utils::plural_or_not;
use crate::value::Value;

/// Name the library is registered under
pub const LIBRARY_NAME: &str = "BuiltIn";

/// Return the BuiltIn library
pub fn library() -> Library {
    let mut lib = Library::new(LIBRARY_NAME);
    lib.register("No Operation", Box::new(logging::NoOperation));
    lib.register("Log", Box::new(logging::Log));
    lib.register("Fail", Box::new(logging::Fail));
    lib.register("Fatal Error", Box::new(logging::FatalError));
    lib.register("Set Variable", Box::new(variables::SetVariable));
    lib.register("Create List", Box::new(variables::CreateList));
    lib.register("Catenate", Box::new(variables::Catenate));
    lib.register("Get Variable Value", Box::new(variables::GetVariableValue));
    lib.register("Variable Should Exist", Box::new(variables::VariableShouldExist));
    lib.register("Get Length", Box::new(verify::GetLength));
    lib.register("Length Should Be", Box::new(verify::LengthShouldBe));
    lib.register("Should Be Equal", Box::new(verify::ShouldBeEqual));
    lib.register("Should Not Be Equal", Box::new(verify::ShouldNotBeEqual));
    lib.register("Should Contain", Box::new(verify::ShouldContain));
    lib.register("Convert To Integer", Box::new(verify::ConvertToInteger));
    lib.register("Run Keyword", Box::new(run::RunKeyword));
    lib.register("Run Keyword And Continue On Failure", Box::new(run::RunKeywordAndContinueOnFailure));
    lib.register("Run Keyword And Ignore Error", Box::new(run::RunKeywordAndIgnoreError));
    lib.register("Run Keyword And Expect Error", Box::new(run::RunKeywordAndExpectError));
    lib
}

/// Fail unless `min..=max` arguments were given.
fn check_args(keyword: &str, args: &[Value], min: usize, max: Option<usize>) -> anyhow::Result<()> {
    let count = args.len();
    if count >= min && max.map_or(true, |max| count <= max) {
        return Ok(());
    }
    let expected = match max {
        Some(max) if max == min => format!("{} argument{}", min, plural_or_not(min)),
        Some(max) => format!("{} to {} arguments", min, max),
        None => format!("at least {} argument{}", min, plural_or_not(min)),
    };
    bail!(
        "Keyword '{}.{}' expected {}, got {}.",
        LIBRARY_NAME,
        keyword,
        expected,
        count
    )
}

/// Argument `index` as text, if given
fn text_arg(args: &[Value], index: usize) -> Option<String> {
    args.get(index).map(Value::to_string)
}

/// Integer value of `value`, accepting numeric strings
fn to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::Float(f) if f.is_finite() => Some(f.trunc() as i64),
        Value::String(s) => {
            let s = s.trim();
            let (digits, radix) = match s.get(..2).map(str::to_ascii_lowercase).as_deref() {
                Some("0x") => (&s[2..], 16),
                Some("0o") => (&s[2..], 8),
                Some("0b") => (&s[2..], 2),
                _ => (s, 10),
            };
            i64::from_str_radix(digits, radix).ok()
        }
        _ => None,
    }
}

/// Boolean option given as text; `False`, `No`, `0` and empty mean false
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::None => false,
        Value::Bool(b) => *b,
        Value::Int(i) => *i != 0,
        Value::String(s) => !matches!(s.trim().to_ascii_lowercase().as_str(), "" | "false" | "no" | "0"),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_names() {
        let lib = library();
        assert_eq!(lib.name(), "BuiltIn");
        assert!(lib.get("should_be_equal").is_some());
        assert!(lib.keyword_names().contains(&"Run Keyword And Ignore Error"));
    }

    #[test]
    fn test_check_args_messages() {
        let err = check_args("Log", &[], 1, Some(2)).unwrap_err();
        assert_eq!(err.to_string(), "Keyword 'BuiltIn.Log' expected 1 to 2 arguments, got 0.");
        let err = check_args("Get Length", &[], 1, Some(1)).unwrap_err();
        assert_eq!(err.to_string(), "Keyword 'BuiltIn.Get Length' expected 1 argument, got 0.");
        let err = check_args("Run Keyword", &[], 1, None).unwrap_err();
        assert_eq!(err.to_string(), "Keyword 'BuiltIn.Run Keyword' expected at least 1 argument, got 0.");
        assert!(check_args("Create List", &[Value::Int(1)], 0, None).is_ok());
    }

    #[test]
    fn test_to_int() {
        assert_eq!(to_int(&Value::from(" 42 ")), Some(42));
        assert_eq!(to_int(&Value::from("-7")), Some(-7));
        assert_eq!(to_int(&Value::from("0x1F")), Some(31));
        assert_eq!(to_int(&Value::Float(2.9)), Some(2));
        assert_eq!(to_int(&Value::from("abc")), None);
        assert_eq!(to_int(&Value::List(vec![])), None);
    }

    #[test]
    fn test_is_truthy() {
        assert!(is_truthy(&Value::from("yes")));
        assert!(!is_truthy(&Value::from("False")));
        assert!(is_truthy(&Value::from("no values")));
        assert!(!is_truthy(&Value::None));
    }
}
