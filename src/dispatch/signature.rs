//! Declared call signatures and argument binding
//!
//! A [`Signature`] lists the parameters an operation accepts, in order, with their
//! defaults, and whether it takes arbitrary extra keyword arguments. Binding follows the
//! usual positional-then-keyword rules: positional arguments fill parameters in declared
//! order, keyword arguments fill them by name, defaults fill whatever is left.

use crate::error::{MongodogError, Result};
use crate::value::{Document, Value};

static NULL: Value = Value::Null;

/// Default of a declared parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamDefault {
    Required,
    Null,
    Bool(bool),
    Int(i64),
    Str(&'static str),
    EmptyArray,
    EmptyDocument,
    /// `[{}]`
    ArrayOfEmptyDocument,
}

impl ParamDefault {
    /// The default value, or `None` for a required parameter
    pub fn to_value(&self) -> Option<Value> {
        let value = match self {
            ParamDefault::Required => return None,
            ParamDefault::Null => Value::Null,
            ParamDefault::Bool(b) => Value::Bool(*b),
            ParamDefault::Int(i) => Value::Int(*i),
            ParamDefault::Str(s) => Value::from(*s),
            ParamDefault::EmptyArray => Value::Array(Vec::new()),
            ParamDefault::EmptyDocument => Value::Document(Document::new()),
            ParamDefault::ArrayOfEmptyDocument => Value::Array(vec![Value::Document(Document::new())]),
        };
        Some(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Param {
    pub name: &'static str,
    pub default: ParamDefault,
}

impl Param {
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            default: ParamDefault::Required,
        }
    }

    pub const fn optional(name: &'static str, default: ParamDefault) -> Self {
        Self { name, default }
    }
}

/// Parameter list of one operation
#[derive(Debug, Clone, Copy)]
pub struct Signature {
    pub method: &'static str,
    pub params: &'static [Param],
    /// Whether unknown keyword arguments are collected instead of rejected
    pub variadic_kwargs: bool,
}

impl Signature {
    pub const fn new(method: &'static str, params: &'static [Param], variadic_kwargs: bool) -> Self {
        Self {
            method,
            params,
            variadic_kwargs,
        }
    }

    pub fn param_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.params.iter().map(|p| p.name)
    }

    fn declares(&self, name: &str) -> bool {
        self.params.iter().any(|p| p.name == name)
    }

    /// Bind positional and keyword arguments to the declared parameters
    pub fn bind(&self, args: &[Value], kwargs: &Document) -> Result<BoundArgs> {
        if args.len() > self.params.len() {
            return Err(MongodogError::invalid_arguments(
                self.method,
                format!(
                    "takes at most {} positional arguments ({} given)",
                    self.params.len(),
                    args.len()
                ),
            ));
        }

        let mut declared = Document::new();
        let mut missing = Vec::new();

        for (index, param) in self.params.iter().enumerate() {
            let keyword = kwargs.get(param.name);
            let value = match (args.get(index), keyword) {
                (Some(_), Some(_)) => {
                    return Err(MongodogError::invalid_arguments(
                        self.method,
                        format!("got multiple values for argument '{}'", param.name),
                    ));
                }
                (Some(positional), None) => positional.clone(),
                (None, Some(keyword)) => keyword.clone(),
                (None, None) => match param.default.to_value() {
                    Some(default) => default,
                    None => {
                        missing.push(format!("'{}'", param.name));
                        continue;
                    }
                },
            };
            declared.insert(param.name, value);
        }

        if !missing.is_empty() {
            return Err(MongodogError::invalid_arguments(
                self.method,
                format!("missing required arguments: {}", missing.join(", ")),
            ));
        }

        let mut extra = Document::new();
        for (key, value) in kwargs.iter() {
            if self.declares(key) {
                continue;
            }
            if !self.variadic_kwargs {
                return Err(MongodogError::invalid_arguments(
                    self.method,
                    format!("got an unexpected keyword argument '{}'", key),
                ));
            }
            extra.insert(key, value.clone());
        }

        Ok(BoundArgs { declared, extra })
    }
}

/// Arguments bound to a signature
#[derive(Debug, Clone, PartialEq)]
pub struct BoundArgs {
    declared: Document,
    extra: Document,
}

impl BoundArgs {
    /// Value of a declared parameter; null for names the signature does not declare
    pub fn get(&self, name: &str) -> &Value {
        self.declared.get(name).unwrap_or(&NULL)
    }

    /// Declared parameters in declaration order
    pub fn declared(&self) -> &Document {
        &self.declared
    }

    /// Keyword arguments collected by the variadic tail
    pub fn extra(&self) -> &Document {
        &self.extra
    }

    pub fn into_parts(self) -> (Document, Document) {
        (self.declared, self.extra)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;

    const PARAMS: &[Param] = &[
        Param::required("spec"),
        Param::optional("skip", ParamDefault::Int(0)),
        Param::optional("tag_sets", ParamDefault::ArrayOfEmptyDocument),
    ];

    const VARIADIC: Signature = Signature::new("find", PARAMS, true);
    const STRICT: Signature = Signature::new("distinct", PARAMS, false);

    #[test]
    fn test_positional_then_defaults() {
        let bound = VARIADIC.bind(&[Value::from(doc! { "a" => 0 })], &Document::new()).unwrap();

        assert_eq!(bound.get("spec"), &Value::from(doc! { "a" => 0 }));
        assert_eq!(bound.get("skip"), &Value::Int(0));
        assert_eq!(bound.get("tag_sets"), &Value::Array(vec![Value::Document(Document::new())]));
        assert_eq!(bound.declared().keys().collect::<Vec<_>>(), vec!["spec", "skip", "tag_sets"]);
    }

    #[test]
    fn test_keyword_arguments_fill_by_name() {
        let bound = VARIADIC
            .bind(&[], &doc! { "skip" => 5, "spec" => Value::Null })
            .unwrap();

        assert_eq!(bound.get("skip"), &Value::Int(5));
        assert_eq!(bound.get("spec"), &Value::Null);
    }

    #[test]
    fn test_extra_keywords_collected_when_variadic() {
        let bound = VARIADIC
            .bind(&[Value::Null], &doc! { "w" => 1, "j" => true })
            .unwrap();

        assert_eq!(bound.extra(), &doc! { "w" => 1, "j" => true });
    }

    #[test]
    fn test_extra_keywords_rejected_when_strict() {
        let err = STRICT.bind(&[Value::Null], &doc! { "w" => 1 }).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid arguments for distinct: got an unexpected keyword argument 'w'"
        );
    }

    #[test]
    fn test_missing_required() {
        let err = VARIADIC.bind(&[], &Document::new()).unwrap_err();
        assert!(err.to_string().contains("missing required arguments: 'spec'"));
    }

    #[test]
    fn test_too_many_positionals() {
        let args = vec![Value::Null, Value::Int(1), Value::Null, Value::Null];
        let err = VARIADIC.bind(&args, &Document::new()).unwrap_err();
        assert!(err.to_string().contains("takes at most 3 positional arguments (4 given)"));
    }

    #[test]
    fn test_multiple_values_for_argument() {
        let err = VARIADIC.bind(&[Value::Null, Value::Int(1)], &doc! { "skip" => 2 }).unwrap_err();
        assert!(err.to_string().contains("got multiple values for argument 'skip'"));
    }

    #[test]
    fn test_unknown_name_reads_as_null() {
        let bound = VARIADIC.bind(&[Value::Int(1)], &Document::new()).unwrap();
        assert_eq!(bound.get("nope"), &Value::Null);
    }
}
