//! # Validation Rules
//!
//! Fields carry an optional rule string in a small pipe-delimited language
//! (`required|min:3|max:10`). It is parsed into tagged [`Directive`]s and
//! combined with the field's type and enumeration into a library-independent
//! [`ValidationExpression`]: one base predicate followed by ordered modifiers,
//! each with its failure message.
//!
//! Target validation libraries plug in through [`ValidationTarget`]; the
//! expression can also be evaluated directly against JSON values.

use crate::schema::model::format_number;
use crate::schema::model::is_upload_hint;
use crate::schema::model::SemanticType;
use chrono::DateTime;
use chrono::NaiveDate;
use chrono::NaiveDateTime;
use regex::Regex;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use std::sync::OnceLock;

const OBJECT_ID_MESSAGE: &str = "Invalid ObjectId";
const DATE_MESSAGE: &str = "Invalid date format";

/// One directive of a rule string.
#[derive(Clone, Debug, PartialEq)]
pub enum Directive {
    /// `required`
    Required,
    /// `min:N`
    Min(f64),
    /// `max:N`
    Max(f64),
    /// `mimes:a,b,c`
    Mimes(Vec<String>),
    /// `date_format:FMT`
    DateFormat(String),
    /// `in:a,b,c`
    In(Vec<String>),
}

impl Directive {
    /// Parses one trimmed token, `None` for anything unrecognized.
    pub fn parse(token: &str) -> Option<Directive> {
        let token = token.trim();
        if token.eq_ignore_ascii_case("required") {
            return Some(Directive::Required);
        }
        let (name, argument) = token.split_once(':')?;
        let argument = argument.trim();
        match name.trim().to_ascii_lowercase().as_str() {
            "min" => argument.parse::<f64>().ok().filter(|bound| bound.is_finite()).map(Directive::Min),
            "max" => argument.parse::<f64>().ok().filter(|bound| bound.is_finite()).map(Directive::Max),
            "mimes" => non_empty(split_list(argument)).map(Directive::Mimes),
            "date_format" => Some(Directive::DateFormat(argument.to_owned())),
            "in" => non_empty(split_list(argument)).map(Directive::In),
            _ => None,
        }
    }
}

/// Splits a rule string on `|`, keeping directive order and dropping
/// tokens that do not parse.
pub fn parse_rules(rules: &str) -> Vec<Directive> {
    rules
        .split('|')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .filter_map(|token| {
            let directive = Directive::parse(token);
            if directive.is_none() {
                tracing::debug!("Ignoring validation directive '{}'", token);
            }
            directive
        })
        .collect()
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}

fn non_empty(values: Vec<String>) -> Option<Vec<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

/// What the value itself must be.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BasePredicate {
    /// One of a closed list of labels
    OneOf(Vec<String>),
    /// 24 hexadecimal digits
    ObjectId,
    Number,
    Boolean,
    /// A parseable date string
    Date,
    Text,
}

impl BasePredicate {
    fn for_type(semantic_type: SemanticType, is_foreign: bool) -> Self {
        if is_foreign {
            return BasePredicate::ObjectId;
        }
        match semantic_type {
            SemanticType::Reference => BasePredicate::ObjectId,
            SemanticType::Number => BasePredicate::Number,
            SemanticType::Boolean => BasePredicate::Boolean,
            SemanticType::Date => BasePredicate::Date,
            SemanticType::String => BasePredicate::Text,
        }
    }

    fn message(&self) -> String {
        match self {
            BasePredicate::OneOf(_) => "Invalid enum value",
            BasePredicate::ObjectId => OBJECT_ID_MESSAGE,
            BasePredicate::Number => "Expected number",
            BasePredicate::Boolean => "Expected boolean",
            BasePredicate::Date => DATE_MESSAGE,
            BasePredicate::Text => "Expected string",
        }
        .to_owned()
    }

    fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (BasePredicate::OneOf(values), Value::String(text)) => values.contains(text),
            (BasePredicate::OneOf(values), Value::Number(_) | Value::Bool(_)) => values.contains(&value.to_string()),
            (BasePredicate::ObjectId, Value::String(text)) => object_id_pattern().is_match(text),
            (BasePredicate::Number, Value::Number(_)) => true,
            (BasePredicate::Boolean, Value::Bool(_)) => true,
            (BasePredicate::Date, Value::String(text)) => parse_date(text),
            (BasePredicate::Text, Value::String(_)) => true,
            _ => false,
        }
    }
}

/// Refinements applied after the base predicate, in rule order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Modifier {
    Required,
    /// Minimum length of text, minimum value of numbers
    Min(f64),
    /// Maximum length of text, maximum value of numbers
    Max(f64),
    /// Accepted content types of an uploaded file
    Mimes(Vec<String>),
    DateFormat(String),
}

impl Modifier {
    fn message(&self) -> String {
        match self {
            Modifier::Required => "Required".to_owned(),
            Modifier::Min(bound) => format!("Min is {}", format_number(*bound)),
            Modifier::Max(bound) => format!("Max is {}", format_number(*bound)),
            Modifier::Mimes(_) => "Invalid file type".to_owned(),
            Modifier::DateFormat(_) => DATE_MESSAGE.to_owned(),
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            Modifier::Required => !is_blank(value),
            Modifier::Min(bound) => measure(value).map(|size| size >= *bound).unwrap_or(true),
            Modifier::Max(bound) => measure(value).map(|size| size <= *bound).unwrap_or(true),
            Modifier::Mimes(types) => {
                let content_type = match value {
                    Value::Object(file) => file.get("type").and_then(Value::as_str),
                    Value::String(text) => Some(text.as_str()),
                    _ => None,
                };
                content_type
                    .map(|content_type| types.iter().any(|kind| content_type.contains(kind.as_str())))
                    .unwrap_or(false)
            }
            Modifier::DateFormat(_) => value.as_str().map(|text| date_shape_pattern().is_match(text)).unwrap_or(false),
        }
    }
}

/// Base predicate with its failure message
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BaseCheck {
    pub predicate: BasePredicate,
    pub message: String,
}

/// Modifier with its failure message
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModifierCheck {
    pub modifier: Modifier,
    pub message: String,
}

/// Structured validation of one field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationExpression {
    pub base: BaseCheck,
    pub modifiers: Vec<ModifierCheck>,
    /// Base is the field's own enumeration rather than the declared type
    #[serde(default)]
    pub enumerated: bool,
}

impl ValidationExpression {
    /// Builds the expression of a field.
    ///
    /// An enumeration takes precedence over the declared type, foreign fields
    /// and references validate as identifiers. `in:` restarts the chain: its
    /// list becomes the base and only the directives after it apply. It is
    /// ignored when the field has an enumeration. `mimes:` only applies to
    /// upload fields.
    pub fn translate(
        semantic_type: SemanticType,
        is_foreign: bool,
        enum_values: Option<&[String]>,
        rules: Option<&str>,
        ui_hint: Option<&str>,
    ) -> Self {
        let enumerated = enum_values.is_some_and(|values| !values.is_empty());
        let mut base = match enum_values {
            Some(values) if enumerated => BasePredicate::OneOf(values.to_vec()),
            _ => BasePredicate::for_type(semantic_type, is_foreign),
        };
        let mut modifiers = Vec::<ModifierCheck>::new();
        for directive in parse_rules(rules.unwrap_or_default()) {
            let modifier = match directive {
                Directive::In(_) if enumerated => {
                    tracing::debug!("Ignoring 'in' on a field with enumerated values");
                    continue;
                }
                Directive::In(values) => {
                    base = BasePredicate::OneOf(values);
                    modifiers.clear();
                    continue;
                }
                Directive::Mimes(_) if !is_upload_hint(ui_hint) => {
                    tracing::debug!("Ignoring 'mimes' on a field without file upload");
                    continue;
                }
                Directive::Required => Modifier::Required,
                Directive::Min(bound) => Modifier::Min(bound),
                Directive::Max(bound) => Modifier::Max(bound),
                Directive::Mimes(types) => Modifier::Mimes(types),
                Directive::DateFormat(format) => Modifier::DateFormat(format),
            };
            modifiers.push(ModifierCheck {
                message: modifier.message(),
                modifier,
            });
        }

        ValidationExpression {
            base: BaseCheck {
                message: base.message(),
                predicate: base,
            },
            modifiers,
            enumerated,
        }
    }

    pub fn is_required(&self) -> bool {
        self.modifiers.iter().any(|check| check.modifier == Modifier::Required)
    }

    /// Failure messages for `value` in predicate order, empty when valid.
    ///
    /// Blank values (null, empty text, empty list) only fail `required`.
    /// A failed base predicate stops evaluation.
    pub fn evaluate(&self, value: &Value) -> Vec<String> {
        let mut failures = Vec::<String>::new();
        if is_blank(value) {
            if let Some(check) = self.modifiers.iter().find(|check| check.modifier == Modifier::Required) {
                failures.push(check.message.to_owned());
            }
            return failures;
        }

        // file descriptors of upload fields stand in for the base value
        let is_file = value.is_object() && self.modifiers.iter().any(|check| matches!(check.modifier, Modifier::Mimes(_)));
        if !is_file && !self.base.predicate.accepts(value) {
            failures.push(self.base.message.to_owned());
            return failures;
        }
        for check in &self.modifiers {
            if !check.modifier.accepts(value) {
                failures.push(check.message.to_owned());
            }
        }
        failures
    }

    /// Renders the expression for a target validation library.
    pub fn render<T: ValidationTarget>(&self, target: &T) -> T::Output {
        target.render(self)
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(text) => text.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn measure(value: &Value) -> Option<f64> {
    match value {
        Value::String(text) => Some(text.chars().count() as f64),
        Value::Number(number) => number.as_f64(),
        Value::Array(items) => Some(items.len() as f64),
        _ => None,
    }
}

fn parse_date(text: &str) -> bool {
    let text = text.trim();
    DateTime::parse_from_rfc3339(text).is_ok()
        || ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"]
            .iter()
            .any(|format| NaiveDateTime::parse_from_str(text, format).is_ok())
        || ["%Y-%m-%d", "%Y/%m/%d"]
            .iter()
            .any(|format| NaiveDate::parse_from_str(text, format).is_ok())
}

fn object_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9a-fA-F]{24}$").expect("Hardcode regex pattern"))
}

fn date_shape_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\d{4}-\d{2}-\d{2}([T ]\d{2}:\d{2}(:\d{2}(\.\d+)?)?)?").expect("Hardcode regex pattern"))
}

/// Translation of a [`ValidationExpression`] into one validation library.
pub trait ValidationTarget {
    type Output;

    fn render(&self, expression: &ValidationExpression) -> Self::Output;
}

/// Renders Zod schema source, e.g.
/// `z.string().min(3, { message: 'Min is 3' })`.
///
/// Field enumerations render as a bare `z.enum([...])`, an `in:` list as
/// `z.enum([...])` followed by the later directives. Date formats are covered
/// by the date base refinement and add nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct ZodTarget;

impl ValidationTarget for ZodTarget {
    type Output = String;

    fn render(&self, expression: &ValidationExpression) -> String {
        let mut chain = match &expression.base.predicate {
            BasePredicate::OneOf(values) if expression.enumerated => return zod_enum(values),
            BasePredicate::OneOf(values) => zod_enum(values),
            BasePredicate::ObjectId => format!(
                "z.string().regex(/^[0-9a-fA-F]{{24}}$/, {{ message: '{}' }})",
                quote(&expression.base.message)
            ),
            BasePredicate::Number => "z.number()".to_owned(),
            BasePredicate::Boolean => "z.boolean()".to_owned(),
            BasePredicate::Date => format!(
                "z.string().refine(val => !isNaN(Date.parse(val)), {{ message: '{}' }})",
                quote(&expression.base.message)
            ),
            BasePredicate::Text => "z.string()".to_owned(),
        };
        for check in &expression.modifiers {
            let message = quote(&check.message);
            match &check.modifier {
                Modifier::Required => chain.push_str(&format!(".nonempty({{ message: '{message}' }})")),
                Modifier::Min(bound) => chain.push_str(&format!(".min({}, {{ message: '{message}' }})", format_number(*bound))),
                Modifier::Max(bound) => chain.push_str(&format!(".max({}, {{ message: '{message}' }})", format_number(*bound))),
                Modifier::Mimes(types) => chain.push_str(&format!(
                    ".refine(file => file && {}.some(t => file.type.includes(t)), {{ message: '{message}' }})",
                    Value::from(types.to_owned())
                )),
                Modifier::DateFormat(_) => (),
            }
        }
        chain
    }
}

fn zod_enum(values: &[String]) -> String {
    let values: Vec<String> = values.iter().map(|value| format!("'{}'", quote(value))).collect();
    format!("z.enum([{}])", values.join(", "))
}

/// Escapes text for a single-quoted JavaScript string.
fn quote(text: &str) -> String {
    text.replace('\\', "\\\\").replace('\'', "\\'")
}
