//! Placeholder interpolation for prompt templates.
//!
//! Templates use `{name}` placeholders with an optional format spec
//! (`{latency:.2f}`). `{{` and `}}` produce literal braces. Unknown
//! placeholders are left untouched so a custom template never fails to
//! render.

use lazy_static::lazy_static;
use regex::{Captures, Regex};

lazy_static! {
    static ref PLACEHOLDER: Regex =
        Regex::new(r"\{\{|\}\}|\{(\w+)(?::([^{}]*))?\}").unwrap();
    static ref FIXED_PRECISION: Regex = Regex::new(r"^\.(\d+)f$").unwrap();
}

/// A value that can be substituted into a template.
#[derive(Debug, Clone, Copy)]
pub enum TemplateValue<'a> {
    Text(&'a str),
    Number(f64),
}

impl TemplateValue<'_> {
    fn render(&self, spec: Option<&str>) -> String {
        match self {
            TemplateValue::Text(text) => (*text).to_string(),
            TemplateValue::Number(value) => {
                let precision = spec
                    .and_then(|s| FIXED_PRECISION.captures(s))
                    .and_then(|c| c[1].parse::<usize>().ok());
                match precision {
                    Some(p) => format!("{value:.p$}"),
                    None => value.to_string(),
                }
            }
        }
    }
}

/// Interpolate `vars` into `template` in a single pass.
///
/// Substituted text is never re-scanned, so a retrieved context containing
/// `{question}` is inserted verbatim.
pub fn interpolate(template: &str, vars: &[(&str, TemplateValue<'_>)]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures<'_>| {
            let whole = &caps[0];
            match whole {
                "{{" => return "{".to_string(),
                "}}" => return "}".to_string(),
                _ => {}
            }
            let name = &caps[1];
            let spec = caps.get(2).map(|m| m.as_str());
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.render(spec))
                .unwrap_or_else(|| whole.to_string())
        })
        .into_owned()
}

/// Build the augmented generation prompt.
pub fn render_augmented_prompt(template: &str, context: &str, question: &str) -> String {
    interpolate(
        template,
        &[
            ("context", TemplateValue::Text(context)),
            ("question", TemplateValue::Text(question)),
        ],
    )
}

/// Build the evaluator prompt.
pub fn render_evaluation_prompt(
    template: &str,
    question: &str,
    answer: &str,
    latency_seconds: f64,
) -> String {
    interpolate(
        template,
        &[
            ("question", TemplateValue::Text(question)),
            ("answer", TemplateValue::Text(answer)),
            ("latency", TemplateValue::Number(latency_seconds)),
        ],
    )
}
