//! Parameter override engine.
//!
//! # Responsibilities
//! - Force every rule field onto the outbound form
//! - Leave non-rule text fields and all file parts untouched
//! - Report each applied rule as an [`OverrideEvent`]
//!
//! # Design Decisions
//! - Produces a fresh form; the inbound form is only borrowed
//! - A rule replaces the first occurrence of its field in place and drops
//!   later duplicates, so the outbound value is exactly the rule's
//! - Rules missing from the inbound form are appended in rule order
//! - File parts never take part in rule lookup

use crate::config::{ListEncoding, OverrideRules, RuleValue};
use crate::form::{Form, FormPart};

/// A rule applied to one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideEvent {
    pub field: String,
    /// Client value, `None` when the client did not send the field.
    pub previous: Option<String>,
    /// Value written to the outbound form (list values comma joined here).
    pub applied: String,
}

/// Output of [`apply_overrides`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rewrite {
    pub form: Form,
    pub events: Vec<OverrideEvent>,
}

/// Build the outbound form for `inbound` under `rules`.
pub fn apply_overrides(inbound: &Form, rules: &OverrideRules, encoding: ListEncoding) -> Rewrite {
    if rules.is_empty() {
        return Rewrite {
            form: inbound.clone(),
            events: Vec::new(),
        };
    }

    let mut form = Form::with_capacity(inbound.len() + rules.len());
    let mut events = Vec::with_capacity(rules.len());
    let mut applied = vec![false; rules.len()];

    for part in inbound.parts() {
        let FormPart::Text { name, value, .. } = part else {
            form.push(part.clone());
            continue;
        };

        let Some((index, rule)) = rules.lookup(name) else {
            form.push(part.clone());
            continue;
        };

        if applied[index] {
            continue;
        }
        applied[index] = true;
        events.push(write_rule(&mut form, name, rule, Some(value.clone()), encoding));
    }

    for (index, (name, rule)) in rules.iter().enumerate() {
        if !applied[index] {
            events.push(write_rule(&mut form, name, rule, None, encoding));
        }
    }

    Rewrite { form, events }
}

fn write_rule(
    form: &mut Form,
    name: &str,
    rule: &RuleValue,
    previous: Option<String>,
    encoding: ListEncoding,
) -> OverrideEvent {
    let values = rule.render(encoding);
    let event = OverrideEvent {
        field: name.to_string(),
        previous,
        applied: values.join(","),
    };
    for value in values {
        form.push(FormPart::text(name, value));
    }
    event
}
