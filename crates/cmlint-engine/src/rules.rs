//! # Schema Rule Engine
//!
//! Shape-checking rules applied to every document in the corpus, the
//! synthetic merged view included. Rules are independent and non-fatal:
//! a violation appends to the report and linting continues.
//!
//! Severity follows one principle: structurally required data that is
//! wrong is an error (version mismatch, wrong check `type`, malformed
//! remediation, missing `settings` pieces); everything cosmetic — an
//! unexpected key, a descriptive field of the wrong scalar type — is a
//! warning, which keeps the schema forward-compatible.

use cmlint_core::{Report, Value, ValueError};

use crate::store::Corpus;

/// The only accepted document schema version.
pub const EXPECTED_VERSION: &str = "2.0.0";

/// The only check type the Hiera compiler understands.
pub const CHECK_TYPE: &str = "puppet-class-parameter";

const SETTINGS_KEYS: [&str; 2] = ["parameter", "value"];
const IMPORTED_DATA_KEYS: [&str; 2] = ["checktext", "fixtext"];

/// Lint every document in the corpus, merged view included.
pub fn lint_corpus(corpus: &Corpus, report: &mut Report) {
    for (key, document) in corpus.documents() {
        lint_document(key, document, report);
    }
}

/// Lint one document. A structural failure at the root (e.g. the document
/// is a bare scalar) is reported as a single error; the caller moves on to
/// the next document.
pub fn lint_document(doc_key: &str, document: &Value, report: &mut Report) {
    if let Err(e) = lint_root(doc_key, document, report) {
        report.error(format!("{doc_key}: {e}"));
    }
}

fn lint_root(doc_key: &str, document: &Value, report: &mut Report) -> Result<(), ValueError> {
    let root = document.as_mapping()?;

    match root.get("version") {
        Some(Value::String(v)) if v == EXPECTED_VERSION => {}
        Some(other) => report.error(format!(
            "{doc_key}: version must be '{EXPECTED_VERSION}', got {other}"
        )),
        None => report.error(format!("{doc_key}: missing required key 'version'")),
    }

    for (key, section) in root {
        match key.as_str() {
            "version" => {}
            "profiles" => lint_section(doc_key, "profiles", section, report, lint_profile),
            "ce" => lint_section(doc_key, "ce", section, report, lint_ce),
            "checks" => lint_section(doc_key, "checks", section, report, lint_check),
            "controls" => lint_section(doc_key, "controls", section, report, lint_control),
            other => report.warning(format!("{doc_key}: unexpected top-level key '{other}'")),
        }
    }

    Ok(())
}

/// Validate the named entries of one top-level section.
fn lint_section(
    doc_key: &str,
    section: &str,
    value: &Value,
    report: &mut Report,
    entry_rule: fn(&str, &indexmap::IndexMap<String, Value>, &mut Report),
) {
    let entries = match value.as_mapping() {
        Ok(entries) => entries,
        Err(_) => {
            report.warning(format!(
                "{doc_key}: {section}: expected mapping, got {}",
                value.type_name()
            ));
            return;
        }
    };
    for (name, entry) in entries {
        let ctx = format!("{doc_key}: {section} '{name}'");
        match entry.as_mapping() {
            Ok(fields) => entry_rule(&ctx, fields, report),
            Err(_) => report.warning(format!(
                "{ctx}: expected mapping, got {}",
                entry.type_name()
            )),
        }
    }
}

fn lint_profile(ctx: &str, fields: &indexmap::IndexMap<String, Value>, report: &mut Report) {
    for (key, value) in fields {
        match key.as_str() {
            "title" | "description" => expect_string(ctx, key, value, report),
            "controls" => check_truthy_map(ctx, key, value, report),
            "ces" | "checks" => check_literal_true_map(ctx, key, value, report),
            "confine" => check_confine(ctx, value, report),
            other => warn_unexpected(ctx, other, report),
        }
    }
}

fn lint_ce(ctx: &str, fields: &indexmap::IndexMap<String, Value>, report: &mut Report) {
    for (key, value) in fields {
        match key.as_str() {
            "title" | "description" | "notes" => expect_string(ctx, key, value, report),
            "controls" => check_truthy_map(ctx, key, value, report),
            "identifiers" => check_identifiers(ctx, value, report),
            "oval-ids" => check_string_list(ctx, key, value, report),
            "confine" => check_confine(ctx, value, report),
            "imported_data" => check_imported_data(ctx, value, report),
            other => warn_unexpected(ctx, other, report),
        }
    }
}

fn lint_check(ctx: &str, fields: &indexmap::IndexMap<String, Value>, report: &mut Report) {
    match fields.get("type") {
        Some(Value::String(t)) if t == CHECK_TYPE => {}
        Some(other) => report.error(format!(
            "{ctx}: type must be '{CHECK_TYPE}', got {other}"
        )),
        None => report.error(format!("{ctx}: missing required key 'type'")),
    }

    match fields.get("settings") {
        Some(settings) => lint_settings(ctx, settings, report),
        None => report.error(format!("{ctx}: missing required key 'settings'")),
    }

    for (key, value) in fields {
        match key.as_str() {
            "type" | "settings" => {}
            "controls" => check_truthy_map(ctx, key, value, report),
            "identifiers" => check_identifiers(ctx, value, report),
            "oval-ids" | "ces" => check_string_list(ctx, key, value, report),
            "confine" => check_confine(ctx, value, report),
            "remediation" => lint_remediation(ctx, value, report),
            other => warn_unexpected(ctx, other, report),
        }
    }
}

/// Top-level `controls` entries have no fixed schema beyond being mappings
/// with descriptive fields; only the descriptive fields are type-checked.
fn lint_control(ctx: &str, fields: &indexmap::IndexMap<String, Value>, report: &mut Report) {
    for (key, value) in fields {
        if matches!(key.as_str(), "title" | "description") {
            expect_string(ctx, key, value, report);
        }
    }
}

fn lint_settings(ctx: &str, settings: &Value, report: &mut Report) {
    let fields = match settings.as_mapping() {
        Ok(fields) => fields,
        Err(_) => {
            report.error(format!(
                "{ctx}: settings: expected mapping, got {}",
                settings.type_name()
            ));
            return;
        }
    };

    match fields.get("parameter") {
        Some(Value::String(p)) if !p.is_empty() => {}
        Some(Value::String(_)) => {
            report.error(format!("{ctx}: settings: parameter must not be empty"));
        }
        Some(other) => report.error(format!(
            "{ctx}: settings: parameter must be a string, got {}",
            other.type_name()
        )),
        None => report.error(format!("{ctx}: settings: missing required key 'parameter'")),
    }

    // `value` may hold anything, including null — only its presence is required.
    if !fields.contains_key("value") {
        report.error(format!("{ctx}: settings: missing required key 'value'"));
    }

    for key in fields.keys() {
        if !SETTINGS_KEYS.contains(&key.as_str()) {
            report.warning(format!("{ctx}: settings: unexpected key '{key}'"));
        }
    }
}

fn lint_remediation(ctx: &str, value: &Value, report: &mut Report) {
    let sections = match value.as_mapping() {
        Ok(sections) => sections,
        Err(_) => {
            report.error(format!(
                "{ctx}: remediation: expected mapping, got {}",
                value.type_name()
            ));
            return;
        }
    };
    for (section, content) in sections {
        match section.as_str() {
            "scan-false-positive" | "disabled" => {
                check_remediation_entries(ctx, section, content, "reason", report, |v| {
                    matches!(v, Value::String(_))
                });
            }
            "risk" => {
                check_remediation_entries(ctx, section, content, "level", report, |v| {
                    matches!(v, Value::Integer(_))
                });
            }
            other => report.warning(format!(
                "{ctx}: remediation: unexpected section '{other}'"
            )),
        }
    }
}

/// Remediation sections are lists of mappings, each carrying one required
/// field of a fixed type.
fn check_remediation_entries(
    ctx: &str,
    section: &str,
    content: &Value,
    required: &str,
    report: &mut Report,
    type_ok: fn(&Value) -> bool,
) {
    let entries = match content.as_sequence() {
        Ok(entries) => entries,
        Err(_) => {
            report.error(format!(
                "{ctx}: remediation: {section}: expected list, got {}",
                content.type_name()
            ));
            return;
        }
    };
    for entry in entries {
        let fields = match entry.as_mapping() {
            Ok(fields) => fields,
            Err(_) => {
                report.error(format!(
                    "{ctx}: remediation: {section}: entries must be mappings, got {}",
                    entry.type_name()
                ));
                continue;
            }
        };
        match fields.get(required) {
            Some(v) if type_ok(v) => {}
            Some(v) => report.error(format!(
                "{ctx}: remediation: {section}: '{required}' has wrong type {}",
                v.type_name()
            )),
            None => report.error(format!(
                "{ctx}: remediation: {section}: entries require '{required}'"
            )),
        }
    }
}

fn expect_string(ctx: &str, key: &str, value: &Value, report: &mut Report) {
    if !matches!(value, Value::String(_)) {
        report.warning(format!(
            "{ctx}: {key}: expected string, got {}",
            value.type_name()
        ));
    }
}

fn warn_unexpected(ctx: &str, key: &str, report: &mut Report) {
    report.warning(format!("{ctx}: unexpected key '{key}'"));
}

/// `controls` maps control names to truthy markers.
fn check_truthy_map(ctx: &str, key: &str, value: &Value, report: &mut Report) {
    let entries = match value.as_mapping() {
        Ok(entries) => entries,
        Err(_) => {
            report.warning(format!(
                "{ctx}: {key}: expected mapping, got {}",
                value.type_name()
            ));
            return;
        }
    };
    for (name, marker) in entries {
        if !marker.is_truthy() {
            report.warning(format!("{ctx}: {key}: '{name}' is not truthy"));
        }
    }
}

/// Profile `ces`/`checks` map names to the literal `true`.
fn check_literal_true_map(ctx: &str, key: &str, value: &Value, report: &mut Report) {
    let entries = match value.as_mapping() {
        Ok(entries) => entries,
        Err(_) => {
            report.warning(format!(
                "{ctx}: {key}: expected mapping, got {}",
                value.type_name()
            ));
            return;
        }
    };
    for (name, marker) in entries {
        if *marker != Value::Boolean(true) {
            report.warning(format!(
                "{ctx}: {key}: '{name}' must be the literal true, got {marker}"
            ));
        }
    }
}

/// `identifiers` maps identifier scheme names to lists of strings.
fn check_identifiers(ctx: &str, value: &Value, report: &mut Report) {
    let entries = match value.as_mapping() {
        Ok(entries) => entries,
        Err(_) => {
            report.warning(format!(
                "{ctx}: identifiers: expected mapping, got {}",
                value.type_name()
            ));
            return;
        }
    };
    for (name, ids) in entries {
        check_string_list(ctx, &format!("identifiers: {name}"), ids, report);
    }
}

fn check_string_list(ctx: &str, key: &str, value: &Value, report: &mut Report) {
    let items = match value.as_sequence() {
        Ok(items) => items,
        Err(_) => {
            report.warning(format!(
                "{ctx}: {key}: expected list, got {}",
                value.type_name()
            ));
            return;
        }
    };
    for item in items {
        if !matches!(item, Value::String(_)) {
            report.warning(format!(
                "{ctx}: {key}: expected list of strings, got {} element",
                item.type_name()
            ));
        }
    }
}

fn check_confine(ctx: &str, value: &Value, report: &mut Report) {
    if value.as_mapping().is_err() {
        report.warning(format!(
            "{ctx}: confine: expected mapping, got {}",
            value.type_name()
        ));
    }
}

/// `imported_data` carries only imported STIG text fields.
fn check_imported_data(ctx: &str, value: &Value, report: &mut Report) {
    let entries = match value.as_mapping() {
        Ok(entries) => entries,
        Err(_) => {
            report.warning(format!(
                "{ctx}: imported_data: expected mapping, got {}",
                value.type_name()
            ));
            return;
        }
    };
    for (key, text) in entries {
        if !IMPORTED_DATA_KEYS.contains(&key.as_str()) {
            report.warning(format!("{ctx}: imported_data: unexpected key '{key}'"));
        } else if !matches!(text, Value::String(_)) {
            report.warning(format!(
                "{ctx}: imported_data: {key}: expected string, got {}",
                text.type_name()
            ));
        }
    }
}
