//! # Hiera Compiler
//!
//! Compiles, for one profile and an optional confinement context, the
//! flattened parameter-to-value mapping consumed by the downstream
//! configuration-management pipeline.
//!
//! The pass has four stages: a confined re-merge of the source documents
//! (entries whose `confine` fails the active context are projected out
//! before merging), a cross-reference index linking checks to the controls
//! and compliance elements that reference them, profile resolution, and
//! order-sensitive parameter resolution with type-aware merge rules.
//!
//! ## Confinement Matching
//!
//! An entry with a `confine` mapping is kept if ANY of its settings
//! intersects the active context (OR across keys), but a setting absent
//! from the context excludes the entry immediately. This asymmetry is
//! long-standing behavior that existing content relies on; it is preserved
//! verbatim, not "corrected" to AND semantics.

use indexmap::IndexMap;

use cmlint_core::{Report, Value};

use crate::confine::{as_value_list, ConfinementContext};
use crate::rules::CHECK_TYPE;
use crate::store::Corpus;

/// The compiled parameter map for one (profile, context) pair.
pub type HieraResult = IndexMap<String, Value>;

/// Cross-reference index from check, control, and CE names to the check
/// specifications that apply. Valid only within one compile pass.
#[derive(Debug, Default)]
pub struct CheckMap {
    /// Check name → specifications.
    pub checks: IndexMap<String, Vec<Value>>,
    /// Control name → specifications (direct and via CE controls).
    pub controls: IndexMap<String, Vec<Value>>,
    /// CE name → specifications.
    pub ces: IndexMap<String, Vec<Value>>,
}

/// Compile the Hiera parameter map for `profile` under `context`.
///
/// Appends conflict diagnostics to `report`; never fails. An unresolvable
/// profile produces an empty result and a note.
pub fn compile(
    corpus: &Corpus,
    profile: &str,
    context: Option<&ConfinementContext>,
    report: &mut Report,
) -> HieraResult {
    let working = confined_merge(corpus, context, report);
    let check_map = build_check_map(&working, report);
    let specs = gather_specs(&working, profile, &check_map);
    if specs.is_empty() {
        report.note(format!("no Hiera values found for profile '{profile}'"));
        return HieraResult::new();
    }
    resolve_parameters(profile, &specs, report)
}

/// Stage 1: re-merge the source documents with confined entries filtered
/// out, recording redefinition diagnostics along the way.
fn confined_merge(
    corpus: &Corpus,
    context: Option<&ConfinementContext>,
    report: &mut Report,
) -> Value {
    let mut working = Value::mapping();
    for (_, document) in corpus.source_documents() {
        let Ok(sections) = document.as_mapping() else {
            continue;
        };
        let mut projected = IndexMap::with_capacity(sections.len());
        for (section, content) in sections {
            projected.insert(section.clone(), filter_confined(content, context));
        }
        merge_reporting(&mut working, &Value::Mapping(projected), "", report);
    }
    working
}

/// Non-mutating projection of one section with confined entries removed.
/// Without an active context nothing is filtered.
fn filter_confined(content: &Value, context: Option<&ConfinementContext>) -> Value {
    let Some(ctx) = context else {
        return content.clone();
    };
    let Ok(entries) = content.as_mapping() else {
        return content.clone();
    };
    let mut kept = IndexMap::with_capacity(entries.len());
    for (name, entry) in entries {
        if let Some(confine) = entry.get("confine").and_then(|c| c.as_mapping().ok()) {
            if !confine_matches(confine, ctx) {
                continue;
            }
        }
        kept.insert(name.clone(), entry.clone());
    }
    Value::Mapping(kept)
}

/// Whether an entry's confine mapping admits the active context.
///
/// OR across confine keys; a key the context does not carry at all
/// excludes the entry unconditionally. An empty confine mapping never
/// matches: with no key to intersect the context, the entry is excluded.
fn confine_matches(confine: &IndexMap<String, Value>, context: &ConfinementContext) -> bool {
    let mut any_match = false;
    for (setting, allowed) in confine {
        let Some(active) = context.get(setting) else {
            return false;
        };
        let allowed_values = as_value_list(allowed);
        if as_value_list(active)
            .iter()
            .any(|value| allowed_values.contains(value))
        {
            any_match = true;
        }
    }
    any_match
}

/// Deep merge that reports scalar redefinitions: a note when the values
/// are equal, a warning naming both when they differ. The later value
/// always wins. Sequences merge with knockout semantics, silently.
fn merge_reporting(dst: &mut Value, src: &Value, path: &str, report: &mut Report) {
    match (&mut *dst, src) {
        (Value::Mapping(existing), Value::Mapping(incoming)) => {
            for (key, value) in incoming {
                let child = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                match existing.get_mut(key) {
                    Some(slot) => merge_reporting(slot, value, &child, report),
                    None => {
                        existing.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (Value::Sequence(_), Value::Sequence(_)) => dst.deep_merge(src),
        (existing, incoming) => {
            if *existing == *incoming {
                report.note(format!("'{path}' redefined with identical value {incoming}"));
            } else {
                report.warning(format!(
                    "'{path}' redefined: {existing} replaced by {incoming}"
                ));
                *existing = incoming.clone();
            }
        }
    }
}

/// Stage 2: index every usable check under its own name, its truthy
/// control names, and its listed CEs — including, for each listed CE
/// present in the working `ce` section, that CE's own control names.
fn build_check_map(working: &Value, report: &mut Report) -> CheckMap {
    let mut map = CheckMap::default();
    let Some(checks) = working.get("checks").and_then(|c| c.as_mapping().ok()) else {
        return map;
    };
    let ce_section = working.get("ce").and_then(|c| c.as_mapping().ok());

    for (name, check) in checks {
        if !is_indexable(check) {
            // Not an error: the check may be legitimately inapplicable
            // under the active context.
            report.warning(format!(
                "check '{name}' is not a usable {CHECK_TYPE} check; skipping"
            ));
            continue;
        }

        map.checks.entry(name.clone()).or_default().push(check.clone());

        if let Some(controls) = check.get("controls").and_then(|c| c.as_mapping().ok()) {
            for (control, marker) in controls {
                if marker.is_truthy() {
                    map.controls
                        .entry(control.clone())
                        .or_default()
                        .push(check.clone());
                }
            }
        }

        if let Some(ces) = check.get("ces").and_then(|c| c.as_sequence().ok()) {
            for ce_name in ces.iter().filter_map(|v| v.as_str().ok()) {
                map.ces
                    .entry(ce_name.to_string())
                    .or_default()
                    .push(check.clone());

                let ce_controls = ce_section
                    .and_then(|section| section.get(ce_name))
                    .and_then(|ce| ce.get("controls"))
                    .and_then(|c| c.as_mapping().ok());
                if let Some(ce_controls) = ce_controls {
                    for (control, marker) in ce_controls {
                        if marker.is_truthy() {
                            map.controls
                                .entry(control.clone())
                                .or_default()
                                .push(check.clone());
                        }
                    }
                }
            }
        }
    }
    map
}

/// A check enters the index only with the required type and a settings
/// mapping carrying a string `parameter` and a present `value` key.
fn is_indexable(check: &Value) -> bool {
    if check.get("type").and_then(|t| t.as_str().ok()) != Some(CHECK_TYPE) {
        return false;
    }
    let Some(settings) = check.get("settings").and_then(|s| s.as_mapping().ok()) else {
        return false;
    };
    matches!(settings.get("parameter"), Some(Value::String(_))) && settings.contains_key("value")
}

/// Stage 3: gather the specifications the profile references, in the
/// order checks, controls, ces, filtered to truthy entries.
fn gather_specs(working: &Value, profile: &str, map: &CheckMap) -> Vec<Value> {
    let mut specs = Vec::new();
    let Some(entry) = working.get("profiles").and_then(|p| p.get(profile)) else {
        return specs;
    };
    let indexes = [
        ("checks", &map.checks),
        ("controls", &map.controls),
        ("ces", &map.ces),
    ];
    for (field, index) in indexes {
        let Some(named) = entry.get(field).and_then(|f| f.as_mapping().ok()) else {
            continue;
        };
        for (name, marker) in named {
            if !marker.is_truthy() {
                continue;
            }
            if let Some(found) = index.get(name) {
                specs.extend(found.iter().cloned());
            }
        }
    }
    specs
}

/// Stage 4: fold the gathered specifications into the parameter map with
/// type-aware merge rules.
fn resolve_parameters(profile: &str, specs: &[Value], report: &mut Report) -> HieraResult {
    let mut result = HieraResult::new();
    for spec in specs {
        // Guaranteed by is_indexable, but stay total.
        let Some(settings) = spec.get("settings") else {
            continue;
        };
        let Some(parameter) = settings.get("parameter").and_then(|p| p.as_str().ok()) else {
            continue;
        };
        let Some(value) = settings.get("value") else {
            continue;
        };

        match result.get_mut(parameter) {
            None => {
                result.insert(parameter.to_string(), value.clone());
            }
            Some(stored) if stored.type_name() != value.type_name() => {
                report.error(format!(
                    "profile '{profile}': parameter '{parameter}': type mismatch: \
                     {} value {stored} replaced by {} value {value}",
                    stored.type_name(),
                    value.type_name()
                ));
                *stored = value.clone();
            }
            Some(stored) => match value {
                Value::Mapping(_) => {
                    stored.deep_merge(value);
                    report.note(format!(
                        "profile '{profile}': parameter '{parameter}': mappings merged"
                    ));
                }
                Value::Sequence(incoming) => {
                    // Plain concatenate-and-deduplicate: the knockout
                    // convention applies to the document merge, not to
                    // parameter resolution.
                    if let Value::Sequence(items) = stored {
                        for item in incoming {
                            if !items.contains(item) {
                                items.push(item.clone());
                            }
                        }
                    }
                    report.note(format!(
                        "profile '{profile}': parameter '{parameter}': lists merged"
                    ));
                }
                scalar => {
                    if *stored == *scalar {
                        report.note(format!(
                            "profile '{profile}': parameter '{parameter}' redefined \
                             with identical value {scalar}"
                        ));
                    } else {
                        report.warning(format!(
                            "profile '{profile}': parameter '{parameter}' redefined: \
                             {stored} replaced by {scalar}"
                        ));
                        *stored = scalar.clone();
                    }
                }
            },
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::store::load_corpus;

    fn corpus_from(docs: &[&str]) -> Corpus {
        let dir = tempfile::tempdir().unwrap();
        let mut paths: Vec<PathBuf> = Vec::new();
        for (i, doc) in docs.iter().enumerate() {
            let path = dir.path().join(format!("{i:02}.yaml"));
            std::fs::write(&path, doc).unwrap();
            paths.push(path);
        }
        let mut report = Report::new();
        let corpus = load_corpus(&paths, &mut report).unwrap();
        assert!(report.is_clean(), "fixture failed to load: {report:?}");
        corpus
    }

    fn ctx(pairs: &[(&str, &str)]) -> ConfinementContext {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), Value::from(*v)))
            .collect()
    }

    const BASELINE: &str = r#"
version: 2.0.0
profiles:
  baseline:
    controls:
      ctrl-1: true
checks:
  chk-1:
    type: puppet-class-parameter
    settings:
      parameter: foo::bar
      value: true
    controls:
      ctrl-1: true
"#;

    #[test]
    fn control_linked_check_resolves() {
        let corpus = corpus_from(&[BASELINE]);
        let mut report = Report::new();
        let result = compile(&corpus, "baseline", None, &mut report);
        assert_eq!(result.len(), 1);
        assert_eq!(result["foo::bar"], Value::Boolean(true));
        assert!(report.errors().is_empty(), "errors: {:?}", report.errors());
    }

    #[test]
    fn compile_is_deterministic() {
        let corpus = corpus_from(&[BASELINE]);
        let mut first = Report::new();
        let mut second = Report::new();
        let a = compile(&corpus, "baseline", None, &mut first);
        let b = compile(&corpus, "baseline", None, &mut second);
        assert_eq!(a, b);
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_profile_notes_no_values() {
        let corpus = corpus_from(&[BASELINE]);
        let mut report = Report::new();
        let result = compile(&corpus, "missing", None, &mut report);
        assert!(result.is_empty());
        assert_eq!(
            report.notes(),
            &["no Hiera values found for profile 'missing'"]
        );
    }

    #[test]
    fn wrong_check_type_is_skipped_with_warning() {
        let corpus = corpus_from(&[r#"
version: 2.0.0
profiles:
  baseline:
    checks:
      chk-1: true
checks:
  chk-1:
    type: manual
    settings:
      parameter: foo::bar
      value: true
"#]);
        let mut report = Report::new();
        let result = compile(&corpus, "baseline", None, &mut report);
        assert!(result.is_empty());
        assert!(report.warnings().iter().any(|w| w.contains("chk-1")));
    }

    #[test]
    fn type_mismatch_errors_and_later_value_wins() {
        let corpus = corpus_from(&[r#"
version: 2.0.0
profiles:
  baseline:
    controls:
      ctrl-1: true
checks:
  chk-a:
    type: puppet-class-parameter
    settings:
      parameter: same::param
      value: x
    controls:
      ctrl-1: true
  chk-b:
    type: puppet-class-parameter
    settings:
      parameter: same::param
      value: 42
    controls:
      ctrl-1: true
"#]);
        let mut report = Report::new();
        let result = compile(&corpus, "baseline", None, &mut report);
        assert_eq!(result["same::param"], Value::Integer(42));
        assert_eq!(report.errors().len(), 1);
        assert!(report.errors()[0].contains("type mismatch"));
    }

    #[test]
    fn mapping_values_merge_field_by_field() {
        let corpus = corpus_from(&[r#"
version: 2.0.0
profiles:
  baseline:
    controls:
      ctrl-1: true
checks:
  chk-a:
    type: puppet-class-parameter
    settings:
      parameter: nested::map
      value:
        keep: 1
        shared: old
    controls:
      ctrl-1: true
  chk-b:
    type: puppet-class-parameter
    settings:
      parameter: nested::map
      value:
        shared: new
        added: 2
    controls:
      ctrl-1: true
"#]);
        let mut report = Report::new();
        let result = compile(&corpus, "baseline", None, &mut report);
        let merged = &result["nested::map"];
        assert_eq!(merged.get("keep"), Some(&Value::Integer(1)));
        assert_eq!(merged.get("shared").unwrap().as_str().unwrap(), "new");
        assert_eq!(merged.get("added"), Some(&Value::Integer(2)));
        assert!(report.notes().iter().any(|n| n.contains("mappings merged")));
    }

    #[test]
    fn list_values_concat_and_dedup_preserving_order() {
        let corpus = corpus_from(&[r#"
version: 2.0.0
profiles:
  baseline:
    controls:
      ctrl-1: true
checks:
  chk-a:
    type: puppet-class-parameter
    settings:
      parameter: listy
      value: [a, b]
    controls:
      ctrl-1: true
  chk-b:
    type: puppet-class-parameter
    settings:
      parameter: listy
      value: [b, c]
    controls:
      ctrl-1: true
"#]);
        let mut report = Report::new();
        let result = compile(&corpus, "baseline", None, &mut report);
        assert_eq!(
            result["listy"].as_sequence().unwrap(),
            &[Value::from("a"), Value::from("b"), Value::from("c")]
        );
        assert!(report.notes().iter().any(|n| n.contains("lists merged")));
    }

    #[test]
    fn knockout_marker_is_inert_during_parameter_resolution() {
        // `--b` deletes elements only when documents merge; as a list
        // element reaching parameter resolution it is ordinary data.
        let corpus = corpus_from(&[r#"
version: 2.0.0
profiles:
  baseline:
    controls:
      ctrl-1: true
checks:
  chk-a:
    type: puppet-class-parameter
    settings:
      parameter: listy
      value: [a, b]
    controls:
      ctrl-1: true
  chk-b:
    type: puppet-class-parameter
    settings:
      parameter: listy
      value: ['--b', c]
    controls:
      ctrl-1: true
"#]);
        let mut report = Report::new();
        let result = compile(&corpus, "baseline", None, &mut report);
        assert_eq!(
            result["listy"].as_sequence().unwrap(),
            &[
                Value::from("a"),
                Value::from("b"),
                Value::from("--b"),
                Value::from("c"),
            ]
        );
    }

    #[test]
    fn equal_scalar_redefinition_is_a_note() {
        let corpus = corpus_from(&[r#"
version: 2.0.0
profiles:
  baseline:
    controls:
      ctrl-1: true
checks:
  chk-a:
    type: puppet-class-parameter
    settings:
      parameter: same
      value: true
    controls:
      ctrl-1: true
  chk-b:
    type: puppet-class-parameter
    settings:
      parameter: same
      value: true
    controls:
      ctrl-1: true
"#]);
        let mut report = Report::new();
        let result = compile(&corpus, "baseline", None, &mut report);
        assert_eq!(result["same"], Value::Boolean(true));
        assert!(report.warnings().is_empty());
        assert!(report
            .notes()
            .iter()
            .any(|n| n.contains("identical value")));
    }

    #[test]
    fn confined_check_is_excluded_under_mismatching_context() {
        let corpus = corpus_from(&[r#"
version: 2.0.0
profiles:
  baseline:
    controls:
      ctrl-1: true
checks:
  chk-1:
    type: puppet-class-parameter
    settings:
      parameter: foo::bar
      value: true
    controls:
      ctrl-1: true
    confine:
      os: [RedHat, CentOS]
"#]);
        let mut report = Report::new();
        let context = ctx(&[("os", "Debian")]);
        let result = compile(&corpus, "baseline", Some(&context), &mut report);
        assert!(result.is_empty());

        let mut report = Report::new();
        let context = ctx(&[("os", "CentOS")]);
        let result = compile(&corpus, "baseline", Some(&context), &mut report);
        assert_eq!(result["foo::bar"], Value::Boolean(true));
    }

    #[test]
    fn missing_context_setting_excludes_entry() {
        // The confine names a setting the context does not carry at all:
        // excluded, even though another key matches.
        let corpus = corpus_from(&[r#"
version: 2.0.0
profiles:
  baseline:
    controls:
      ctrl-1: true
checks:
  chk-1:
    type: puppet-class-parameter
    settings:
      parameter: foo::bar
      value: true
    controls:
      ctrl-1: true
    confine:
      os: [RedHat]
      kernel: [Linux]
"#]);
        let mut report = Report::new();
        let context = ctx(&[("os", "RedHat")]);
        let result = compile(&corpus, "baseline", Some(&context), &mut report);
        assert!(result.is_empty());
    }

    #[test]
    fn empty_confine_is_excluded_under_active_context() {
        // No confine key can intersect the context, so the entry is
        // excluded whenever a context is active; without one, nothing
        // is filtered at all.
        let corpus = corpus_from(&[r#"
version: 2.0.0
profiles:
  baseline:
    controls:
      ctrl-1: true
checks:
  chk-1:
    type: puppet-class-parameter
    settings:
      parameter: foo::bar
      value: true
    controls:
      ctrl-1: true
    confine: {}
"#]);
        let mut report = Report::new();
        let context = ctx(&[("os", "RedHat")]);
        let result = compile(&corpus, "baseline", Some(&context), &mut report);
        assert!(result.is_empty());

        let mut report = Report::new();
        let result = compile(&corpus, "baseline", None, &mut report);
        assert_eq!(result["foo::bar"], Value::Boolean(true));
    }

    #[test]
    fn or_semantics_across_confine_keys() {
        // Both settings are present in the context; only one intersects.
        // OR semantics keep the entry.
        let corpus = corpus_from(&[r#"
version: 2.0.0
profiles:
  baseline:
    controls:
      ctrl-1: true
checks:
  chk-1:
    type: puppet-class-parameter
    settings:
      parameter: foo::bar
      value: true
    controls:
      ctrl-1: true
    confine:
      os: [RedHat]
      kernel: [Linux]
"#]);
        let mut report = Report::new();
        let context = ctx(&[("os", "Debian"), ("kernel", "Linux")]);
        let result = compile(&corpus, "baseline", Some(&context), &mut report);
        assert_eq!(result["foo::bar"], Value::Boolean(true));
    }

    #[test]
    fn ce_links_transit_to_ce_controls() {
        let corpus = corpus_from(&[r#"
version: 2.0.0
profiles:
  baseline:
    controls:
      ctrl-via-ce: true
ce:
  ce-1:
    controls:
      ctrl-via-ce: true
checks:
  chk-1:
    type: puppet-class-parameter
    settings:
      parameter: via::ce
      value: 7
    ces: [ce-1]
"#]);
        let mut report = Report::new();
        let result = compile(&corpus, "baseline", None, &mut report);
        assert_eq!(result["via::ce"], Value::Integer(7));
    }

    #[test]
    fn cross_file_scalar_conflict_warns_and_later_wins() {
        let a = r#"
version: 2.0.0
profiles:
  baseline:
    checks:
      chk-1: true
checks:
  chk-1:
    type: puppet-class-parameter
    settings:
      parameter: p
      value: first
"#;
        let b = r#"
version: 2.0.0
checks:
  chk-1:
    type: puppet-class-parameter
    settings:
      parameter: p
      value: second
"#;
        let corpus = corpus_from(&[a, b]);
        let mut report = Report::new();
        let result = compile(&corpus, "baseline", None, &mut report);
        assert_eq!(result["p"].as_str().unwrap(), "second");
        assert!(report
            .warnings()
            .iter()
            .any(|w| w.contains("\"first\"") && w.contains("\"second\"")));
    }

    #[test]
    fn knockout_deletes_list_element_across_files() {
        let a = r#"
version: 2.0.0
profiles:
  baseline:
    checks:
      chk-1: true
checks:
  chk-1:
    type: puppet-class-parameter
    settings:
      parameter: packages
      value: [one, two]
"#;
        let b = r#"
version: 2.0.0
checks:
  chk-1:
    type: puppet-class-parameter
    settings:
      parameter: packages
      value: ['--two', three]
"#;
        let corpus = corpus_from(&[a, b]);
        let mut report = Report::new();
        let result = compile(&corpus, "baseline", None, &mut report);
        assert_eq!(
            result["packages"].as_sequence().unwrap(),
            &[Value::from("one"), Value::from("three")]
        );
    }
}
