//! Variable substitution over nested declaration trees.
//!
//! Declarations are parameterized with `${name}` references. Evaluation
//! walks a [`serde_yaml::Value`] tree in place and substitutes every
//! reference whose name is bound in the supplied variable set.
//!
//! An unresolved reference is left verbatim in the string: the declaration
//! may legitimately contain literal `${...}` text destined for a later
//! consumer (a shell, a template engine inside the container), so absence
//! from the binding set is not an error here.

use std::collections::BTreeMap;

use serde_yaml::Value;

/// A set of variable bindings supplied at evaluation time.
///
/// Bindings are not owned by any declaration; callers pass a fresh set on
/// every evaluation and the set is never mutated.
pub type Variables = BTreeMap<String, String>;

/// Pure substitution engine for declaration trees.
///
/// Stateless: every call operates only on the tree it is handed, so the
/// same origin snapshot can be evaluated any number of times with
/// different binding sets without residual state.
#[derive(Debug)]
pub struct VariableEvaluator;

impl VariableEvaluator {
    /// Substitutes `${name}` references throughout `tree` in place.
    ///
    /// Recurses uniformly into mappings, sequences, and tagged values.
    /// Only string scalars are rewritten; mapping keys and non-string
    /// scalars pass through unchanged. References with no binding stay
    /// verbatim.
    pub fn evaluate_value(tree: &mut Value, variables: &Variables) {
        match tree {
            Value::String(s) => {
                if s.contains("${") {
                    *s = Self::substitute(s, variables);
                }
            }
            Value::Sequence(items) => {
                for item in items {
                    Self::evaluate_value(item, variables);
                }
            }
            Value::Mapping(map) => {
                for (_, v) in map.iter_mut() {
                    Self::evaluate_value(v, variables);
                }
            }
            Value::Tagged(tagged) => Self::evaluate_value(&mut tagged.value, variables),
            Value::Null | Value::Bool(_) | Value::Number(_) => {}
        }
    }

    /// Replaces every bound `${name}` occurrence in `input`.
    fn substitute(input: &str, variables: &Variables) -> String {
        let mut out = String::with_capacity(input.len());
        let mut rest = input;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find('}') {
                Some(end) => {
                    let name = &after[..end];
                    match variables.get(name) {
                        Some(value) => out.push_str(value),
                        // Unbound reference stays literal.
                        None => {
                            out.push_str("${");
                            out.push_str(name);
                            out.push('}');
                        }
                    }
                    rest = &after[end + 1..];
                }
                // Unterminated reference, keep the tail as-is.
                None => {
                    out.push_str(&rest[start..]);
                    return out;
                }
            }
        }
        out.push_str(rest);
        out
    }
}
