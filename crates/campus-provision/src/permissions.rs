//! Permission synthesis
//!
//! Turns declarative role/action rules into platform grants. Total:
//! invalid input degrades to fewer grants with a logged diagnostic,
//! never to an error.

use campus_platform::{Action, Grant, Role};
use campus_schema::PermissionRule;

/// Role granted full access when a collection omits its permission
/// rules entirely.
const FALLBACK_ADMIN_ROLE: &str = "admin";

/// Synthesize platform grants from declarative rules.
///
/// - `None` (the source omitted the field) grants full CRUD to the
///   `admin` role.
/// - `Some(&[])` grants nothing: the resource is reachable with server
///   credentials only.
/// - Otherwise each rule contributes one grant per recognized action;
///   a label of `"any"` (case-insensitive) maps to the public role.
///   Unrecognized actions and structurally incomplete rules are
///   skipped, not fatal. `context` only labels the diagnostics.
pub fn synthesize(rules: Option<&[PermissionRule]>, context: &str) -> Vec<Grant> {
    let rules = match rules {
        None => {
            return Grant::full_crud(&Role::label(FALLBACK_ADMIN_ROLE));
        }
        Some(rules) => rules,
    };

    let mut grants = Vec::new();
    for rule in rules {
        let (label, actions) = match (&rule.label, &rule.actions) {
            (Some(label), Some(actions)) => (label, actions),
            _ => {
                tracing::warn!(context, "skipping permission rule without label or actions");
                continue;
            }
        };
        let role = if label.eq_ignore_ascii_case("any") {
            Role::Any
        } else {
            Role::label(label.clone())
        };
        for action in actions {
            match Action::parse(action) {
                Some(action) => grants.push(Grant::new(role.clone(), action)),
                None => {
                    tracing::warn!(context, action = %action, "skipping unrecognized action");
                }
            }
        }
    }
    grants
}
