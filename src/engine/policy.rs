use serde_json::Value;

use crate::error::{AuditError, Result};

/// Actions granted by the `Allow` statements of an IAM policy document.
///
/// `Statement` may be a single object or a list, `Action` a string or a list.
/// `Deny` statements and `NotAction` blocks contribute nothing.
pub fn allowed_actions(document: &str) -> Result<Vec<String>> {
    let policy: Value = serde_json::from_str(document)
        .map_err(|e| AuditError::Policy(format!("not valid JSON: {e}")))?;

    let Value::Object(policy) = policy else {
        return Err(AuditError::Policy(
            "policy document must be a JSON object".to_string(),
        ));
    };

    let statements = match policy.get("Statement") {
        None | Some(Value::Null) => return Ok(Vec::new()),
        Some(Value::Array(list)) => list.iter().collect::<Vec<_>>(),
        Some(single) => vec![single],
    };

    let mut actions = Vec::new();
    for statement in statements {
        let Value::Object(statement) = statement else {
            continue;
        };
        let allows = statement
            .get("Effect")
            .and_then(Value::as_str)
            .is_some_and(|effect| effect.eq_ignore_ascii_case("allow"));
        if !allows {
            continue;
        }
        match statement.get("Action") {
            Some(Value::String(action)) => actions.push(action.clone()),
            Some(Value::Array(list)) => actions.extend(
                list.iter()
                    .filter_map(Value::as_str)
                    .map(ToString::to_string),
            ),
            _ => {}
        }
    }

    Ok(actions)
}
