use crate::equal::is_equal;
use crate::error::ExtractionError;
use crate::fiber::StateSlot;
use crate::record::{Change, ChangeDetail};
use crate::value::Value;

use super::names::fallback_name;

/// Changed state slots, paired by position among the stateful slots.
///
/// `names` labels the stateful slots in order; slots past its end use
/// `{index}`. A slot whose object is locked for mutation fails the whole
/// extraction rather than being reported as changed.
pub fn state_changes(
    names: &[String],
    previous: &[StateSlot],
    next: &[StateSlot],
) -> Result<Vec<Change>, ExtractionError> {
    let previous = previous.iter().filter(|slot| slot.stateful);
    let next = next.iter().filter(|slot| slot.stateful);

    let mut changes = Vec::new();
    for (index, (previous, next)) in previous.zip(next).enumerate() {
        ensure_readable(&previous.value)?;
        ensure_readable(&next.value)?;
        if is_equal(&previous.value, &next.value) {
            continue;
        }
        let name = names
            .get(index)
            .cloned()
            .unwrap_or_else(|| fallback_name(index));
        changes.push(Change::State(ChangeDetail {
            name,
            previous: previous.value.clone(),
            next: next.value.clone(),
            unstable: false,
        }));
    }
    Ok(changes)
}

fn ensure_readable(value: &Value) -> Result<(), ExtractionError> {
    match value {
        Value::Object(object) if object.read().is_none() => {
            Err(ExtractionError::ValueBusy { what: "state" })
        }
        _ => Ok(()),
    }
}
