//! Estimates the serialized byte cost of a co-migration group of live
//! values. Accuracy doesn't matter — the number only feeds the optimizer's
//! cost comparison — but the estimate must be monotone (adding a value never
//! decreases it) and stable (same inputs, same process, same output).

use crate::value::Value;

/// Per the design doc's accuracy note, this walks the same shape the IdGraph
/// builder does but doesn't need cycle detection: an over-estimate for a
/// value reachable through multiple paths is still monotone, just looser.
pub fn estimate(values: &[Value]) -> u64 {
    values.iter().map(estimate_one).sum()
}

fn estimate_one(value: &Value) -> u64 {
    const OVERHEAD: u64 = 8; // tag + length framing, the same for every node kind
    match value {
        Value::Null | Value::Sentinel(_) => OVERHEAD,
        Value::Bool(_) => OVERHEAD + 1,
        Value::Int(_) => OVERHEAD + 8,
        Value::Float(_) => OVERHEAD + 8,
        Value::Str(s) => OVERHEAD + s.len() as u64,
        Value::Bytes(b) => OVERHEAD + b.len() as u64,
        Value::Tuple(items) => OVERHEAD + items.iter().map(estimate_one).sum::<u64>(),
        Value::List(items) => {
            OVERHEAD + items.borrow().iter().map(estimate_one).sum::<u64>()
        }
        Value::Set(items) => {
            OVERHEAD + items.borrow().iter().map(estimate_one).sum::<u64>()
        }
        Value::Map(pairs) => {
            OVERHEAD
                + pairs
                    .borrow()
                    .iter()
                    .map(|(k, v)| estimate_one(k) + estimate_one(v))
                    .sum::<u64>()
        }
        Value::TypeObject(t) => OVERHEAD + t.qualified_name.len() as u64,
        Value::Callable(info) => OVERHEAD + info.qualified_name.len() as u64,
        Value::Custom(obj) => {
            let obj = obj.borrow();
            OVERHEAD
                + obj.constructor.len() as u64
                + obj.args.iter().map(estimate_one).sum::<u64>()
                + obj
                    .state
                    .iter()
                    .map(|(k, v)| k.len() as u64 + estimate_one(v))
                    .sum::<u64>()
        }
        Value::Opaque(obj) => OVERHEAD + obj.type_name.len() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monotone_under_append() {
        let small = vec![Value::Int(1), Value::Int(2)];
        let large = vec![Value::Int(1), Value::Int(2), Value::Int(3)];
        assert!(estimate(&large) > estimate(&small));
    }

    #[test]
    fn stable_across_calls() {
        let values = vec![Value::str("hello"), Value::Int(42)];
        assert_eq!(estimate(&values), estimate(&values));
    }
}
