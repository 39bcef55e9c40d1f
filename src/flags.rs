//! Bit-flag bookkeeping for quality masks.
//!
//! Level-1 quality information is carried as a u16 flags variable whose bits
//! are registered by name in the variable attributes (`flag_meanings` and
//! `flag_masks`, CF style). Raising a flag ORs its value in under a boolean
//! mask and records the name, refusing collisions with already-registered
//! bits.

use ndarray::ArrayD;

use crate::dtype::Attrs;
use crate::dataset::AttributeValue;
use crate::error::{CoriolisError, Result};

const FLAG_MEANINGS: &str = "flag_meanings";
const FLAG_MASKS: &str = "flag_masks";

/// Raise `value` in `flags` wherever `condition` holds, registering
/// `name` in the attribute table.
pub fn raise_flag(
    flags: &mut ArrayD<u16>,
    attrs: &mut Attrs,
    name: &str,
    value: u16,
    condition: &ArrayD<bool>,
) -> Result<()> {
    if value == 0 || !value.is_power_of_two() {
        return Err(CoriolisError::InvalidParameter {
            param: "value".to_string(),
            message: format!("flag value must be a single bit, got {}", value),
        });
    }
    if flags.shape() != condition.shape() {
        return Err(CoriolisError::Dimension {
            message: format!(
                "flags have shape {:?} but the condition has shape {:?}",
                flags.shape(),
                condition.shape()
            ),
        });
    }

    let meanings = match attrs.get(FLAG_MEANINGS) {
        Some(AttributeValue::Text(s)) => s.clone(),
        _ => String::new(),
    };
    let mut masks = match attrs.get(FLAG_MASKS) {
        Some(AttributeValue::NumberArray(v)) => v.clone(),
        _ => Vec::new(),
    };
    if meanings.split_whitespace().any(|m| m == name) {
        return Err(CoriolisError::InvalidParameter {
            param: "name".to_string(),
            message: format!("flag {} is already registered", name),
        });
    }
    if masks.contains(&(value as f64)) {
        return Err(CoriolisError::InvalidParameter {
            param: "value".to_string(),
            message: format!("flag value {} is already in use", value),
        });
    }

    ndarray::Zip::from(&mut *flags)
        .and(condition)
        .for_each(|f, &c| {
            if c {
                *f |= value;
            }
        });

    let meanings = if meanings.is_empty() {
        name.to_string()
    } else {
        format!("{} {}", meanings, name)
    };
    masks.push(value as f64);
    attrs.insert(FLAG_MEANINGS.to_string(), AttributeValue::Text(meanings));
    attrs.insert(FLAG_MASKS.to_string(), AttributeValue::NumberArray(masks));
    Ok(())
}

/// Look up the registered bit value of a named flag.
pub fn flag_mask(attrs: &Attrs, name: &str) -> Option<u16> {
    let meanings = match attrs.get(FLAG_MEANINGS) {
        Some(AttributeValue::Text(s)) => s,
        _ => return None,
    };
    let masks = match attrs.get(FLAG_MASKS) {
        Some(AttributeValue::NumberArray(v)) => v,
        _ => return None,
    };
    meanings
        .split_whitespace()
        .position(|m| m == name)
        .and_then(|i| masks.get(i))
        .map(|&v| v as u16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::IxDyn;

    #[test]
    fn test_raise_and_lookup() {
        let mut flags = ArrayD::<u16>::zeros(IxDyn(&[3, 3]));
        let mut attrs = Attrs::new();
        let condition = ArrayD::from_shape_fn(IxDyn(&[3, 3]), |idx| idx[0] == idx[1]);

        raise_flag(&mut flags, &mut attrs, "LAND", 1, &condition).unwrap();
        raise_flag(&mut flags, &mut attrs, "CLOUD", 4, &condition.mapv(|c| !c)).unwrap();

        assert_eq!(flags[[0, 0]], 1);
        assert_eq!(flags[[0, 1]], 4);
        assert_eq!(flag_mask(&attrs, "LAND"), Some(1));
        assert_eq!(flag_mask(&attrs, "CLOUD"), Some(4));
        assert_eq!(flag_mask(&attrs, "ICE"), None);
    }

    #[test]
    fn test_collisions_rejected() {
        let mut flags = ArrayD::<u16>::zeros(IxDyn(&[2]));
        let mut attrs = Attrs::new();
        let cond = ArrayD::from_elem(IxDyn(&[2]), true);

        raise_flag(&mut flags, &mut attrs, "LAND", 1, &cond).unwrap();
        // same name
        assert!(raise_flag(&mut flags, &mut attrs, "LAND", 2, &cond).is_err());
        // same bit
        assert!(raise_flag(&mut flags, &mut attrs, "ICE", 1, &cond).is_err());
        // multi-bit values are not a single flag
        assert!(raise_flag(&mut flags, &mut attrs, "ICE", 3, &cond).is_err());
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let mut flags = ArrayD::<u16>::zeros(IxDyn(&[2, 2]));
        let mut attrs = Attrs::new();
        let cond = ArrayD::from_elem(IxDyn(&[3]), true);
        assert!(raise_flag(&mut flags, &mut attrs, "LAND", 1, &cond).is_err());
    }
}
