use crate::graph::{CollectionFormat, Constraints};
use crate::wire::{ArrayFormat, FloatFormat, IntegerFormat, ObjectFormat, SchemaKind, StringFormat};

/// Merge constraint layers into the format record of `kind`.
///
/// Layers are applied in order and a value already present is never
/// overwritten, so callers pass the most specific layer (the call site) first.
/// A record that ends up empty is left unset.
pub fn harvest_format<'a>(
    kind: &mut SchemaKind,
    layers: impl IntoIterator<Item = &'a Constraints>,
    collection_format: Option<CollectionFormat>,
) {
    let layers: Vec<&Constraints> = layers.into_iter().collect();
    match kind {
        SchemaKind::String(schema) => {
            let mut format = schema.format.take().unwrap_or_default();
            for c in &layers {
                merge_string(&mut format, c);
            }
            schema.format = non_empty(format);
        }
        SchemaKind::Integer(schema) => {
            let mut format = schema.format.take().unwrap_or_default();
            for c in &layers {
                merge_integer(&mut format, c);
            }
            schema.format = non_empty(format);
        }
        SchemaKind::Float(schema) => {
            let mut format = schema.format.take().unwrap_or_default();
            for c in &layers {
                merge_float(&mut format, c);
            }
            schema.format = non_empty(format);
        }
        SchemaKind::Array(schema) => {
            let mut format = schema.format.take().unwrap_or_default();
            for c in &layers {
                merge_array(&mut format, c);
            }
            fill(&mut format.str_format, collection_format);
            schema.format = non_empty(format);
        }
        SchemaKind::Object(schema) => {
            let mut format = schema.format.take().unwrap_or_default();
            for c in &layers {
                merge_object(&mut format, c);
            }
            schema.format = non_empty(format);
        }
        SchemaKind::Boolean(_) | SchemaKind::Cls(_) => {}
    }
}

/// Object bounds collected from `layers`, for variants that carry no object schema of their own.
pub fn object_format<'a>(layers: impl IntoIterator<Item = &'a Constraints>) -> Option<ObjectFormat> {
    let mut format = ObjectFormat::default();
    for c in layers {
        merge_object(&mut format, c);
    }
    non_empty(format)
}

fn merge_object(format: &mut ObjectFormat, c: &Constraints) {
    fill(&mut format.max_properties, c.max_properties);
    fill(&mut format.min_properties, c.min_properties);
}

fn merge_string(format: &mut StringFormat, c: &Constraints) {
    fill(&mut format.pattern, c.pattern.clone());
    fill(&mut format.max_length, c.max_length);
    fill(&mut format.min_length, c.min_length);
}

/// Exclusive bounds become the nearest inclusive integer, clamped to the `i64` range.
fn merge_integer(format: &mut IntegerFormat, c: &Constraints) {
    let maximum = c
        .max_value
        .map(|v| v.floor() as i64)
        .or_else(|| c.max_value_exclusive.map(|v| (v.ceil() as i64).saturating_sub(1)));
    let minimum = c
        .min_value
        .map(|v| v.ceil() as i64)
        .or_else(|| c.min_value_exclusive.map(|v| (v.floor() as i64).saturating_add(1)));
    fill(&mut format.maximum, maximum);
    fill(&mut format.minimum, minimum);
    fill(&mut format.multiple_of, c.multiple_of.map(|v| v as i64));
}

fn merge_float(format: &mut FloatFormat, c: &Constraints) {
    if format.maximum.is_none() {
        if let Some(max) = c.max_value {
            format.maximum = Some(max);
        } else if let Some(max) = c.max_value_exclusive {
            format.maximum = Some(max);
            format.exclusive_maximum = true;
        }
    }
    if format.minimum.is_none() {
        if let Some(min) = c.min_value {
            format.minimum = Some(min);
        } else if let Some(min) = c.min_value_exclusive {
            format.minimum = Some(min);
            format.exclusive_minimum = true;
        }
    }
    fill(&mut format.multiple_of, c.multiple_of);
}

fn merge_array(format: &mut ArrayFormat, c: &Constraints) {
    fill(&mut format.max_length, c.max_items);
    fill(&mut format.min_length, c.min_items);
    if !format.unique && c.unique_items == Some(true) {
        format.unique = true;
    }
}

fn fill<T>(slot: &mut Option<T>, value: Option<T>) {
    if slot.is_none() {
        *slot = value;
    }
}

fn non_empty<T: Default + PartialEq>(format: T) -> Option<T> {
    if format == T::default() { None } else { Some(format) }
}
