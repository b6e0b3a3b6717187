//! Attribute maps for discovered rows, and attribute-level diffs.

use crate::errors::SyncResult;
use crate::findings::SyncFinding;
use crate::models::{attributes, Attributes, DiscoveredRow};
use crate::reconcile::list_types::{ListTypeResolver, ListTypeSource};
use crate::reconcile::session::{ReconciliationSession, RunContext};

/// New values that differ from, or are absent in, `old`.
pub fn diff_attributes(old: &Attributes, new: &Attributes) -> Attributes {
    new.iter()
        .filter(|(key, value)| old.get(*key) != Some(*value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

/// The persisted value of every key in `changes` that `old` has.
pub fn previous_values(old: &Attributes, changes: &Attributes) -> Attributes {
    changes
        .keys()
        .filter_map(|key| old.get(key).map(|value| (key.clone(), value.clone())))
        .collect()
}

/// Build the attribute map of a mapped row against its class schema.
///
/// `name` is always kept. Other values are kept only when the class declares
/// the attribute; otherwise one ERROR finding per (class, attribute) is
/// recorded and the value dropped. `vendor` and `model` resolve to catalog
/// ids in the catalog class named by the attribute type.
pub fn build_attributes(
    ctx: &RunContext<'_>,
    session: &mut ReconciliationSession,
    row: &DiscoveredRow,
    class_name: &str,
    display_name: &str,
) -> SyncResult<Attributes> {
    let mut attrs = Attributes::new();
    attrs.insert(attributes::NAME.to_string(), display_name.to_string());

    let Some(definition) = session.class_definition(ctx.metadata, class_name)? else {
        if session.first_report_of(class_name, "") {
            session.push(SyncFinding::unknown_class(class_name, &row.instance_id));
        }
        return Ok(attrs);
    };

    let mut put_plain = |session: &mut ReconciliationSession, attribute: &str, value: &str| {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        if definition.attribute(attribute).is_some() {
            attrs.insert(attribute.to_string(), value.to_string());
        } else if session.first_report_of(class_name, attribute) {
            session.push(SyncFinding::missing_attribute(class_name, attribute, "String"));
        }
    };
    put_plain(session, attributes::DESCRIPTION, &row.description);
    put_plain(session, attributes::SERIAL_NUMBER, &row.serial_number);

    let resolver = ListTypeResolver::new(ctx.catalog);
    for (attribute, source) in [
        (attributes::VENDOR, ListTypeSource::Vendor),
        (attributes::MODEL, ListTypeSource::Model),
    ] {
        if source.value(row).trim().is_empty() {
            continue;
        }
        match definition.attribute(attribute) {
            Some(def) => {
                if let Some(id) = resolver.resolve(row, source, &def.attribute_type, session)? {
                    attrs.insert(attribute.to_string(), id);
                }
            }
            None => {
                if session.first_report_of(class_name, attribute) {
                    session.push(SyncFinding::missing_attribute(class_name, attribute, "ListType"));
                }
            }
        }
    }

    // Keep the conventional order: name, description, vendor, serialNumber, model.
    let order = [
        attributes::NAME,
        attributes::DESCRIPTION,
        attributes::VENDOR,
        attributes::SERIAL_NUMBER,
        attributes::MODEL,
    ];
    attrs.sort_by(|a, _, b, _| {
        let pos = |key: &str| order.iter().position(|k| *k == key).unwrap_or(order.len());
        pos(a.as_str()).cmp(&pos(b.as_str()))
    });
    Ok(attrs)
}
