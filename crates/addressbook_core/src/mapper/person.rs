//! Mapping between keyed-person native records and `Contact`.
//!
//! # Invariants
//! - Wrapped predefined labels (`_$!<Home>!$_`) are unwrapped on read.
//! - Absent labels read as `Other`; absent strings read as empty.
//!
//! # Lossy fields
//! - Only the first organization is written; its title becomes `job_title`.
//! - Notes are joined into one note separated by a blank line and read back
//!   as a single note.
//! - `display_name` is not stored; reads derive it from the name parts.

use crate::model::contact::{
    Address, Contact, Email, Note, Organization, Phone, Relationship, RelationshipType, Website,
};
use crate::native::person::{
    AddressDictionary, LabeledValue, PersonRecord, ADDRESS_KEY_CITY, ADDRESS_KEY_COUNTRY,
    ADDRESS_KEY_STATE, ADDRESS_KEY_STREET, ADDRESS_KEY_ZIP,
};
use crate::native::row::FALLBACK_LABEL;
use once_cell::sync::Lazy;
use regex::Regex;

static WRAPPED_LABEL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^_\$!<(.*)>!\$_$").expect("valid wrapped label regex"));

/// Separator used when several notes share the single native note field.
pub const NOTE_SEPARATOR: &str = "\n\n";

/// Label given to the organization read from the single native property.
const ORGANIZATION_LABEL: &str = "Work";

/// Maps one person record into a `Contact`.
pub fn to_contact(person: &PersonRecord) -> Contact {
    let mut contact = Contact {
        id: person.record_id.map(|id| id.to_string()),
        first_name: text(&person.first_name),
        middle_name: text(&person.middle_name),
        last_name: text(&person.last_name),
        nickname: text(&person.nickname),
        prefix: text(&person.prefix),
        suffix: text(&person.suffix),
        ..Contact::default()
    };
    contact.display_name = composite_name(&contact);

    contact.addresses = person
        .addresses
        .iter()
        .map(|entry| Address {
            label: unwrap_label(entry.label.as_deref()),
            street_address: dictionary_value(&entry.value, ADDRESS_KEY_STREET),
            city: dictionary_value(&entry.value, ADDRESS_KEY_CITY),
            region: dictionary_value(&entry.value, ADDRESS_KEY_STATE),
            postal_code: dictionary_value(&entry.value, ADDRESS_KEY_ZIP),
            country: dictionary_value(&entry.value, ADDRESS_KEY_COUNTRY),
        })
        .collect();
    contact.phones = person
        .phones
        .iter()
        .map(|entry| Phone {
            label: unwrap_label(entry.label.as_deref()),
            number: entry.value.clone(),
        })
        .collect();
    contact.emails = person
        .emails
        .iter()
        .map(|entry| Email {
            label: unwrap_label(entry.label.as_deref()),
            address: entry.value.clone(),
        })
        .collect();
    contact.websites = person
        .urls
        .iter()
        .map(|entry| Website {
            label: unwrap_label(entry.label.as_deref()),
            address: entry.value.clone(),
        })
        .collect();
    contact.relationships = person
        .related_names
        .iter()
        .map(|entry| Relationship {
            name: entry.value.clone(),
            kind: RelationshipType::from_label(&unwrap_label(entry.label.as_deref())),
        })
        .collect();

    let organization = text(&person.organization);
    let job_title = text(&person.job_title);
    if !organization.is_empty() || !job_title.is_empty() {
        contact.organizations.push(Organization {
            label: ORGANIZATION_LABEL.to_string(),
            name: organization,
            title: job_title,
        });
    }

    let note = text(&person.note);
    if !note.is_empty() {
        contact.notes.push(Note { contents: note });
    }

    contact
}

/// Maps a `Contact` into a person record ready to be added to a book.
pub fn from_contact(contact: &Contact) -> PersonRecord {
    let first_organization = contact.organizations.first();
    let notes = contact
        .notes
        .iter()
        .map(|note| note.contents.as_str())
        .filter(|contents| !contents.is_empty())
        .collect::<Vec<_>>()
        .join(NOTE_SEPARATOR);

    PersonRecord {
        record_id: contact.id.as_deref().and_then(|id| id.trim().parse().ok()),
        first_name: optional(&contact.first_name),
        middle_name: optional(&contact.middle_name),
        last_name: optional(&contact.last_name),
        nickname: optional(&contact.nickname),
        prefix: optional(&contact.prefix),
        suffix: optional(&contact.suffix),
        organization: first_organization.and_then(|organization| optional(&organization.name)),
        job_title: first_organization.and_then(|organization| optional(&organization.title)),
        note: optional(&notes),
        addresses: contact
            .addresses
            .iter()
            .map(|address| LabeledValue::new(Some(&address.label), address_dictionary(address)))
            .collect(),
        phones: contact
            .phones
            .iter()
            .map(|phone| LabeledValue::new(Some(&phone.label), phone.number.clone()))
            .collect(),
        emails: contact
            .emails
            .iter()
            .map(|email| LabeledValue::new(Some(&email.label), email.address.clone()))
            .collect(),
        urls: contact
            .websites
            .iter()
            .map(|website| LabeledValue::new(Some(&website.label), website.address.clone()))
            .collect(),
        related_names: contact
            .relationships
            .iter()
            .map(|relationship| {
                LabeledValue::new(Some(relationship.kind.as_label()), relationship.name.clone())
            })
            .collect(),
    }
}

/// Unwraps a native label into plain text.
pub fn unwrap_label(label: Option<&str>) -> String {
    let Some(label) = label.map(str::trim).filter(|label| !label.is_empty()) else {
        return FALLBACK_LABEL.to_string();
    };

    match WRAPPED_LABEL_RE
        .captures(label)
        .and_then(|captures| captures.get(1))
    {
        Some(inner) if !inner.as_str().is_empty() => inner.as_str().to_string(),
        Some(_) => FALLBACK_LABEL.to_string(),
        None => label.to_string(),
    }
}

fn address_dictionary(address: &Address) -> AddressDictionary {
    [
        (ADDRESS_KEY_STREET, &address.street_address),
        (ADDRESS_KEY_CITY, &address.city),
        (ADDRESS_KEY_STATE, &address.region),
        (ADDRESS_KEY_ZIP, &address.postal_code),
        (ADDRESS_KEY_COUNTRY, &address.country),
    ]
    .into_iter()
    .map(|(key, value)| (key.to_string(), value.clone()))
    .collect()
}

fn dictionary_value(dictionary: &AddressDictionary, key: &str) -> String {
    dictionary.get(key).cloned().unwrap_or_default()
}

fn composite_name(contact: &Contact) -> String {
    [
        contact.prefix.as_str(),
        contact.first_name.as_str(),
        contact.middle_name.as_str(),
        contact.last_name.as_str(),
        contact.suffix.as_str(),
    ]
    .into_iter()
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(" ")
}

fn text(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn optional(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::unwrap_label;

    #[test]
    fn unwrap_label_strips_predefined_wrapper() {
        assert_eq!(unwrap_label(Some("_$!<Mobile>!$_")), "Mobile");
        assert_eq!(unwrap_label(Some("Boat")), "Boat");
    }

    #[test]
    fn unwrap_label_never_returns_sentinels() {
        assert_eq!(unwrap_label(None), "Other");
        assert_eq!(unwrap_label(Some("   ")), "Other");
        assert_eq!(unwrap_label(Some("_$!<>!$_")), "Other");
    }
}
