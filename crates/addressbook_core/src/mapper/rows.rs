//! Mapping between row-shaped native records and `Contact`.
//!
//! # Invariants
//! - Reads never fail: rows without a usable mimetype are skipped.
//! - Writes emit the name row first, then children in a fixed order:
//!   addresses, phones, emails, websites, organizations, notes,
//!   relationships.
//! - Every written child row is custom-typed so labels round-trip verbatim.

use crate::model::contact::{
    Address, Contact, Email, Note, Organization, Phone, Relationship, RelationshipType, Website,
};
use crate::native::row::{
    DataRow, RawContactRecord, MIMETYPE_EMAIL, MIMETYPE_NAME, MIMETYPE_NOTE,
    MIMETYPE_ORGANIZATION, MIMETYPE_PHONE, MIMETYPE_POSTAL, MIMETYPE_RELATION,
    MIMETYPE_WEBSITE,
};
use log::warn;

pub(crate) const NAME_DISPLAY: usize = 0;
pub(crate) const NAME_GIVEN: usize = 1;
pub(crate) const NAME_FAMILY: usize = 2;
pub(crate) const NAME_PREFIX: usize = 3;
pub(crate) const NAME_MIDDLE: usize = 4;
pub(crate) const NAME_SUFFIX: usize = 5;
pub(crate) const NAME_NICKNAME: usize = 6;

const POSTAL_STREET: usize = 0;
const POSTAL_CITY: usize = 1;
const POSTAL_REGION: usize = 2;
const POSTAL_POSTCODE: usize = 3;
const POSTAL_COUNTRY: usize = 4;

pub(crate) const PHONE_NUMBER: usize = 0;
pub(crate) const EMAIL_ADDRESS: usize = 0;
const WEBSITE_URL: usize = 0;
const ORGANIZATION_COMPANY: usize = 0;
const ORGANIZATION_TITLE: usize = 1;
const NOTE_TEXT: usize = 0;
const RELATION_NAME: usize = 0;

/// Maps one native record into a `Contact` carrying the record's id.
pub fn to_contact(record: &RawContactRecord) -> Contact {
    let mut contact = Contact {
        id: Some(record.key.to_contact_id()),
        ..Contact::default()
    };

    for row in &record.rows {
        let Some(mimetype) = row.mimetype() else {
            warn!(
                "event=contact_map module=mapper status=skip reason=missing_mimetype key={}",
                record.key
            );
            continue;
        };

        match mimetype {
            MIMETYPE_NAME => merge_name(&mut contact, row),
            MIMETYPE_POSTAL => contact.addresses.push(Address {
                label: row.label(),
                street_address: row.data(POSTAL_STREET).to_string(),
                city: row.data(POSTAL_CITY).to_string(),
                region: row.data(POSTAL_REGION).to_string(),
                postal_code: row.data(POSTAL_POSTCODE).to_string(),
                country: row.data(POSTAL_COUNTRY).to_string(),
            }),
            MIMETYPE_PHONE => contact.phones.push(Phone {
                label: row.label(),
                number: row.data(PHONE_NUMBER).to_string(),
            }),
            MIMETYPE_EMAIL => contact.emails.push(Email {
                label: row.label(),
                address: row.data(EMAIL_ADDRESS).to_string(),
            }),
            MIMETYPE_WEBSITE => contact.websites.push(Website {
                label: row.label(),
                address: row.data(WEBSITE_URL).to_string(),
            }),
            MIMETYPE_ORGANIZATION => contact.organizations.push(Organization {
                label: row.label(),
                name: row.data(ORGANIZATION_COMPANY).to_string(),
                title: row.data(ORGANIZATION_TITLE).to_string(),
            }),
            MIMETYPE_NOTE => contact.notes.push(Note {
                contents: row.data(NOTE_TEXT).to_string(),
            }),
            MIMETYPE_RELATION => contact.relationships.push(Relationship {
                name: row.data(RELATION_NAME).to_string(),
                kind: RelationshipType::from_label(&row.label()),
            }),
            other => warn!(
                "event=contact_map module=mapper status=skip reason=unknown_mimetype mimetype={} key={}",
                other, record.key
            ),
        }
    }

    contact
}

/// Maps a `Contact` into the data rows a store should write for it.
///
/// The id is not part of the output; callers attach rows to a raw contact
/// through batch operations.
pub fn from_contact(contact: &Contact) -> Vec<DataRow> {
    let mut rows = Vec::with_capacity(1 + contact.child_count());
    rows.push(name_row(contact));

    rows.extend(contact.addresses.iter().map(|address| {
        DataRow::new(MIMETYPE_POSTAL)
            .with_custom_label(&address.label)
            .with_data(POSTAL_STREET, &address.street_address)
            .with_data(POSTAL_CITY, &address.city)
            .with_data(POSTAL_REGION, &address.region)
            .with_data(POSTAL_POSTCODE, &address.postal_code)
            .with_data(POSTAL_COUNTRY, &address.country)
    }));
    rows.extend(contact.phones.iter().map(|phone| {
        DataRow::new(MIMETYPE_PHONE)
            .with_custom_label(&phone.label)
            .with_data(PHONE_NUMBER, &phone.number)
    }));
    rows.extend(contact.emails.iter().map(|email| {
        DataRow::new(MIMETYPE_EMAIL)
            .with_custom_label(&email.label)
            .with_data(EMAIL_ADDRESS, &email.address)
    }));
    rows.extend(contact.websites.iter().map(|website| {
        DataRow::new(MIMETYPE_WEBSITE)
            .with_custom_label(&website.label)
            .with_data(WEBSITE_URL, &website.address)
    }));
    rows.extend(contact.organizations.iter().map(|organization| {
        DataRow::new(MIMETYPE_ORGANIZATION)
            .with_custom_label(&organization.label)
            .with_data(ORGANIZATION_COMPANY, &organization.name)
            .with_data(ORGANIZATION_TITLE, &organization.title)
    }));
    rows.extend(
        contact
            .notes
            .iter()
            .map(|note| DataRow::new(MIMETYPE_NOTE).with_data(NOTE_TEXT, &note.contents)),
    );
    rows.extend(contact.relationships.iter().map(|relationship| {
        DataRow::new(MIMETYPE_RELATION)
            .with_custom_label(relationship.kind.as_label())
            .with_data(RELATION_NAME, &relationship.name)
    }));

    rows
}

fn name_row(contact: &Contact) -> DataRow {
    DataRow::new(MIMETYPE_NAME)
        .with_data(NAME_DISPLAY, &contact.display_name)
        .with_data(NAME_GIVEN, &contact.first_name)
        .with_data(NAME_FAMILY, &contact.last_name)
        .with_data(NAME_PREFIX, &contact.prefix)
        .with_data(NAME_MIDDLE, &contact.middle_name)
        .with_data(NAME_SUFFIX, &contact.suffix)
        .with_data(NAME_NICKNAME, &contact.nickname)
}

// Aggregates may carry one name row per member; the first non-empty value wins.
fn merge_name(contact: &mut Contact, row: &DataRow) {
    fill(&mut contact.display_name, row.data(NAME_DISPLAY));
    fill(&mut contact.first_name, row.data(NAME_GIVEN));
    fill(&mut contact.last_name, row.data(NAME_FAMILY));
    fill(&mut contact.prefix, row.data(NAME_PREFIX));
    fill(&mut contact.middle_name, row.data(NAME_MIDDLE));
    fill(&mut contact.suffix, row.data(NAME_SUFFIX));
    fill(&mut contact.nickname, row.data(NAME_NICKNAME));
}

fn fill(target: &mut String, value: &str) {
    if target.is_empty() && !value.is_empty() {
        value.clone_into(target);
    }
}
