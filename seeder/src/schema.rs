//! Field-name translation from the seed file's `snake_case` convention to the
//! `camelCase` names the application reads from the `residents` collection.
//!
//! Only the fields listed in the two tables are renamed; everything else keeps
//! its name and value.

use mongodb::bson::{Bson, Document};

/// Top-level resident fields.
pub const RESIDENT_FIELD_MAP: &[(&str, &str)] = &[
    ("lot_id", "lotId"),
    ("cave_id", "caveId"),
    ("statut_lot", "statutLot"),
    ("proprietaire_nom", "proprietaireNom"),
    ("proprietaire_mobile", "proprietaireMobile"),
    ("proprietaire_email", "proprietaireEmail"),
    ("happix_accounts", "happixAccounts"),
];

/// Fields of each Happix account nested under `happixAccounts`.
pub const HAPPIX_FIELD_MAP: &[(&str, &str)] = &[("nom_borne", "nomBorne")];

/// Storage name of the nested Happix account list.
pub const HAPPIX_ACCOUNTS: &str = "happixAccounts";

fn rename<'a>(table: &[(&str, &'a str)], key: &'a str) -> &'a str {
    table
        .iter()
        .find(|(from, _)| *from == key)
        .map_or(key, |(_, to)| *to)
}

/// Translate one resident document.
///
/// Keys go through [`RESIDENT_FIELD_MAP`]. When the value landing under
/// `happixAccounts` is an array, each document element goes through
/// [`HAPPIX_FIELD_MAP`]; any other shape is copied as is.
pub fn translate_resident(document: &Document) -> Document {
    let mut out = Document::new();
    for (key, value) in document {
        let key = rename(RESIDENT_FIELD_MAP, key);
        let value = match value {
            Bson::Array(items) if key == HAPPIX_ACCOUNTS => Bson::Array(
                items
                    .iter()
                    .map(|item| match item {
                        Bson::Document(account) => {
                            Bson::Document(translate_happix_account(account))
                        }
                        other => other.clone(),
                    })
                    .collect(),
            ),
            other => other.clone(),
        };
        out.insert(key, value);
    }
    out
}

/// Translate one Happix account document.
pub fn translate_happix_account(account: &Document) -> Document {
    account
        .iter()
        .map(|(key, value)| (rename(HAPPIX_FIELD_MAP, key).to_owned(), value.clone()))
        .collect()
}
