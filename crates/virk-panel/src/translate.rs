//! Danish to English column names and coded values.

use crate::error::Result;
use polars::prelude::*;
use tracing::warn;

/// Column name translations (Danish -> English).
pub const COLUMN_TRANSLATIONS: &[(&str, &str)] = &[
    // Identifiers
    ("cvrNummer", "cvr_number"),
    ("enhedsNummer", "unit_number"),
    ("enhedstype", "unit_type"),
    // Temporal validity
    ("gyldigFra", "valid_from"),
    ("gyldigTil", "valid_to"),
    ("sidstOpdateret", "last_updated"),
    ("sidstIndlaest", "last_loaded"),
    ("stiftelsesDato", "founding_date"),
    ("virkningsDato", "effective_date"),
    ("naermesteFremtidigeDato", "nearest_future_date"),
    // Address
    ("vejnavn", "street_name"),
    ("vejkode", "road_code"),
    ("husnummerFra", "house_number_from"),
    ("husnummerTil", "house_number_to"),
    ("bogstavFra", "letter_from"),
    ("bogstavTil", "letter_to"),
    ("etage", "floor"),
    ("sidedoer", "side_door"),
    ("conavn", "care_of_name"),
    ("postboks", "po_box"),
    ("postnummer", "postal_code"),
    ("postdistrikt", "postal_district"),
    ("bynavn", "city_name"),
    ("landekode", "country_code"),
    ("kommuneKode", "municipality_code"),
    ("kommuneNavn", "municipality_name"),
    ("adresseId", "address_id"),
    ("sidstValideret", "last_validated"),
    ("fritekst", "free_text"),
    // Industry
    ("branchekode", "industry_code"),
    ("branchetekst", "industry_text"),
    // Attributes
    ("vapitype", "value_type"),
    ("vaerdi", "value"),
    ("sekvensnr", "sequence_number"),
    // Employment
    ("aar", "year"),
    ("kvartal", "quarter"),
    ("maaned", "month"),
    ("antalInklusivEjere", "count_including_owners"),
    ("antalAarsvaerk", "full_time_equivalents"),
    ("antalAnsatte", "employee_count"),
    ("intervalKodeAntalInklusivEjere", "interval_code_including_owners"),
    ("intervalKodeAntalAarsvaerk", "interval_code_fte"),
    ("intervalKodeAntalAnsatte", "interval_code_employees"),
    // Legal form
    ("virksomhedsformkode", "legal_form_code"),
    ("kortBeskrivelse", "short_description"),
    ("langBeskrivelse", "long_description"),
    ("ansvarligDataleverandoer", "responsible_data_provider"),
    // Contact, name, status
    ("kontaktoplysning", "contact_info"),
    ("navn", "name"),
    ("statuskode", "status_code"),
    ("statustekst", "status_text"),
    ("sammensatStatus", "composite_status"),
    ("kreditoplysningkode", "credit_info_code"),
    ("kreditoplysningtekst", "credit_info_text"),
    // Participant relations
    ("deltagerEnhedsNummer", "participant_unit_number"),
    ("deltagerEnhedstype", "participant_unit_type"),
    ("deltagerForretningsnoegle", "participant_business_key"),
    ("organisationHovedtype", "organization_main_type"),
    ("organisationNavn", "organization_name"),
    ("attributType", "attribute_type"),
    ("attributVapitype", "attribute_value_type"),
    ("attributSekvensnr", "attribute_sequence_number"),
    ("attributVaerdi", "attribute_value"),
    // Registration
    ("regnummer", "registration_number"),
    // Search index fields
    ("_score", "search_score"),
    ("_id", "search_id"),
    ("_type", "search_type"),
    ("_index", "search_index"),
    // Main table base columns
    ("Vrvirksomhed_cvrNummer", "cvr_number"),
    ("Vrvirksomhed_enhedsNummer", "unit_number"),
    ("Vrvirksomhed_enhedstype", "unit_type"),
    ("Vrvirksomhed_brancheAnsvarskode", "industry_responsibility_code"),
    ("Vrvirksomhed_reklamebeskyttet", "advertising_protected"),
    ("Vrvirksomhed_samtId", "internal_id"),
    ("Vrvirksomhed_fejlRegistreret", "error_registered"),
    ("Vrvirksomhed_dataAdgang", "data_access"),
    ("Vrvirksomhed_sidstIndlaest", "last_loaded"),
    ("Vrvirksomhed_sidstOpdateret", "last_updated"),
    ("Vrvirksomhed_fejlVedIndlaesning", "error_on_loading"),
    ("Vrvirksomhed_naermesteFremtidigeDato", "nearest_future_date"),
    ("Vrvirksomhed_fejlBeskrivelse", "error_description"),
    ("Vrvirksomhed_virkningsAktoer", "change_actor"),
    ("Vrvirksomhed_fortroligBeriget", "confidential_enriched"),
    ("Vrvirksomhed_virksomhedMetadata_sammensatStatus", "company_status"),
    ("Vrvirksomhed_virksomhedMetadata_stiftelsesDato", "founding_date"),
    ("Vrvirksomhed_virksomhedMetadata_virkningsDato", "effective_date"),
    ("Vrvirksomhed_virksomhedMetadata_antalPenheder", "number_of_p_units"),
    ("Vrvirksomhed_virksomhedMetadata_nyesteNavn_navn", "latest_name"),
    ("Vrvirksomhed_virksomhedMetadata_nyesteNavn_periode_gyldigFra", "latest_name_valid_from"),
    ("Vrvirksomhed_virksomhedMetadata_nyesteNavn_periode_gyldigTil", "latest_name_valid_to"),
    ("Vrvirksomhed_virksomhedMetadata_nyesteVirksomhedsform_virksomhedsformkode", "latest_legal_form_code"),
    ("Vrvirksomhed_virksomhedMetadata_nyesteVirksomhedsform_kortBeskrivelse", "latest_legal_form_short"),
    ("Vrvirksomhed_virksomhedMetadata_nyesteVirksomhedsform_langBeskrivelse", "latest_legal_form_long"),
    ("Vrvirksomhed_virksomhedMetadata_nyesteBeliggenhedsadresse_vejnavn", "latest_address_street_name"),
    ("Vrvirksomhed_virksomhedMetadata_nyesteBeliggenhedsadresse_husnummerFra", "latest_address_house_number_from"),
    ("Vrvirksomhed_virksomhedMetadata_nyesteBeliggenhedsadresse_postnummer", "latest_address_postal_code"),
    ("Vrvirksomhed_virksomhedMetadata_nyesteBeliggenhedsadresse_postdistrikt", "latest_address_postal_district"),
    ("Vrvirksomhed_virksomhedMetadata_nyesteBeliggenhedsadresse_kommune_kommuneKode", "latest_address_municipality_code"),
    ("Vrvirksomhed_virksomhedMetadata_nyesteBeliggenhedsadresse_kommune_kommuneNavn", "latest_address_municipality_name"),
    ("Vrvirksomhed_virksomhedMetadata_nyesteHovedbranche_branchekode", "latest_main_industry_code"),
    ("Vrvirksomhed_virksomhedMetadata_nyesteHovedbranche_branchetekst", "latest_main_industry_text"),
    ("Vrvirksomhed_virksomhedMetadata_nyesteStatus_statuskode", "latest_status_code"),
    ("Vrvirksomhed_virksomhedMetadata_nyesteStatus_statustekst", "latest_status_text"),
    ("Vrvirksomhed_virksomhedMetadata_nyesteAarsbeskaeftigelse_aar", "latest_annual_employment_year"),
    ("Vrvirksomhed_virksomhedMetadata_nyesteAarsbeskaeftigelse_antalAnsatte", "latest_annual_employee_count"),
    ("Vrvirksomhed_virksomhedMetadata_nyesteAarsbeskaeftigelse_antalAarsvaerk", "latest_annual_full_time_equivalents"),
];

/// Coded value translations (Danish -> English).
pub const VALUE_TRANSLATIONS: &[(&str, &str)] = &[
    // Company status
    ("NORMAL", "active"),
    ("UNDER TVANGSOPLØSNING", "under_forced_dissolution"),
    ("TVANGSOPLØST", "forcibly_dissolved"),
    ("UNDER FRIVILLIG LIKVIDATION", "under_voluntary_liquidation"),
    ("OPLØST EFTER FRIVILLIG LIKVIDATION", "dissolved_after_voluntary_liquidation"),
    ("OPLØST EFTER ERKLÆRING", "dissolved_by_declaration"),
    ("UNDER KONKURS", "under_bankruptcy"),
    ("OPLØST EFTER KONKURS", "dissolved_after_bankruptcy"),
    ("UNDER REKONSTRUKTION", "under_reconstruction"),
    ("UNDER REASSUMERING", "under_reassumption"),
    ("OPLØST EFTER FUSION", "dissolved_after_merger"),
    ("OPLØST EFTER SPALTNING", "dissolved_after_split"),
    ("SLETTET", "deleted"),
    ("UDEN RETSVIRKNING", "without_legal_effect"),
    // Attribute types
    ("TEGNINGSREGEL", "signing_rules"),
    ("VEDTÆGT_SENESTE", "latest_articles_of_association"),
    ("FORMÅL", "company_purpose"),
    ("REGNSKABSÅR_START", "financial_year_start"),
    ("REGNSKABSÅR_SLUT", "financial_year_end"),
    ("KAPITAL", "share_capital"),
    ("KAPITALVALUTA", "capital_currency"),
    ("PSEUDOCVRNR", "pseudo_cvr_number"),
    ("ARKIV_REGISTRERINGSNUMMER", "archive_registration_number"),
];

/// Columns whose coded values are translated.
pub const VALUE_COLUMNS: &[&str] = &[
    "status",
    "type",
    "attributType",
    "sammensatStatus",
    "Vrvirksomhed_virksomhedMetadata_sammensatStatus",
];

fn find(table: &[(&str, &'static str)], key: &str) -> Option<&'static str> {
    table.iter().find(|(da, _)| *da == key).map(|(_, en)| *en)
}

/// English name of a column, if known.
pub fn translate_column(name: &str) -> Option<&'static str> {
    find(COLUMN_TRANSLATIONS, name)
}

/// English form of a coded value, if known.
pub fn translate_value(value: &str) -> Option<&'static str> {
    find(VALUE_TRANSLATIONS, value)
}

/// Translate coded values, then column names, in place.
///
/// A column is left under its Danish name when its English name is already
/// taken. Returns the number of renamed columns.
pub fn translate_frame(df: &mut DataFrame) -> Result<usize> {
    for name in VALUE_COLUMNS {
        let Ok(column) = df.column(name) else {
            continue;
        };
        let Ok(values) = column.str() else {
            continue;
        };
        let translated: Vec<Option<&str>> = values
            .into_iter()
            .map(|v| v.map(|s| translate_value(s).unwrap_or(s)))
            .collect();
        let column = Column::new((*name).into(), translated);
        df.with_column(column)?;
    }

    let names: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|n| n.to_string())
        .collect();
    let mut renamed = 0;
    for name in &names {
        let Some(english) = translate_column(name) else {
            continue;
        };
        if english == name.as_str() {
            continue;
        }
        if df.get_column_index(english).is_some() {
            warn!(column = %name, target = english, "translated name already taken; column kept");
            continue;
        }
        df.rename(name, english.into())?;
        renamed += 1;
    }
    Ok(renamed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookups() {
        assert_eq!(translate_column("cvrNummer"), Some("cvr_number"));
        assert_eq!(translate_column("unknown"), None);
        assert_eq!(translate_value("UNDER KONKURS"), Some("under_bankruptcy"));
        assert_eq!(translate_value("KAPITAL"), Some("share_capital"));
    }

    #[test]
    fn test_translate_frame() {
        let mut df = df! {
            "cvrNummer" => [1i64, 2],
            "status" => [Some("NORMAL"), Some("UKENDT")],
            "gyldigFra" => [None::<&str>, Some("2020-01-01")],
            "other" => ["a", "b"]
        }
        .unwrap();

        let renamed = translate_frame(&mut df).unwrap();

        assert_eq!(renamed, 2);
        let names: Vec<&str> = df.get_column_names().iter().map(|n| n.as_str()).collect();
        assert_eq!(names, vec!["cvr_number", "status", "valid_from", "other"]);
        let status = df.column("status").unwrap().str().unwrap();
        assert_eq!(status.get(0), Some("active"));
        assert_eq!(status.get(1), Some("UKENDT"));
    }

    #[test]
    fn test_taken_name_is_kept() {
        let mut df = df! {
            "kommuneKode" => [1i64],
            "municipality_code" => [2i64]
        }
        .unwrap();
        assert_eq!(translate_frame(&mut df).unwrap(), 0);
        assert!(df.column("kommuneKode").is_ok());
    }
}
