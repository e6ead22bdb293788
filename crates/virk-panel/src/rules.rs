//! Extraction Rule Registry
//!
//! Every repeating sub-structure of a company record is described here as
//! data: which list field to walk, which leaves to copy into each row and
//! which nested list, if any, to walk next. One engine in
//! [`crate::normalize`] interprets every rule.

use std::collections::HashMap;

/// Broad grouping of the sub-structure tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleCategory {
    /// Primary and secondary names
    Name,
    /// Business and postal addresses
    Address,
    /// Main and secondary industry codes
    Industry,
    /// Annual, quarterly and monthly employment counts
    Employment,
    /// Phone, fax, e-mail and website
    Contact,
    /// Status, legal form, registration number, lifecycle
    Registration,
    /// Participant relations and attributes
    Relation,
}

/// One copied value: output column and dotted path inside the list element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leaf {
    /// Output column name
    pub column: &'static str,
    /// Dotted path resolved by [`crate::flatten::lookup`]
    pub path: &'static str,
}

impl Leaf {
    /// Leaf whose column is named after its path.
    pub const fn field(name: &'static str) -> Self {
        Self {
            column: name,
            path: name,
        }
    }

    /// Leaf with a column name different from its path.
    pub const fn renamed(column: &'static str, path: &'static str) -> Self {
        Self { column, path }
    }
}

/// Validity period and update stamp carried by temporal elements.
pub const PERIOD_LEAVES: &[Leaf] = &[
    Leaf::renamed("gyldigFra", "periode.gyldigFra"),
    Leaf::renamed("gyldigTil", "periode.gyldigTil"),
    Leaf::field("sidstOpdateret"),
];

/// One nesting level of a rule.
#[derive(Debug, Clone, Copy)]
pub struct Level {
    /// Leaves copied from each element of this level
    pub leaves: &'static [Leaf],
    /// Whether [`PERIOD_LEAVES`] follow the leaves
    pub temporal: bool,
    /// Nested list walked for each element of this level
    pub child: Option<&'static Child>,
}

impl Level {
    /// Every leaf of this level, period leaves last.
    pub fn all_leaves(&self) -> impl Iterator<Item = &'static Leaf> + '_ {
        let period: &'static [Leaf] = if self.temporal { PERIOD_LEAVES } else { &[] };
        self.leaves.iter().chain(period.iter())
    }
}

/// Nested list below a level.
///
/// An element whose nested list is missing or empty still yields one
/// placeholder row: the outer level's values with this level's columns null.
#[derive(Debug, Clone, Copy)]
pub struct Child {
    /// List field inside the parent element
    pub field: &'static str,
    /// Shape of each element of the list
    pub level: Level,
}

/// Extraction rule producing one sub-structure table.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionRule {
    /// Table name, used in output file names
    pub table: &'static str,
    /// List field under the entity root
    pub field: &'static str,
    /// Rule category
    pub category: RuleCategory,
    /// Brief description of the table
    pub description: &'static str,
    /// Shape of each element of the list
    pub level: Level,
}

impl ExtractionRule {
    /// Output columns after the key columns.
    ///
    /// A column declared at several levels is placed at its innermost
    /// declaration.
    pub fn value_columns(&self) -> Vec<&'static str> {
        let mut columns: Vec<&'static str> = Vec::new();
        let mut level = Some(&self.level);
        while let Some(current) = level {
            for leaf in current.all_leaves() {
                columns.retain(|c| *c != leaf.column);
                columns.push(leaf.column);
            }
            level = current.child.map(|child| &child.level);
        }
        columns
    }

    /// Number of nesting levels.
    pub fn depth(&self) -> usize {
        let mut depth = 1;
        let mut child = self.level.child;
        while let Some(next) = child {
            depth += 1;
            child = next.level.child;
        }
        depth
    }
}

/// Registry of rules for one entity type.
#[derive(Debug, Clone, Copy)]
pub struct RuleSet {
    /// Object under `_source` holding the entity
    pub root: &'static str,
    /// Field of the root holding the business id
    pub business_id: &'static str,
    /// Field of the root holding the unit id
    pub unit_id: &'static str,
    /// Registered rules, in output order
    pub rules: &'static [ExtractionRule],
}

impl RuleSet {
    /// Key columns of every sub-structure table.
    pub const fn key_columns(&self) -> [&'static str; 2] {
        [self.business_id, self.unit_id]
    }

    /// Full column list of a rule's table: key columns, then value columns.
    pub fn columns(&self, rule: &ExtractionRule) -> Vec<&'static str> {
        let mut columns = self.key_columns().to_vec();
        columns.extend(rule.value_columns());
        columns
    }

    /// Get rule by table name
    pub fn get(&self, table: &str) -> Option<&'static ExtractionRule> {
        self.rules.iter().find(|r| r.table == table)
    }

    /// Flattened main table column that holds a rule's list.
    pub fn list_column(&self, rule: &ExtractionRule) -> String {
        format!("{}{}{}", self.root, crate::flatten::SEPARATOR, rule.field)
    }
}

const fn flat(
    table: &'static str,
    category: RuleCategory,
    description: &'static str,
    leaves: &'static [Leaf],
    temporal: bool,
) -> ExtractionRule {
    ExtractionRule {
        table,
        field: table,
        category,
        description,
        level: Level {
            leaves,
            temporal,
            child: None,
        },
    }
}

const NAME_LEAVES: &[Leaf] = &[Leaf::field("navn")];

const ADDRESS_LEAVES: &[Leaf] = &[
    Leaf::field("landekode"),
    Leaf::field("fritekst"),
    Leaf::field("vejkode"),
    Leaf::field("vejnavn"),
    Leaf::field("husnummerFra"),
    Leaf::field("husnummerTil"),
    Leaf::field("bogstavFra"),
    Leaf::field("bogstavTil"),
    Leaf::field("etage"),
    Leaf::field("sidedoer"),
    Leaf::field("conavn"),
    Leaf::field("postboks"),
    Leaf::field("postnummer"),
    Leaf::field("postdistrikt"),
    Leaf::field("bynavn"),
    Leaf::field("adresseId"),
    Leaf::field("sidstValideret"),
    Leaf::renamed("kommuneKode", "kommune.kommuneKode"),
    Leaf::renamed("kommuneNavn", "kommune.kommuneNavn"),
];

const INDUSTRY_LEAVES: &[Leaf] = &[Leaf::field("branchekode"), Leaf::field("branchetekst")];

const EMPLOYMENT_LEAVES: &[Leaf] = &[
    Leaf::field("aar"),
    Leaf::field("kvartal"),
    Leaf::field("maaned"),
    Leaf::field("antalInklusivEjere"),
    Leaf::field("antalAarsvaerk"),
    Leaf::field("antalAnsatte"),
    Leaf::field("intervalKodeAntalInklusivEjere"),
    Leaf::field("intervalKodeAntalAarsvaerk"),
    Leaf::field("intervalKodeAntalAnsatte"),
    Leaf::field("sidstOpdateret"),
];

const CONTACT_LEAVES: &[Leaf] = &[Leaf::field("kontaktoplysning")];

const PARTICIPANT_ATTRIBUTES: Child = Child {
    field: "attributter",
    level: Level {
        leaves: &[
            Leaf::renamed("attributType", "type"),
            Leaf::renamed("attributVapitype", "vapitype"),
            Leaf::renamed("attributSekvensnr", "sekvensnr"),
            Leaf::renamed("attributVaerdi", "vaerdier.0.vaerdi"),
        ],
        temporal: true,
        child: None,
    },
};

const PARTICIPANT_MEMBERS: Child = Child {
    field: "medlemsData",
    level: Level {
        leaves: &[],
        temporal: false,
        child: Some(&PARTICIPANT_ATTRIBUTES),
    },
};

const PARTICIPANT_ORGANISATIONS: Child = Child {
    field: "organisationer",
    level: Level {
        leaves: &[
            Leaf::renamed("organisationHovedtype", "hovedtype"),
            Leaf::renamed("organisationNavn", "organisationsNavn.0.navn"),
        ],
        temporal: true,
        child: Some(&PARTICIPANT_MEMBERS),
    },
};

const ATTRIBUTE_VALUES: Child = Child {
    field: "vaerdier",
    level: Level {
        leaves: &[Leaf::field("vaerdi")],
        temporal: false,
        child: None,
    },
};

const COMPANY_RULES: &[ExtractionRule] = &[
    // Names
    flat("navne", RuleCategory::Name, "Registered company names", NAME_LEAVES, true),
    flat("binavne", RuleCategory::Name, "Secondary names", NAME_LEAVES, true),
    // Addresses
    flat("beliggenhedsadresse", RuleCategory::Address, "Business address", ADDRESS_LEAVES, true),
    flat("postadresse", RuleCategory::Address, "Postal address", ADDRESS_LEAVES, true),
    // Industry
    flat("hovedbranche", RuleCategory::Industry, "Main industry code", INDUSTRY_LEAVES, true),
    flat("bibranche1", RuleCategory::Industry, "First secondary industry", INDUSTRY_LEAVES, true),
    flat("bibranche2", RuleCategory::Industry, "Second secondary industry", INDUSTRY_LEAVES, true),
    flat("bibranche3", RuleCategory::Industry, "Third secondary industry", INDUSTRY_LEAVES, true),
    // Employment
    flat("aarsbeskaeftigelse", RuleCategory::Employment, "Annual employment", EMPLOYMENT_LEAVES, false),
    flat("kvartalsbeskaeftigelse", RuleCategory::Employment, "Quarterly employment", EMPLOYMENT_LEAVES, false),
    flat("maanedsbeskaeftigelse", RuleCategory::Employment, "Monthly employment", EMPLOYMENT_LEAVES, false),
    // Status
    flat("virksomhedsstatus", RuleCategory::Registration, "Company status", &[Leaf::field("status")], true),
    // Contact
    flat("telefonNummer", RuleCategory::Contact, "Phone numbers", CONTACT_LEAVES, true),
    flat("telefaxNummer", RuleCategory::Contact, "Fax numbers", CONTACT_LEAVES, true),
    flat("elektroniskPost", RuleCategory::Contact, "E-mail addresses", CONTACT_LEAVES, true),
    flat("hjemmeside", RuleCategory::Contact, "Websites", CONTACT_LEAVES, true),
    // Form and registration
    flat(
        "virksomhedsform",
        RuleCategory::Registration,
        "Legal form",
        &[
            Leaf::field("virksomhedsformkode"),
            Leaf::field("kortBeskrivelse"),
            Leaf::field("langBeskrivelse"),
            Leaf::field("ansvarligDataleverandoer"),
        ],
        true,
    ),
    flat("regNummer", RuleCategory::Registration, "Registration numbers", &[Leaf::field("regnummer")], true),
    flat("livsforloeb", RuleCategory::Registration, "Lifecycle periods", &[], true),
    // Relations
    ExtractionRule {
        table: "deltagerRelation",
        field: "deltagerRelation",
        category: RuleCategory::Relation,
        description: "Participants with their organisations and member attributes",
        level: Level {
            leaves: &[
                Leaf::renamed("deltagerEnhedsNummer", "deltager.enhedsNummer"),
                Leaf::renamed("deltagerEnhedstype", "deltager.enhedstype"),
                Leaf::renamed("deltagerForretningsnoegle", "deltager.forretningsnoegle"),
            ],
            temporal: false,
            child: Some(&PARTICIPANT_ORGANISATIONS),
        },
    },
    ExtractionRule {
        table: "attributter",
        field: "attributter",
        category: RuleCategory::Relation,
        description: "Company attributes such as capital and purpose",
        level: Level {
            leaves: &[
                Leaf::field("type"),
                Leaf::field("vapitype"),
                Leaf::field("sekvensnr"),
            ],
            temporal: true,
            child: Some(&ATTRIBUTE_VALUES),
        },
    },
];

/// Rules for company records under `_source.Vrvirksomhed`.
pub const COMPANY: RuleSet = RuleSet {
    root: "Vrvirksomhed",
    business_id: "cvrNummer",
    unit_id: "enhedsNummer",
    rules: COMPANY_RULES,
};

/// Get all company rules
pub fn company_rules() -> &'static [ExtractionRule] {
    COMPANY.rules
}

/// Get rule by table name
pub fn get_rule(table: &str) -> Option<&'static ExtractionRule> {
    COMPANY.get(table)
}

/// Get rules by category
pub fn rules_by_category(category: RuleCategory) -> Vec<&'static ExtractionRule> {
    company_rules()
        .iter()
        .filter(|r| r.category == category)
        .collect()
}

/// List all table names
pub fn list_table_names() -> Vec<&'static str> {
    company_rules().iter().map(|r| r.table).collect()
}

/// Count rules by category
pub fn count_by_category() -> HashMap<RuleCategory, usize> {
    let mut counts = HashMap::new();
    for rule in company_rules() {
        *counts.entry(rule.category).or_insert(0) += 1;
    }
    counts
}
