//! Column headers of the facility spreadsheet (after header normalization)

pub const NAME: &str = "Наименование";
pub const LOCALITY: &str = "Населенный пункт";
pub const ADDRESS: &str = "Адрес";
pub const BRANCH: &str = "Филиал";
pub const PHARMACY: &str = "Наличие аптеки на ТТ";
pub const OPERATIONS_ENGINEER: &str = "Инженер по эксплуатации";
pub const REFRIGERATION_ENGINEER: &str = "Инженер по ХиТО";
pub const POWER_ENGINEER: &str = "Инженер-энергетик";
pub const HEATING_ENGINEER: &str = "Инженер-теплотехник";
pub const KTO_MECHANIC: &str = "Механик КТО";
pub const REFRIGERATION_MECHANIC: &str = "Механик ХО";
pub const ELECTRICIAN: &str = "Электрик";

/// Popup rows, in display order
pub const DEFAULT_POPUP_FIELDS: [&str; 12] = [
    NAME,
    LOCALITY,
    ADDRESS,
    BRANCH,
    PHARMACY,
    OPERATIONS_ENGINEER,
    REFRIGERATION_ENGINEER,
    POWER_ENGINEER,
    HEATING_ENGINEER,
    KTO_MECHANIC,
    REFRIGERATION_MECHANIC,
    ELECTRICIAN,
];

/// Marker colors are grouped by the assigned KTO mechanic
pub const DEFAULT_GROUP_COLUMN: &str = KTO_MECHANIC;
