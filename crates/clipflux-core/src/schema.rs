//! Column names and date layouts shared by the persisted tables.
//!
//! These names are the on-disk contract with any tooling that reads the CSV
//! artifacts, so they are spelled out once here and never inlined.

pub const RAW_TIME: &str = "Time";
pub const RAW_POWER: &str = "power";

pub const DATE: &str = "date";
pub const TIME_INTERVAL: &str = "time_interval";
pub const POWER: &str = "power";
pub const ENERGY: &str = "energy";
pub const INCREMENTED_ENERGY: &str = "incremented_energy";

pub const LOSS_WITHOUT_CLIPPING: &str = "loss_without_clipping";
pub const LOSS_WITH_CLIPPING: &str = "loss_with_clipping";
pub const LOSS_DIFFERENCE: &str = "loss_difference";

pub const DAY: &str = "day";
pub const LOSS_WITHOUT_CLIPPING_TOTAL: &str = "loss_without_clipping_total";
pub const LOSS_WITH_CLIPPING_TOTAL: &str = "loss_with_clipping_total";
pub const LOSS_DIFFERENCE_TOTAL: &str = "loss_difference_total";

pub const RAW_COLUMNS: [&str; 2] = [RAW_TIME, RAW_POWER];

pub const CLEANED_COLUMNS: [&str; 4] = [DATE, TIME_INTERVAL, POWER, ENERGY];

pub const CALCULATED_COLUMNS: [&str; 5] = [DATE, TIME_INTERVAL, POWER, ENERGY, INCREMENTED_ENERGY];

pub const LOSS_COLUMNS: [&str; 3] = [LOSS_WITHOUT_CLIPPING, LOSS_WITH_CLIPPING, LOSS_DIFFERENCE];

pub const ANALYSED_COLUMNS: [&str; 4] = [
    DAY,
    LOSS_WITHOUT_CLIPPING_TOTAL,
    LOSS_WITH_CLIPPING_TOTAL,
    LOSS_DIFFERENCE_TOTAL,
];

/// Layout of `date` in the cleaned table. Also the layout operators use for
/// the projection range bounds.
pub const CLEANED_DATE_FORMAT: &str = "%d-%m-%Y";

/// Layout of `date` in the calculated table and of `day` in the analysed table.
pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Date layouts accepted in the raw `Time` column, tried in order.
pub fn default_raw_date_formats() -> Vec<String> {
    ["%Y-%m-%d", "%d-%m-%Y", "%d/%m/%Y"]
        .iter()
        .map(|format| format.to_string())
        .collect()
}
