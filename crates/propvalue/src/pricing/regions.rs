//! Region and nation names mapped onto ONS area codes used by the price index.

use crate::address::PostcodeRecord;

/// Whole-UK series used by the national-average tier.
pub const NATIONAL_AREA_CODE: &str = "K02000001";

const AREA_CODES: &[(&str, &str)] = &[
    ("north east", "E12000001"),
    ("north west", "E12000002"),
    ("yorkshire and the humber", "E12000003"),
    ("east midlands", "E12000004"),
    ("west midlands", "E12000005"),
    ("east of england", "E12000006"),
    ("london", "E12000007"),
    ("south east", "E12000008"),
    ("south west", "E12000009"),
    ("wales", "W92000004"),
    ("scotland", "S92000003"),
    ("northern ireland", "N92000002"),
];

/// Exact match first, then the longest table name appearing as whole words in
/// the input, so "Greater London" resolves while "England" or "East" do not.
pub fn area_code_for(name: &str) -> Option<&'static str> {
    let needle = name.trim().to_ascii_lowercase().replace('&', "and");
    if needle.is_empty() {
        return None;
    }

    if let Some((_, code)) = AREA_CODES.iter().find(|(region, _)| *region == needle) {
        return Some(*code);
    }

    let padded = format!(" {} ", needle.split_whitespace().collect::<Vec<_>>().join(" "));
    AREA_CODES
        .iter()
        .filter(|(region, _)| padded.contains(&format!(" {region} ")))
        .max_by_key(|(region, _)| region.len())
        .map(|(_, code)| *code)
}

/// English postcodes carry a region; the other nations only a country.
pub(crate) fn area_code_for_record(record: &PostcodeRecord) -> Option<&'static str> {
    [&record.region, &record.country, &record.admin_district]
        .into_iter()
        .flatten()
        .find_map(|name| area_code_for(name))
}
