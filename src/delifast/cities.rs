//! Emirate/city resolution for partner city IDs.
//!
//! Shopify orders carry free-form province text (English or Arabic, or a
//! three-letter emirate code); the partner wants one of its fixed city IDs.

/// Partner city ID used when nothing matches.
pub const DEFAULT_CITY_ID: i32 = 13;

const MIN_CITY_ID: i32 = 5;
const MAX_CITY_ID: i32 = 14;

struct City {
    id: i32,
    code: &'static str,
    name_en: &'static str,
    name_ar: &'static str,
}

const CITIES: &[City] = &[
    City { id: 5, code: "DXB", name_en: "Dubai", name_ar: "دبي" },
    City { id: 6, code: "AUH", name_en: "Abu Dhabi", name_ar: "أبوظبي" },
    City { id: 7, code: "SHJ", name_en: "Sharjah", name_ar: "الشارقة" },
    City { id: 8, code: "AJM", name_en: "Ajman", name_ar: "عجمان" },
    City { id: 9, code: "UAQ", name_en: "Umm Al Quwain", name_ar: "أم القيوين" },
    City { id: 10, code: "RAK", name_en: "Ras Al Khaimah", name_ar: "رأس الخيمة" },
    City { id: 11, code: "FUJ", name_en: "Fujairah", name_ar: "الفجيرة" },
    City { id: 12, code: "AAN", name_en: "Al Ain", name_ar: "العين" },
    City { id: 14, code: "KHF", name_en: "Khor Fakkan", name_ar: "خورفكان" },
];

/// Resolve a free-form province value to a partner city ID.
///
/// Resolution order, first match wins:
/// 1. emirate code ("DXB", "AUH", ...)
/// 2. exact English or Arabic name
/// 3. case-insensitive name
/// 4. substring match in either direction
/// 5. the value parsed as an integer already within the valid ID range
/// 6. the provided fallback
pub fn map_province_to_city(province: &str, fallback: i32) -> i32 {
    let trimmed = province.trim();
    if trimmed.is_empty() {
        return fallback;
    }

    if let Some(city) = CITIES.iter().find(|c| c.code == trimmed) {
        return city.id;
    }

    if let Some(city) = CITIES
        .iter()
        .find(|c| c.name_en == trimmed || c.name_ar == trimmed)
    {
        return city.id;
    }

    let lowered = trimmed.to_lowercase();
    if let Some(city) = CITIES
        .iter()
        .find(|c| c.name_en.to_lowercase() == lowered)
    {
        return city.id;
    }

    if let Some(city) = CITIES.iter().find(|c| {
        let name = c.name_en.to_lowercase();
        name.contains(&lowered)
            || lowered.contains(&name)
            || trimmed.contains(c.name_ar)
            || c.name_ar.contains(trimmed)
    }) {
        return city.id;
    }

    if let Ok(id) = trimmed.parse::<i32>()
        && (MIN_CITY_ID..=MAX_CITY_ID).contains(&id)
    {
        return id;
    }

    fallback
}

/// Whether the given ID is one of the partner's known city IDs.
pub fn is_valid_city_id(id: i32) -> bool {
    (MIN_CITY_ID..=MAX_CITY_ID).contains(&id) || id == DEFAULT_CITY_ID
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emirate_code_match() {
        assert_eq!(map_province_to_city("DXB", DEFAULT_CITY_ID), 5);
        assert_eq!(map_province_to_city("AUH", DEFAULT_CITY_ID), 6);
        assert_eq!(map_province_to_city("KHF", DEFAULT_CITY_ID), 14);
    }

    #[test]
    fn test_exact_name_match() {
        assert_eq!(map_province_to_city("Dubai", DEFAULT_CITY_ID), 5);
        assert_eq!(map_province_to_city("Ras Al Khaimah", DEFAULT_CITY_ID), 10);
        assert_eq!(map_province_to_city("دبي", DEFAULT_CITY_ID), 5);
        assert_eq!(map_province_to_city("الشارقة", DEFAULT_CITY_ID), 7);
    }

    #[test]
    fn test_case_insensitive_match() {
        assert_eq!(map_province_to_city("dubai", DEFAULT_CITY_ID), 5);
        assert_eq!(map_province_to_city("ABU DHABI", DEFAULT_CITY_ID), 6);
        assert_eq!(map_province_to_city("sharjah", DEFAULT_CITY_ID), 7);
    }

    #[test]
    fn test_substring_match_both_directions() {
        // Province contains the city name
        assert_eq!(map_province_to_city("Emirate of Dubai", DEFAULT_CITY_ID), 5);
        // City name contains the province text
        assert_eq!(map_province_to_city("fujair", DEFAULT_CITY_ID), 11);
    }

    #[test]
    fn test_numeric_province_within_range() {
        assert_eq!(map_province_to_city("7", DEFAULT_CITY_ID), 7);
        assert_eq!(map_province_to_city("14", DEFAULT_CITY_ID), 14);
    }

    #[test]
    fn test_numeric_province_out_of_range_falls_back() {
        assert_eq!(map_province_to_city("99", DEFAULT_CITY_ID), DEFAULT_CITY_ID);
        assert_eq!(map_province_to_city("4", 6), 6);
    }

    #[test]
    fn test_name_match_wins_over_numeric_parse() {
        // A name that happens to contain digits still resolves by name first
        assert_eq!(map_province_to_city(" Dubai ", 6), 5);
    }

    #[test]
    fn test_unknown_and_empty_fall_back() {
        assert_eq!(map_province_to_city("Atlantis", DEFAULT_CITY_ID), DEFAULT_CITY_ID);
        assert_eq!(map_province_to_city("", 5), 5);
        assert_eq!(map_province_to_city("   ", 5), 5);
    }

    #[test]
    fn test_valid_city_ids() {
        for id in 5..=14 {
            assert!(is_valid_city_id(id));
        }
        assert!(is_valid_city_id(DEFAULT_CITY_ID));
        assert!(!is_valid_city_id(4));
        assert!(!is_valid_city_id(15));
    }
}
