/// Variable registry for the trend output store.
///
/// Defines the canonical list of variables the trend driver knows how to
/// produce, along with the resolution their per-station series are stored at.
/// This is the single source of truth for variable names; configuration may
/// activate a subset but never add to it.

use crate::model::Resolution;

// ---------------------------------------------------------------------------
// Variable metadata
// ---------------------------------------------------------------------------

/// Metadata for a single recognised variable.
#[derive(Debug)]
pub struct Variable {
    /// Name used in file names and table `var` columns.
    pub name: &'static str,
    /// Resolution of the stored per-station series.
    pub resolution: Resolution,
    pub description: &'static str,
}

const fn monthly(name: &'static str, description: &'static str) -> Variable {
    Variable {
        name,
        resolution: Resolution::Monthly,
        description,
    }
}

/// All variables recognised by the store, in processing order.
pub static VARIABLE_REGISTRY: &[Variable] = &[
    monthly("concno2", "NO2 mass concentration"),
    monthly("concso2", "SO2 mass concentration"),
    monthly("concco", "CO mass concentration"),
    monthly("vmrc2h6", "Ethane volume mixing ratio"),
    monthly("vmrc2h4", "Ethene volume mixing ratio"),
    monthly("concpm25", "PM2.5 mass concentration"),
    monthly("concpm10", "PM10 mass concentration"),
    Variable {
        name: "vmro3max",
        resolution: Resolution::Daily,
        // Sourced from hourly vmro3, stored after resampling to daily max.
        description: "Daily maximum ozone volume mixing ratio",
    },
    monthly("concso4", "Sulphate mass concentration"),
    monthly("concNtno3", "Total nitrate as nitrogen"),
    monthly("concNtnh", "Total ammonium + ammonia as nitrogen"),
    monthly("concNnh3", "Ammonia as nitrogen"),
    monthly("concNnh4", "Ammonium as nitrogen"),
    monthly("concNhno3", "Nitric acid as nitrogen"),
    monthly("concNno3pm25", "Fine nitrate as nitrogen"),
    monthly("concNno3pm10", "Coarse nitrate as nitrogen"),
    monthly("concsspm25", "Fine sea salt"),
    monthly("concss", "Sea salt"),
    monthly("concCecpm25", "Fine elemental carbon"),
    monthly("concCocpm25", "Fine organic carbon"),
    monthly("conchcho", "Formaldehyde mass concentration"),
    monthly("wetoxs", "Wet deposition of oxidised sulphur"),
    monthly("wetrdn", "Wet deposition of reduced nitrogen"),
    monthly("wetoxn", "Wet deposition of oxidised nitrogen"),
    monthly("pr", "Precipitation"),
    monthly("vmrisop", "Isoprene volume mixing ratio"),
    monthly("concglyoxal", "Glyoxal mass concentration"),
];

/// Default seasons a monthly variable is trended over.
pub const DEFAULT_SEASONS: &[&str] = &["all", "spring", "summer", "autumn", "winter"];

/// Default yearly percentiles of daily max a daily variable is trended over.
pub const DEFAULT_PERCENTILES: &[u8] = &[10, 50, 75, 95, 98, 99];

/// Looks up a variable by name. Returns `None` if not registered.
pub fn find_variable(name: &str) -> Option<&'static Variable> {
    VARIABLE_REGISTRY.iter().find(|v| v.name == name)
}

/// Returns the names of all registered variables.
pub fn all_variable_names() -> Vec<&'static str> {
    VARIABLE_REGISTRY.iter().map(|v| v.name).collect()
}

/// Returns the names of registered variables stored at `resolution`.
pub fn variables_with_resolution(resolution: Resolution) -> Vec<&'static str> {
    VARIABLE_REGISTRY
        .iter()
        .filter(|v| v.resolution == resolution)
        .map(|v| v.name)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_duplicate_variable_names() {
        let mut seen = std::collections::HashSet::new();
        for var in VARIABLE_REGISTRY {
            assert!(
                seen.insert(var.name),
                "duplicate variable '{}' found in VARIABLE_REGISTRY",
                var.name
            );
        }
    }

    #[test]
    fn test_variable_names_are_single_file_name_tokens() {
        // Names are embedded between '_' separators in every artifact name;
        // an underscore inside a name would make retention token matching
        // ambiguous.
        for var in VARIABLE_REGISTRY {
            assert!(
                !var.name.is_empty() && var.name.chars().all(|c| c.is_ascii_alphanumeric()),
                "variable name '{}' must be a non-empty alphanumeric token",
                var.name
            );
        }
    }

    #[test]
    fn test_only_daily_max_ozone_is_daily() {
        assert_eq!(variables_with_resolution(Resolution::Daily), vec!["vmro3max"]);
        assert_eq!(
            variables_with_resolution(Resolution::Monthly).len(),
            VARIABLE_REGISTRY.len() - 1
        );
    }

    #[test]
    fn test_find_variable_returns_correct_entry() {
        let pr = find_variable("pr").expect("precipitation should be registered");
        assert_eq!(pr.resolution, Resolution::Monthly);
        assert!(find_variable("vmro3").is_none(), "raw hourly ozone is not an output variable");
        assert!(find_variable("stale_var").is_none());
    }

    #[test]
    fn test_all_variable_names_matches_registry_length() {
        assert_eq!(all_variable_names().len(), VARIABLE_REGISTRY.len());
    }

    #[test]
    fn test_default_sub_keys() {
        assert_eq!(DEFAULT_SEASONS[0], "all");
        assert!(DEFAULT_PERCENTILES.windows(2).all(|w| w[0] < w[1]));
        assert!(DEFAULT_PERCENTILES.iter().all(|p| *p > 0 && *p < 100));
    }
}
