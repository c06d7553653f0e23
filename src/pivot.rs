// Long-to-wide reshapes.
//
// Both pivots turn grouped long rows into one row per key with one
// column (or column block) per mode. Missing combinations fill with
// zero; logger indicators are absent rather than zero when a mode was
// never logged.
use crate::aggregate::{Metrics, UserModeKey};
use crate::types::{Method, ModeStats, CLEAN_MODES};
use std::collections::BTreeMap;

/// Per-territory mode-log columns for the GDOT report. Drive is
/// excluded by reporting policy; unrecognized modes stay visible in
/// the long Tableau output but have no column here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModeLogs {
    pub carpool: i64,
    pub vanpool: i64,
    pub transit: i64,
    pub telework: i64,
    pub walk: i64,
    pub bike: i64,
    pub scooter: i64,
    pub cww: i64,
}

pub fn mode_logs_wide(long: &BTreeMap<(String, Method), i64>) -> BTreeMap<String, ModeLogs> {
    let mut wide: BTreeMap<String, ModeLogs> = BTreeMap::new();
    for ((territory, method), count) in long {
        // Entry first: a territory whose only logs are Drive logs still
        // gets a (zero-filled) row.
        let entry = wide.entry(territory.clone()).or_default();
        match method {
            Method::Carpool => entry.carpool += count,
            Method::Vanpool => entry.vanpool += count,
            Method::Transit => entry.transit += count,
            Method::Telework => entry.telework += count,
            Method::Walk => entry.walk += count,
            Method::Bike => entry.bike += count,
            Method::Scooter => entry.scooter += count,
            Method::Cww => entry.cww += count,
            Method::Drive | Method::Other(_) => {}
        }
    }
    wide
}

/// One user's wide mode blocks plus the cross-mode Clean rollup.
#[derive(Debug, Clone, Default)]
pub struct UserWide {
    /// Aligned with [`CLEAN_MODES`].
    pub modes: [ModeStats; 8],
    pub clean: ModeStats,
}

/// Pivot the per-user-per-mode aggregate into one row per user.
///
/// Every user in the source aggregate gets a row, including users whose
/// only logged mode was Drive (their metric columns are all zero). CO2
/// converts to pounds from each group's summed grams. The Clean block
/// is a fold over the eight non-drive mode blocks.
pub fn user_mode_wide(per_user: &BTreeMap<UserModeKey, Metrics>) -> BTreeMap<String, UserWide> {
    let mut wide: BTreeMap<String, UserWide> = BTreeMap::new();

    for ((user_id, method, _, _), metrics) in per_user {
        let entry = wide.entry(user_id.clone()).or_default();
        if let Some(slot) = CLEAN_MODES.iter().position(|m| m == method) {
            let stats = &mut entry.modes[slot];
            stats.trips += metrics.trips;
            stats.miles += metrics.miles;
            stats.vmr += metrics.vmr;
            stats.co2_lbs += metrics.co2_pounds();
            stats.dollars += metrics.dollars;
        }
    }

    for entry in wide.values_mut() {
        for stats in entry.modes.iter_mut() {
            stats.logger = (stats.trips > 0.0).then_some(1);
        }
        entry.clean = entry
            .modes
            .iter()
            .fold(ModeStats::default(), |mut acc, stats| {
                acc.trips += stats.trips;
                acc.miles += stats.miles;
                acc.vmr += stats.vmr;
                acc.co2_lbs += stats.co2_lbs;
                acc.dollars += stats.dollars;
                acc
            });
        entry.clean.logger = (entry.clean.trips > 0.0).then_some(1);
    }

    wide
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::GRAMS_TO_POUNDS;

    #[test]
    fn mode_logs_fill_missing_combinations_with_zero() {
        let mut long = BTreeMap::new();
        long.insert(("North".to_string(), Method::Bike), 3);
        let wide = mode_logs_wide(&long);
        let north = &wide["North"];
        assert_eq!(north.bike, 3);
        assert_eq!(north.carpool, 0);
        assert_eq!(north.walk, 0);
    }

    #[test]
    fn drive_logs_have_no_column_but_keep_the_row() {
        let mut long = BTreeMap::new();
        long.insert(("North".to_string(), Method::Drive), 9);
        let wide = mode_logs_wide(&long);
        assert_eq!(wide["North"], ModeLogs::default());
    }

    fn key(user: &str, method: Method) -> UserModeKey {
        (
            user.to_string(),
            method,
            "North".to_string(),
            "30309".to_string(),
        )
    }

    #[test]
    fn one_row_per_user_with_zero_filled_modes() {
        let mut per_user = BTreeMap::new();
        per_user.insert(
            key("a", Method::Bike),
            Metrics {
                trips: 2.0,
                miles: 10.0,
                vmr: 5.0,
                co2_grams: 2000.0,
                dollars: 3.0,
            },
        );
        per_user.insert(key("b", Method::Drive), Metrics::default());

        let wide = user_mode_wide(&per_user);
        assert_eq!(wide.len(), 2);

        let a = &wide["a"];
        let bike_slot = CLEAN_MODES
            .iter()
            .position(|m| *m == Method::Bike)
            .unwrap();
        assert_eq!(a.modes[bike_slot].trips, 2.0);
        assert_eq!(a.modes[bike_slot].logger, Some(1));
        assert!((a.modes[bike_slot].co2_lbs - 2000.0 * GRAMS_TO_POUNDS).abs() < 1e-12);

        // Drive-only user: present, all zero, no logger indicators.
        let b = &wide["b"];
        assert!(b.modes.iter().all(|s| s.trips == 0.0 && s.logger.is_none()));
        assert_eq!(b.clean.logger, None);
    }

    #[test]
    fn clean_block_is_the_fold_of_all_mode_blocks() {
        let mut per_user = BTreeMap::new();
        per_user.insert(
            key("a", Method::Bike),
            Metrics {
                trips: 2.0,
                miles: 10.0,
                vmr: 5.0,
                co2_grams: 1000.0,
                dollars: 3.0,
            },
        );
        per_user.insert(
            key("a", Method::Walk),
            Metrics {
                trips: 1.0,
                miles: 2.0,
                vmr: 2.0,
                co2_grams: 500.0,
                dollars: 1.0,
            },
        );
        let wide = user_mode_wide(&per_user);
        let a = &wide["a"];
        assert_eq!(a.clean.trips, 3.0);
        assert_eq!(a.clean.miles, 12.0);
        assert_eq!(a.clean.logger, Some(1));
        assert!((a.clean.co2_lbs - 1500.0 * GRAMS_TO_POUNDS).abs() < 1e-12);
    }
}
