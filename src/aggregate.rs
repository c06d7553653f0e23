// Grouped reductions over trip-log facts.
//
// One generic group-by/reduce drives every pass; the passes differ only
// in their key tuples and fold functions. `BTreeMap` keeps group
// iteration deterministic, so report row order is reproducible run to
// run.
use crate::territory;
use crate::types::{EnrichedTrip, LocatedUser, Method};
use std::collections::BTreeMap;

/// Grams-to-pounds factor applied to CO2 after summation.
pub const GRAMS_TO_POUNDS: f64 = 0.00220462;

/// Group `rows` by `key_fn` and fold each row into its group's
/// accumulator. `"Unknown"` and similar fallback labels are ordinary
/// key values here, not special cases.
pub fn aggregate<R, K, A, KF, FF>(
    rows: impl IntoIterator<Item = R>,
    key_fn: KF,
    fold: FF,
) -> BTreeMap<K, A>
where
    K: Ord,
    A: Default,
    KF: Fn(&R) -> K,
    FF: Fn(&mut A, &R),
{
    let mut groups: BTreeMap<K, A> = BTreeMap::new();
    for row in rows {
        let acc = groups.entry(key_fn(&row)).or_default();
        fold(acc, &row);
    }
    groups
}

/// The five summable trip metrics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metrics {
    pub trips: f64,
    pub miles: f64,
    pub vmr: f64,
    pub co2_grams: f64,
    pub dollars: f64,
}

impl Metrics {
    pub fn absorb(&mut self, t: &EnrichedTrip) {
        self.trips += t.trip.trips;
        self.miles += t.trip.miles;
        self.vmr += t.trip.vmr;
        self.co2_grams += t.trip.co2_grams;
        self.dollars += t.trip.dollars;
    }

    /// CO2 in pounds, converted from the summed grams. Conversion
    /// happens here, after aggregation, never per source row.
    pub fn co2_pounds(&self) -> f64 {
        self.co2_grams * GRAMS_TO_POUNDS
    }
}

pub type UserModeKey = (String, Method, String, String);

/// Pass (a): per user x method, keyed on the unadjusted service area
/// and home ZIP. Feeds the Tableau report and the per-user wide pivot.
pub fn per_user_mode(trips: &[EnrichedTrip]) -> BTreeMap<UserModeKey, Metrics> {
    aggregate(
        trips,
        |t| {
            (
                t.trip.user_id.clone(),
                t.trip.method.clone(),
                t.eso.clone(),
                t.home_zip.clone(),
            )
        },
        |acc: &mut Metrics, t| acc.absorb(t),
    )
}

/// Pass (b): same grain as (a) but keyed on the funding-adjusted label.
/// Feeds the GDOT territory totals and the logger rollup.
pub fn per_user_mode_adjusted(trips: &[EnrichedTrip]) -> BTreeMap<UserModeKey, Metrics> {
    aggregate(
        trips,
        |t| {
            (
                t.trip.user_id.clone(),
                t.trip.method.clone(),
                t.funding_adjusted.clone(),
                t.home_zip.clone(),
            )
        },
        |acc: &mut Metrics, t| acc.absorb(t),
    )
}

/// Per-territory logger and clean-logger counts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoggerCounts {
    pub loggers: i64,
    pub clean_loggers: i64,
}

#[derive(Default)]
struct UserFlags {
    logger: u8,
    clean: u8,
    territory: String,
}

/// Pass (c): collapse the adjusted per-user-per-mode groups to one
/// record per user (max over modes: any single clean mode makes the
/// user a clean logger), then count by territory. Driving still counts
/// as logging, just not as clean logging.
pub fn logger_rollup(
    adjusted: &BTreeMap<UserModeKey, Metrics>,
) -> BTreeMap<String, LoggerCounts> {
    let per_user = aggregate(
        adjusted.keys(),
        |(user_id, _, _, _)| user_id.clone(),
        |acc: &mut UserFlags, (_, method, adjusted_label, _)| {
            acc.logger = acc.logger.max(1);
            let clean = u8::from(!method.is_drive());
            acc.clean = acc.clean.max(clean);
            acc.territory = territory::territory(adjusted_label);
        },
    );

    aggregate(
        per_user.values(),
        |flags| flags.territory.clone(),
        |acc: &mut LoggerCounts, flags| {
            acc.loggers += i64::from(flags.logger);
            acc.clean_loggers += i64::from(flags.clean);
        },
    )
}

/// Pass (d): all five metrics summed per territory, from the adjusted
/// per-user-per-mode groups.
pub fn territory_totals(
    adjusted: &BTreeMap<UserModeKey, Metrics>,
) -> BTreeMap<String, Metrics> {
    aggregate(
        adjusted.iter(),
        |((_, _, adjusted_label, _), _)| territory::territory(adjusted_label),
        |acc: &mut Metrics, (_, metrics)| {
            acc.trips += metrics.trips;
            acc.miles += metrics.miles;
            acc.vmr += metrics.vmr;
            acc.co2_grams += metrics.co2_grams;
            acc.dollars += metrics.dollars;
        },
    )
}

/// Pass (e): new-user counts per territory. Only the `IsNewUser` flag
/// is summed; nothing else from the user record participates.
pub fn new_user_counts(users: &[LocatedUser]) -> BTreeMap<String, i64> {
    aggregate(
        users,
        |u| u.territory.clone(),
        |acc: &mut i64, u| *acc += i64::from(u.is_new_user),
    )
}

/// Pass (f): log counts per territory x method, one count per trip-log
/// row. Feeds the wide per-territory mode-log columns.
pub fn territory_method_logs(trips: &[EnrichedTrip]) -> BTreeMap<(String, Method), i64> {
    aggregate(
        trips,
        |t| (t.territory.clone(), t.trip.method.clone()),
        |acc: &mut i64, _| *acc += 1,
    )
}
